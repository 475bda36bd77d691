//! Page rendering.
//!
//! Binds a [`ContentRecord`] into its template, producing a
//! [`RenderedPage`] with every declared section present and tagged with
//! its [`Origin`]. Sections are never silently omitted: a section with
//! no extracted content and no template default renders the explicit
//! [`MISSING_PLACEHOLDER`] so downstream consumers can detect
//! incompleteness.
//!
//! Rendering is deterministic: no timestamps, no randomness. The two
//! output formats are generated from the same `RenderedPage` values, so
//! determinism here is what keeps them byte-identical.
//!
//! Prose rewriting is delegated to an injected [`ProseRenderer`]. The
//! bundled [`IdentityProse`] passes text through unchanged; an
//! LLM-backed implementation can be swapped in without touching the
//! pipeline.

use crate::extract::ContentRecord;
use crate::templates::TemplateSpec;

/// Placeholder emitted for sections with no content and no default.
pub const MISSING_PLACEHOLDER: &str = "[no content available]";

/// Provenance of a rendered section's content.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Origin {
    /// Content came from the export.
    Extracted,
    /// Content came from the template's default text.
    TemplateDefault,
    /// No content anywhere; the placeholder was emitted.
    Missing,
}

impl Origin {
    /// Stable string form, used in reports and tests.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Extracted => "extracted",
            Self::TemplateDefault => "template-default",
            Self::Missing => "missing",
        }
    }
}

/// One rendered section of a page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedSection {
    /// Template section key.
    pub key: String,
    /// Display heading.
    pub heading: String,
    /// Resolved content text.
    pub content: String,
    /// Where the content came from.
    pub origin: Origin,
}

/// A fully rendered page, consumed once by the emitter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedPage {
    /// Page id (also the output path key).
    pub id: String,
    /// Page title.
    pub title: String,
    /// Name of the template that was used.
    pub template: String,
    /// Sections in template-declared order.
    pub sections: Vec<RenderedSection>,
}

impl RenderedPage {
    /// Build a page with every section missing.
    ///
    /// Used by the orchestrator to keep a page present in both outputs
    /// after a per-page failure.
    #[must_use]
    pub fn all_missing(id: &str, title: &str, template: &TemplateSpec) -> Self {
        Self {
            id: id.to_owned(),
            title: title.to_owned(),
            template: template.name.clone(),
            sections: template
                .sections
                .iter()
                .map(|s| RenderedSection {
                    key: s.key.clone(),
                    heading: s.heading(),
                    content: MISSING_PLACEHOLDER.to_owned(),
                    origin: Origin::Missing,
                })
                .collect(),
        }
    }

    /// Whether any section is missing content.
    #[must_use]
    pub fn has_missing_sections(&self) -> bool {
        self.sections.iter().any(|s| s.origin == Origin::Missing)
    }
}

/// Error from the prose-rendering collaborator.
#[derive(Debug, thiserror::Error)]
#[error("prose rendering failed for section '{section}': {message}")]
pub struct ProseError {
    /// Section key being rendered.
    pub section: String,
    /// Collaborator-supplied failure description.
    pub message: String,
}

/// Error while rendering a page.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum RenderError {
    /// The prose collaborator failed.
    #[error(transparent)]
    Prose(#[from] ProseError),
}

/// Synchronous prose-rewriting collaborator.
///
/// The pipeline only depends on this contract: given a section key and
/// raw extracted text, return rewritten text or fail. Retry policy, if
/// any, belongs to the implementation.
pub trait ProseRenderer {
    /// Rewrite raw extracted content for a section.
    ///
    /// # Errors
    ///
    /// Returns [`ProseError`] when the collaborator cannot produce text.
    fn render_prose(&self, section_key: &str, raw: &str) -> Result<String, ProseError>;
}

/// Pass-through prose renderer.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdentityProse;

impl ProseRenderer for IdentityProse {
    fn render_prose(&self, _section_key: &str, raw: &str) -> Result<String, ProseError> {
        Ok(raw.to_owned())
    }
}

/// Render a page from its extracted content and template.
///
/// Per declared section order: extracted content (run through the prose
/// renderer) wins, else the template default, else the placeholder.
///
/// # Errors
///
/// Returns [`RenderError`] if the prose collaborator fails on any
/// extracted section.
pub fn render(
    page_id: &str,
    title: &str,
    record: &ContentRecord,
    template: &TemplateSpec,
    prose: &dyn ProseRenderer,
) -> Result<RenderedPage, RenderError> {
    let mut sections = Vec::with_capacity(template.sections.len());

    for spec in &template.sections {
        let (content, origin) = if let Some(raw) = record.sections.get(&spec.key) {
            (prose.render_prose(&spec.key, raw)?, Origin::Extracted)
        } else if let Some(default) = &spec.default {
            (default.clone(), Origin::TemplateDefault)
        } else {
            (MISSING_PLACEHOLDER.to_owned(), Origin::Missing)
        };

        sections.push(RenderedSection {
            key: spec.key.clone(),
            heading: spec.heading(),
            content,
            origin,
        });
    }

    Ok(RenderedPage {
        id: page_id.to_owned(),
        title: title.to_owned(),
        template: template.name.clone(),
        sections,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::SectionSpec;
    use pretty_assertions::assert_eq;

    fn template() -> TemplateSpec {
        TemplateSpec {
            name: "default_page".to_owned(),
            layout: None,
            sections: vec![
                SectionSpec {
                    key: "introduction".to_owned(),
                    heading: Some("Overview".to_owned()),
                    required: true,
                    default: None,
                },
                SectionSpec {
                    key: "conclusion".to_owned(),
                    heading: None,
                    required: false,
                    default: Some("Thanks for reading.".to_owned()),
                },
                SectionSpec {
                    key: "faq".to_owned(),
                    heading: None,
                    required: false,
                    default: None,
                },
            ],
        }
    }

    fn record_with(sections: &[(&str, &str)]) -> ContentRecord {
        ContentRecord {
            page_id: "guide".to_owned(),
            sections: sections
                .iter()
                .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
                .collect(),
            matches: 1,
            ..Default::default()
        }
    }

    struct FailingProse;

    impl ProseRenderer for FailingProse {
        fn render_prose(&self, section_key: &str, _raw: &str) -> Result<String, ProseError> {
            Err(ProseError {
                section: section_key.to_owned(),
                message: "collaborator unavailable".to_owned(),
            })
        }
    }

    #[test]
    fn test_render_origins() {
        let record = record_with(&[("introduction", "Hi there")]);
        let page = render("guide", "Guide", &record, &template(), &IdentityProse).unwrap();

        assert_eq!(page.sections.len(), 3);

        assert_eq!(page.sections[0].content, "Hi there");
        assert_eq!(page.sections[0].origin, Origin::Extracted);
        assert_eq!(page.sections[0].heading, "Overview");

        assert_eq!(page.sections[1].content, "Thanks for reading.");
        assert_eq!(page.sections[1].origin, Origin::TemplateDefault);
        assert_eq!(page.sections[1].heading, "Conclusion");

        assert_eq!(page.sections[2].content, MISSING_PLACEHOLDER);
        assert_eq!(page.sections[2].origin, Origin::Missing);
    }

    #[test]
    fn test_render_keeps_template_section_order() {
        // Record declares sections in a different order than the template
        let record = record_with(&[("faq", "Q and A"), ("introduction", "Hi")]);
        let page = render("guide", "Guide", &record, &template(), &IdentityProse).unwrap();

        let keys: Vec<_> = page.sections.iter().map(|s| s.key.as_str()).collect();
        assert_eq!(keys, vec!["introduction", "conclusion", "faq"]);
    }

    #[test]
    fn test_render_is_deterministic() {
        let record = record_with(&[("introduction", "Hi there")]);
        let t = template();

        let first = render("guide", "Guide", &record, &t, &IdentityProse).unwrap();
        let second = render("guide", "Guide", &record, &t, &IdentityProse).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_render_prose_failure_propagates() {
        let record = record_with(&[("introduction", "Hi there")]);
        let result = render("guide", "Guide", &record, &template(), &FailingProse);

        assert!(matches!(result, Err(RenderError::Prose(_))));
    }

    #[test]
    fn test_render_prose_not_called_for_defaults() {
        // Only extracted content passes through the collaborator; a record
        // with no extracted sections must render fine even if prose fails.
        let record = record_with(&[]);
        let page = render("guide", "Guide", &record, &template(), &FailingProse).unwrap();

        assert_eq!(page.sections[0].origin, Origin::Missing);
        assert_eq!(page.sections[1].origin, Origin::TemplateDefault);
    }

    #[test]
    fn test_all_missing_page() {
        let page = RenderedPage::all_missing("guide", "Guide", &template());

        assert_eq!(page.sections.len(), 3);
        assert!(page.has_missing_sections());
        assert!(
            page.sections
                .iter()
                .all(|s| s.origin == Origin::Missing && s.content == MISSING_PLACEHOLDER)
        );
    }

    #[test]
    fn test_origin_as_str() {
        assert_eq!(Origin::Extracted.as_str(), "extracted");
        assert_eq!(Origin::TemplateDefault.as_str(), "template-default");
        assert_eq!(Origin::Missing.as_str(), "missing");
    }
}
