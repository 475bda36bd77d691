//! Output emission.
//!
//! Serializes rendered pages into the two run artifacts:
//!
//! - one Markdown document per page, at a path derived from the page id
//!   (id segments become nested directories);
//! - one combined XML tree (`knowledge_base.xml`) containing every page
//!   in structure order.
//!
//! Both targets are produced from the same in-memory collection in a
//! single pass, which is what guarantees the two never disagree about
//! which pages exist. A write failure on one target is recorded and does
//! not stop the other.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use tracing::{error, info};

use crate::render::RenderedPage;

/// File name of the combined output tree.
pub const COMBINED_FILENAME: &str = "knowledge_base.xml";

/// Root element of the combined output tree.
const COMBINED_ROOT: &str = "knowledge_base";

/// A failed write to one output destination.
#[derive(Debug, thiserror::Error)]
#[error("failed to write {path}")]
pub struct WriteError {
    /// Destination that could not be written.
    pub path: PathBuf,
    /// Underlying I/O error.
    #[source]
    pub source: std::io::Error,
}

/// Outcome of an emission run.
#[derive(Debug, Default)]
pub struct EmitReport {
    /// Markdown documents successfully written.
    pub pages_written: usize,
    /// Per-page Markdown write failures.
    pub markdown_errors: Vec<WriteError>,
    /// Whether the combined tree was written.
    pub combined_written: bool,
    /// Combined-tree write failure, if any.
    pub combined_error: Option<WriteError>,
}

impl EmitReport {
    /// Whether every target was written without error.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.markdown_errors.is_empty() && self.combined_error.is_none()
    }
}

/// Write both output artifacts under `output_root`.
///
/// The same `pages` slice feeds both targets; ordering is the caller's
/// (the orchestrator passes structure order).
#[must_use]
pub fn emit(pages: &[RenderedPage], output_root: &Path) -> EmitReport {
    let mut report = EmitReport::default();

    for page in pages {
        let path = markdown_path(output_root, &page.id);
        match write_file(&path, &page_markdown(page)) {
            Ok(()) => report.pages_written += 1,
            Err(err) => {
                error!(page_id = %page.id, error = %err, "markdown write failed");
                report.markdown_errors.push(err);
            }
        }
    }

    let combined_path = output_root.join(COMBINED_FILENAME);
    match write_file(&combined_path, &combined_xml(pages)) {
        Ok(()) => report.combined_written = true,
        Err(err) => {
            error!(error = %err, "combined tree write failed");
            report.combined_error = Some(err);
        }
    }

    info!(
        pages = report.pages_written,
        combined = report.combined_written,
        "emission finished"
    );
    report
}

/// Markdown document for a single page.
///
/// Title heading followed by every section in order. Origin tags are not
/// printed; they stay on the [`RenderedPage`] for reporting and tests.
#[must_use]
pub fn page_markdown(page: &RenderedPage) -> String {
    let mut out = String::with_capacity(1024);
    out.push_str("# ");
    out.push_str(&page.title);
    out.push('\n');

    for section in &page.sections {
        out.push_str("\n## ");
        out.push_str(&section.heading);
        out.push_str("\n\n");
        out.push_str(&section.content);
        out.push('\n');
    }
    out
}

/// Combined XML tree for all pages.
///
/// One `<page id="...">` entry per page, section content identical to the
/// per-page Markdown output.
#[must_use]
pub fn combined_xml(pages: &[RenderedPage]) -> String {
    let mut out = String::with_capacity(4096);
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    let _ = writeln!(out, "<{COMBINED_ROOT}>");

    for page in pages {
        let _ = writeln!(out, r#"  <page id="{}">"#, escape_attr(&page.id));
        let _ = writeln!(out, "    <title>{}</title>", escape_text(&page.title));
        for section in &page.sections {
            let _ = writeln!(
                out,
                "    <{key}>{content}</{key}>",
                key = section.key,
                content = escape_text(&section.content)
            );
        }
        out.push_str("  </page>\n");
    }

    let _ = writeln!(out, "</{COMBINED_ROOT}>");
    out
}

/// Output path for a page's Markdown document.
///
/// Id segments map to nested directories: `support/faqs` becomes
/// `<root>/support/faqs.md`.
#[must_use]
pub fn markdown_path(output_root: &Path, page_id: &str) -> PathBuf {
    let mut path = output_root.to_path_buf();
    let mut segments = page_id.split('/').filter(|s| !s.is_empty()).peekable();
    while let Some(segment) = segments.next() {
        if segments.peek().is_some() {
            path.push(segment);
        } else {
            path.push(format!("{segment}.md"));
        }
    }
    path
}

fn write_file(path: &Path, content: &str) -> Result<(), WriteError> {
    let io = |source| WriteError {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io)?;
    }
    std::fs::write(path, content).map_err(io)
}

/// Escape text for XML content.
fn escape_text(text: &str) -> String {
    escape_xml(text, false)
}

/// Escape text for XML attribute values.
fn escape_attr(text: &str) -> String {
    escape_xml(text, true)
}

/// Escape XML special characters.
fn escape_xml(text: &str, escape_quotes: bool) -> String {
    let mut result = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' if escape_quotes => result.push_str("&quot;"),
            '\'' if escape_quotes => result.push_str("&apos;"),
            _ => result.push(ch),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{Origin, RenderedSection};
    use pretty_assertions::assert_eq;

    fn page(id: &str, title: &str, sections: &[(&str, &str)]) -> RenderedPage {
        RenderedPage {
            id: id.to_owned(),
            title: title.to_owned(),
            template: "default_page".to_owned(),
            sections: sections
                .iter()
                .map(|(key, content)| RenderedSection {
                    key: (*key).to_owned(),
                    heading: crate::templates::title_from_key(key),
                    content: (*content).to_owned(),
                    origin: Origin::Extracted,
                })
                .collect(),
        }
    }

    #[test]
    fn test_page_markdown_layout() {
        let page = page(
            "guide",
            "User Guide",
            &[("introduction", "Hi there"), ("conclusion", "Bye")],
        );

        let md = page_markdown(&page);
        assert_eq!(
            md,
            "# User Guide\n\n## Introduction\n\nHi there\n\n## Conclusion\n\nBye\n"
        );
    }

    #[test]
    fn test_combined_xml_layout() {
        let pages = vec![page("guide", "User Guide", &[("introduction", "Hi")])];

        let xml = combined_xml(&pages);
        assert_eq!(
            xml,
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <knowledge_base>\n\
             \x20\x20<page id=\"guide\">\n\
             \x20\x20\x20\x20<title>User Guide</title>\n\
             \x20\x20\x20\x20<introduction>Hi</introduction>\n\
             \x20\x20</page>\n\
             </knowledge_base>\n"
        );
    }

    #[test]
    fn test_combined_xml_escapes_content() {
        let pages = vec![page("g", "A & B", &[("body", "1 < 2 & \"quoted\"")])];

        let xml = combined_xml(&pages);
        assert!(xml.contains("<title>A &amp; B</title>"));
        assert!(xml.contains("<body>1 &lt; 2 &amp; \"quoted\"</body>"));
    }

    #[test]
    fn test_markdown_path_nests_id_segments() {
        let root = Path::new("/out");
        assert_eq!(
            markdown_path(root, "support/faqs"),
            PathBuf::from("/out/support/faqs.md")
        );
        assert_eq!(markdown_path(root, "welcome"), PathBuf::from("/out/welcome.md"));
        assert_eq!(
            markdown_path(root, "a/b/c"),
            PathBuf::from("/out/a/b/c.md")
        );
    }

    #[test]
    fn test_emit_writes_both_targets() {
        let temp_dir = tempfile::tempdir().unwrap();
        let pages = vec![
            page("getting_started/welcome", "Welcome", &[("introduction", "Hi")]),
            page("support/faqs", "FAQs", &[("question", "Why?")]),
        ];

        let report = emit(&pages, temp_dir.path());

        assert!(report.is_clean());
        assert_eq!(report.pages_written, 2);
        assert!(report.combined_written);
        assert!(temp_dir.path().join("getting_started/welcome.md").exists());
        assert!(temp_dir.path().join("support/faqs.md").exists());
        assert!(temp_dir.path().join(COMBINED_FILENAME).exists());
    }

    #[test]
    fn test_emit_parity_between_targets() {
        let temp_dir = tempfile::tempdir().unwrap();
        let pages = vec![
            page("a", "A", &[("body", "alpha")]),
            page("b", "B", &[("body", "beta")]),
        ];

        let report = emit(&pages, temp_dir.path());
        assert!(report.is_clean());

        let combined =
            std::fs::read_to_string(temp_dir.path().join(COMBINED_FILENAME)).unwrap();
        for p in &pages {
            // Same id set in both targets
            assert!(temp_dir.path().join(format!("{}.md", p.id)).exists());
            assert!(combined.contains(&format!(r#"<page id="{}">"#, p.id)));
            // Same section content in both targets
            let md = std::fs::read_to_string(temp_dir.path().join(format!("{}.md", p.id)))
                .unwrap();
            for s in &p.sections {
                assert!(md.contains(&s.content));
                assert!(combined.contains(&format!("<{0}>{1}</{0}>", s.key, s.content)));
            }
        }
    }

    #[test]
    fn test_emit_is_deterministic() {
        let temp_dir = tempfile::tempdir().unwrap();
        let pages = vec![page("guide", "Guide", &[("body", "text")])];

        emit(&pages, temp_dir.path());
        let first_md =
            std::fs::read_to_string(temp_dir.path().join("guide.md")).unwrap();
        let first_xml =
            std::fs::read_to_string(temp_dir.path().join(COMBINED_FILENAME)).unwrap();

        emit(&pages, temp_dir.path());
        let second_md =
            std::fs::read_to_string(temp_dir.path().join("guide.md")).unwrap();
        let second_xml =
            std::fs::read_to_string(temp_dir.path().join(COMBINED_FILENAME)).unwrap();

        assert_eq!(first_md, second_md);
        assert_eq!(first_xml, second_xml);
    }

    #[test]
    fn test_emit_markdown_failure_does_not_stop_combined() {
        let temp_dir = tempfile::tempdir().unwrap();
        // A page id whose directory component collides with an existing file
        std::fs::write(temp_dir.path().join("support"), "a file, not a dir").unwrap();
        let pages = vec![page("support/faqs", "FAQs", &[("body", "text")])];

        let report = emit(&pages, temp_dir.path());

        assert_eq!(report.markdown_errors.len(), 1);
        assert!(report.combined_written);
        assert!(!report.is_clean());
        assert!(temp_dir.path().join(COMBINED_FILENAME).exists());
    }
}
