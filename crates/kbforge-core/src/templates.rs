//! Template definitions and registry.
//!
//! Templates are YAML files, one per template, loaded eagerly into a
//! [`TemplateRegistry`]. A template file's stem is its name. Resolution
//! by name falls back to the global default ([`DEFAULT_TEMPLATE`]) when a
//! requested name is absent; only the absence of both is an error.
//!
//! # Template file shape
//!
//! ```yaml
//! page_template:
//!   layout: article
//!   sections:
//!     - key: introduction
//!       required: true
//!       default: "Welcome to this page."
//!     - key: conclusion
//!       heading: Wrapping Up
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::warn;

/// Name of the global default template.
pub const DEFAULT_TEMPLATE: &str = "default_page";

/// Error while loading templates or resolving a template name.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum TemplateError {
    /// I/O error reading the templates directory or a template file.
    #[error("failed to read template source {path}")]
    Io {
        /// Path that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// YAML parsing error in a template file.
    #[error("invalid template '{name}': {source}")]
    Parse {
        /// Template name (file stem).
        name: String,
        /// Underlying YAML error.
        #[source]
        source: serde_yaml::Error,
    },

    /// A template declares no sections.
    #[error("template '{name}' has no sections")]
    EmptySections {
        /// Template name.
        name: String,
    },

    /// Neither the requested name nor the global default is registered.
    #[error("template '{name}' not found and no '{DEFAULT_TEMPLATE}' registered")]
    NotFound {
        /// The requested template name.
        name: String,
    },
}

/// One section declared by a template.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct SectionSpec {
    /// Section key, matched against export sub-nodes.
    pub key: String,
    /// Display heading; derived from the key when absent.
    #[serde(default)]
    pub heading: Option<String>,
    /// Whether an absence of content counts as a degradation.
    #[serde(default)]
    pub required: bool,
    /// Default text used when no content was extracted.
    #[serde(default)]
    pub default: Option<String>,
}

impl SectionSpec {
    /// Display heading for the section.
    #[must_use]
    pub fn heading(&self) -> String {
        self.heading
            .clone()
            .unwrap_or_else(|| title_from_key(&self.key))
    }
}

/// A named template: ordered sections plus layout metadata.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct TemplateSpec {
    /// Template name (file stem; set during load).
    #[serde(skip)]
    pub name: String,
    /// Layout hint for downstream presentation.
    #[serde(default)]
    pub layout: Option<String>,
    /// Ordered section definitions.
    #[serde(default)]
    pub sections: Vec<SectionSpec>,
}

/// YAML document wrapper (`page_template:` top-level key).
#[derive(Debug, Deserialize)]
struct TemplateDoc {
    page_template: TemplateSpec,
}

/// Result of resolving a template name.
#[derive(Clone, Copy, Debug)]
pub struct ResolvedTemplate<'a> {
    /// The template to use.
    pub template: &'a TemplateSpec,
    /// Whether the requested name was absent and the default substituted.
    pub fell_back: bool,
}

/// Eagerly loaded, immutable set of named templates.
#[derive(Clone, Debug, Default)]
pub struct TemplateRegistry {
    templates: HashMap<String, TemplateSpec>,
}

impl TemplateRegistry {
    /// Load all `*.yaml` / `*.yml` templates from a directory.
    ///
    /// Hidden and underscore-prefixed files are skipped. Each template is
    /// validated to declare at least one section.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError`] if the directory cannot be read, a file
    /// fails to parse, or a template has zero sections.
    pub fn load(dir: &Path) -> Result<Self, TemplateError> {
        let entries = std::fs::read_dir(dir).map_err(|source| TemplateError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        // Sort for a deterministic load order
        let mut paths: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|e| e.path())
            .filter(|p| {
                p.extension().is_some_and(|e| e == "yaml" || e == "yml")
                    && p.file_name().is_some_and(|n| {
                        let n = n.to_string_lossy();
                        !n.starts_with('.') && !n.starts_with('_')
                    })
            })
            .collect();
        paths.sort();

        let mut specs = Vec::with_capacity(paths.len());
        for path in paths {
            let name = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let content = std::fs::read_to_string(&path).map_err(|source| TemplateError::Io {
                path: path.clone(),
                source,
            })?;
            let doc: TemplateDoc = serde_yaml::from_str(&content).map_err(|source| {
                TemplateError::Parse {
                    name: name.clone(),
                    source,
                }
            })?;
            let mut spec = doc.page_template;
            spec.name = name;
            specs.push(spec);
        }

        Self::from_specs(specs)
    }

    /// Build a registry from already-constructed specs.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::EmptySections`] if any spec has no sections.
    pub fn from_specs(specs: Vec<TemplateSpec>) -> Result<Self, TemplateError> {
        let mut templates = HashMap::with_capacity(specs.len());
        for spec in specs {
            if spec.sections.is_empty() {
                return Err(TemplateError::EmptySections { name: spec.name });
            }
            templates.insert(spec.name.clone(), spec);
        }
        Ok(Self { templates })
    }

    /// Resolve a template by name.
    ///
    /// An unknown name degrades to the global default (logged, flagged in
    /// the result); it never aborts on its own.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::NotFound`] only when neither the requested
    /// name nor [`DEFAULT_TEMPLATE`] is registered.
    pub fn resolve(&self, name: &str) -> Result<ResolvedTemplate<'_>, TemplateError> {
        if let Some(template) = self.templates.get(name) {
            return Ok(ResolvedTemplate {
                template,
                fell_back: false,
            });
        }
        if let Some(template) = self.templates.get(DEFAULT_TEMPLATE) {
            warn!(requested = name, "template not found, using default");
            return Ok(ResolvedTemplate {
                template,
                fell_back: true,
            });
        }
        Err(TemplateError::NotFound {
            name: name.to_owned(),
        })
    }

    /// Whether a template with the given name is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    /// Number of registered templates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

/// Generate a display title from a key or id segment.
///
/// `getting-started` and `getting_started` both become `Getting Started`.
#[must_use]
pub fn title_from_key(key: &str) -> String {
    key.rsplit('/')
        .next()
        .unwrap_or(key)
        .replace(['-', '_'], " ")
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(first) => first.to_uppercase().chain(chars).collect(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
