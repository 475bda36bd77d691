//! Structure description loading.
//!
//! Parses the `structure.yaml` hierarchy into a [`StructureTree`] of
//! categories and pages, validating page ids and resolving each page's
//! effective template name up front.
//!
//! # Template resolution
//!
//! A page's effective template is resolved through a fixed chain:
//! the page's explicit `template`, else the nearest enclosing category's
//! `template`, else the global default ([`DEFAULT_TEMPLATE`]).
//!
//! # Structure file shape
//!
//! ```yaml
//! knowledge_base:
//!   - category: Getting Started
//!     template: default_page
//!     pages:
//!       - id: getting_started/welcome
//!         title: Welcome
//!     subcategories:
//!       - category: Advanced
//!         pages:
//!           - id: getting_started/advanced/tuning
//!             title: Tuning
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::templates::DEFAULT_TEMPLATE;

/// Error while loading or validating a structure description.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum StructureError {
    /// I/O error reading the structure file.
    #[error("failed to read structure {path}")]
    Io {
        /// Path that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// YAML parsing error.
    #[error("invalid structure YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// A page entry has no id (or an empty one).
    #[error("page '{title}' has no id")]
    MissingId {
        /// Title of the offending page.
        title: String,
    },

    /// Two pages share the same id.
    #[error("duplicate page id '{id}'")]
    DuplicateId {
        /// The id declared more than once.
        id: String,
    },

    /// A category declares neither pages nor subcategories.
    #[error("category '{title}' has no pages or subcategories")]
    EmptyCategory {
        /// Title of the offending category.
        title: String,
    },
}

/// A node in the structure tree: grouping category or leaf page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StructureNode {
    /// Grouping node, may supply a default template for its pages.
    Category(Category),
    /// Leaf unit of output.
    Page(Page),
}

/// Grouping node in the structure tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Category {
    /// Display title.
    pub title: String,
    /// Default template for pages beneath this category.
    pub default_template: Option<String>,
    /// Child nodes in declared order.
    pub children: Vec<StructureNode>,
}

/// Leaf page declaration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Page {
    /// Unique id, used as output path and extraction key.
    pub id: String,
    /// Display title.
    pub title: String,
    /// Explicit template name, if declared.
    pub template: Option<String>,
}

/// A page with its effective template name resolved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedPage {
    /// Unique id.
    pub id: String,
    /// Display title.
    pub title: String,
    /// Effective template name after the resolution chain.
    pub template: String,
}

/// Validated structure description.
///
/// Holds the declared category/page tree plus a flat, document-ordered
/// view of all pages with resolved template names. Both outputs of a run
/// follow this order.
#[derive(Clone, Debug)]
pub struct StructureTree {
    roots: Vec<StructureNode>,
    pages: Vec<ResolvedPage>,
}

impl StructureTree {
    /// Parse and validate a structure description from YAML.
    ///
    /// # Errors
    ///
    /// Returns [`StructureError`] for malformed YAML, pages without ids,
    /// duplicate ids, or categories with no content.
    pub fn from_yaml(yaml: &str) -> Result<Self, StructureError> {
        let doc: StructureDoc = serde_yaml::from_str(yaml)?;

        let roots: Vec<StructureNode> = doc
            .knowledge_base
            .into_iter()
            .map(CategoryDoc::into_node)
            .collect::<Result<_, _>>()?;

        let mut pages = Vec::new();
        let mut seen = HashSet::new();
        for root in &roots {
            collect_pages(root, None, &mut pages, &mut seen)?;
        }

        Ok(Self { roots, pages })
    }

    /// Load a structure description from a file.
    ///
    /// # Errors
    ///
    /// Returns [`StructureError::Io`] if the file cannot be read, plus any
    /// parse/validation error from [`Self::from_yaml`].
    pub fn load(path: &Path) -> Result<Self, StructureError> {
        let yaml = std::fs::read_to_string(path).map_err(|source| StructureError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&yaml)
    }

    /// Root nodes in declared order.
    #[must_use]
    pub fn roots(&self) -> &[StructureNode] {
        &self.roots
    }

    /// All pages in declared document order, templates resolved.
    #[must_use]
    pub fn pages(&self) -> &[ResolvedPage] {
        &self.pages
    }
}

/// Resolve a page's effective template name.
///
/// Chain: explicit page template, else inherited category default, else
/// the global default.
#[must_use]
pub fn resolve_template(explicit: Option<&str>, category_default: Option<&str>) -> String {
    explicit
        .or(category_default)
        .unwrap_or(DEFAULT_TEMPLATE)
        .to_owned()
}

/// Raw YAML document shape.
#[derive(Debug, Deserialize)]
struct StructureDoc {
    knowledge_base: Vec<CategoryDoc>,
}

#[derive(Debug, Deserialize)]
struct CategoryDoc {
    category: String,
    #[serde(default)]
    template: Option<String>,
    #[serde(default)]
    pages: Vec<PageDoc>,
    #[serde(default)]
    subcategories: Vec<CategoryDoc>,
}

#[derive(Debug, Deserialize)]
struct PageDoc {
    #[serde(default)]
    id: Option<String>,
    title: String,
    #[serde(default)]
    template: Option<String>,
}

impl CategoryDoc {
    fn into_node(self) -> Result<StructureNode, StructureError> {
        if self.pages.is_empty() && self.subcategories.is_empty() {
            return Err(StructureError::EmptyCategory { title: self.category });
        }

        let mut children = Vec::with_capacity(self.pages.len() + self.subcategories.len());
        for page in self.pages {
            let id = match page.id {
                Some(id) if !id.trim().is_empty() => id,
                _ => {
                    return Err(StructureError::MissingId { title: page.title });
                }
            };
            children.push(StructureNode::Page(Page {
                id,
                title: page.title,
                template: page.template,
            }));
        }
        for sub in self.subcategories {
            children.push(sub.into_node()?);
        }

        Ok(StructureNode::Category(Category {
            title: self.category,
            default_template: self.template,
            children,
        }))
    }
}

/// Walk a node collecting pages in declared order, checking id uniqueness.
fn collect_pages(
    node: &StructureNode,
    inherited: Option<&str>,
    pages: &mut Vec<ResolvedPage>,
    seen: &mut HashSet<String>,
) -> Result<(), StructureError> {
    match node {
        StructureNode::Page(page) => {
            if !seen.insert(page.id.clone()) {
                return Err(StructureError::DuplicateId {
                    id: page.id.clone(),
                });
            }
            pages.push(ResolvedPage {
                id: page.id.clone(),
                title: page.title.clone(),
                template: resolve_template(page.template.as_deref(), inherited),
            });
        }
        StructureNode::Category(category) => {
            // Inner category defaults shadow outer ones.
            let default = category.default_template.as_deref().or(inherited);
            for child in &category.children {
                collect_pages(child, default, pages, seen)?;
            }
        }
    }
    Ok(())
}
