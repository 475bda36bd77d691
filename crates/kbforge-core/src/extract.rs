//! Content extraction from the parsed export.
//!
//! Given a page id and its resolved template, [`extract`] locates the
//! matching export node and pulls out per-section content. Export
//! identifiers and structure ids are maintained independently and drift,
//! so an exact id match is preferred but a normalized match
//! (case-insensitive, path-separator-tolerant) is accepted.
//!
//! Extraction never fails: a page with no match anywhere yields a record
//! with every section missing, which renders to a template-default or
//! placeholder-filled page downstream.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::export::{ExportNode, ExportTree};
use crate::templates::TemplateSpec;

/// Per-page extraction result.
#[derive(Clone, Debug, Default)]
pub struct ContentRecord {
    /// Page id this record was extracted for.
    pub page_id: String,
    /// Extracted text by template section key.
    pub sections: HashMap<String, String>,
    /// Slash-joined path of the matched export node, if any.
    pub provenance: Option<String>,
    /// Template sections with no extracted content, in declared order.
    pub missing: Vec<String>,
    /// Number of export nodes matching the page id.
    ///
    /// More than one is the duplicate-content condition: the first node
    /// in document order was used, the rest ignored.
    pub matches: usize,
}

impl ContentRecord {
    /// Whether any export node matched the page id.
    #[must_use]
    pub fn found(&self) -> bool {
        self.matches > 0
    }

    /// Whether more than one export node matched the page id.
    #[must_use]
    pub fn has_duplicates(&self) -> bool {
        self.matches > 1
    }

    /// Whether content was extracted for the given section key.
    #[must_use]
    pub fn has_section(&self, key: &str) -> bool {
        self.sections.contains_key(key)
    }
}

/// Extract content for a page from the export tree.
///
/// Matching: exact identity key first; failing that, a normalized
/// comparison via [`normalize_id`]. When several nodes match, the first
/// in document order wins and the duplication is recorded on the record.
///
/// Section mapping: for each template section, a like-named child element
/// of the matched node supplies the content. A matched leaf node (no
/// element children) maps its entire text to the template's first
/// section; all remaining sections are missing.
#[must_use]
pub fn extract(page_id: &str, export: &ExportTree, template: &TemplateSpec) -> ContentRecord {
    let mut record = ContentRecord {
        page_id: page_id.to_owned(),
        ..Default::default()
    };

    let candidates = find_matches(page_id, export);
    record.matches = candidates.len();

    let Some((path, node)) = candidates.first() else {
        debug!(page_id, "no export node matched");
        record.missing = template.sections.iter().map(|s| s.key.clone()).collect();
        return record;
    };
    if record.has_duplicates() {
        warn!(
            page_id,
            matches = record.matches,
            "multiple export nodes matched, using first in document order"
        );
    }
    record.provenance = Some(path.clone());

    if node.is_leaf() {
        // Whole text feeds the first declared section.
        let text = node.text.trim();
        for (i, section) in template.sections.iter().enumerate() {
            if i == 0 && !text.is_empty() {
                record.sections.insert(section.key.clone(), text.to_owned());
            } else {
                record.missing.push(section.key.clone());
            }
        }
        return record;
    }

    for section in &template.sections {
        match find_section(node, &section.key) {
            Some(text) => {
                record.sections.insert(section.key.clone(), text);
            }
            None => record.missing.push(section.key.clone()),
        }
    }
    record
}

/// Normalize an identity key for lenient comparison.
///
/// Lowercases, folds `\` into `/`, and strips leading/trailing separators.
#[must_use]
pub fn normalize_id(id: &str) -> String {
    id.trim()
        .to_ascii_lowercase()
        .replace('\\', "/")
        .trim_matches('/')
        .to_owned()
}

/// All export nodes matching a page id, in document order.
///
/// Exact matches are preferred; normalized matches are consulted only
/// when no exact match exists.
fn find_matches<'a>(page_id: &str, export: &'a ExportTree) -> Vec<(String, &'a ExportNode)> {
    let identified = export.identified_nodes();

    let exact: Vec<_> = identified
        .iter()
        .filter(|(_, n)| n.id.as_deref() == Some(page_id))
        .cloned()
        .collect();
    if !exact.is_empty() {
        return exact;
    }

    let wanted = normalize_id(page_id);
    identified
        .into_iter()
        .filter(|(_, n)| n.id.as_deref().is_some_and(|id| normalize_id(id) == wanted))
        .collect()
}

/// Find a like-named child element's text under the matched node.
fn find_section(node: &ExportNode, key: &str) -> Option<String> {
    let wanted = normalize_id(key);
    node.children
        .iter()
        .find(|child| normalize_id(&child.tag) == wanted)
        .map(|child| child.text.trim().to_owned())
        .filter(|text| !text.is_empty())
}
