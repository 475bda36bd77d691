//! Knowledge-base export parsing.
//!
//! Parses the flat XML export into an [`ExportTree`] of content nodes.
//! Each node keeps its tag, its identity key (the `id` attribute, when
//! present), its direct text and its children in document order. Lookup
//! by identity key is document-ordered, which downstream consumers rely
//! on when the same key appears more than once.

use std::path::{Path, PathBuf};

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

/// Attribute carrying a node's identity key.
const ID_ATTR: &str = "id";

/// Error while reading or parsing an export.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ExportError {
    /// I/O error reading the export file.
    #[error("failed to read export {path}")]
    Io {
        /// Path that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// XML parsing error.
    #[error("XML parse error")]
    XmlParse(#[from] quick_xml::Error),

    /// XML attribute error.
    #[error("XML attribute error")]
    XmlAttr(#[from] quick_xml::events::attributes::AttrError),

    /// Encoding error during XML parsing.
    #[error("encoding error")]
    Encoding(#[from] quick_xml::encoding::EncodingError),

    /// The export document has no root element.
    #[error("export document is empty")]
    Empty,
}

/// A single content node from the export.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExportNode {
    /// Element tag name.
    pub tag: String,
    /// Identity key (`id` attribute), if declared.
    pub id: Option<String>,
    /// Direct text content (concatenated, entities decoded).
    pub text: String,
    /// Child elements in document order.
    pub children: Vec<ExportNode>,
}

impl ExportNode {
    /// Create a node with the given tag.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Default::default()
        }
    }

    /// Whether the node is a leaf (no element children).
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Parsed export document.
///
/// Wraps the root element and provides document-ordered traversal.
#[derive(Clone, Debug)]
pub struct ExportTree {
    root: ExportNode,
}

impl ExportTree {
    /// Parse an export from an XML string.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError`] if the document is malformed or empty.
    pub fn from_xml(xml: &str) -> Result<Self, ExportError> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(false);

        // Sentinel holds top-level elements until the real root pops.
        let mut stack = vec![ExportNode::default()];

        loop {
            match reader.read_event()? {
                Event::Start(e) => {
                    stack.push(node_from_start(&reader, &e)?);
                }
                Event::Empty(e) => {
                    let node = node_from_start(&reader, &e)?;
                    push_child(&mut stack, node);
                }
                Event::Text(e) => {
                    let text = reader.decoder().decode(&e)?.into_owned();
                    append_text(&mut stack, &text);
                }
                Event::GeneralRef(e) => {
                    let entity = reader.decoder().decode(&e)?.into_owned();
                    append_text(&mut stack, &decode_entity(&entity));
                }
                Event::CData(e) => {
                    let text = String::from_utf8_lossy(&e).into_owned();
                    append_text(&mut stack, &text);
                }
                Event::End(_) => {
                    if stack.len() > 1 {
                        let node = stack.pop().unwrap_or_default();
                        push_child(&mut stack, node);
                    }
                }
                Event::Eof => break,
                Event::Comment(_) | Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {}
            }
        }

        let mut sentinel = stack.swap_remove(0);
        if sentinel.children.is_empty() {
            return Err(ExportError::Empty);
        }
        let root = sentinel.children.swap_remove(0);
        Ok(Self { root })
    }

    /// Load an export from a file.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::Io`] if the file cannot be read, or a parse
    /// error if the content is malformed.
    pub fn load(path: &Path) -> Result<Self, ExportError> {
        let xml = std::fs::read_to_string(path).map_err(|source| ExportError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_xml(&xml)
    }

    /// Root element of the export.
    #[must_use]
    pub fn root(&self) -> &ExportNode {
        &self.root
    }

    /// All nodes carrying an identity key, in document order.
    ///
    /// Each entry pairs the node with its slash-joined ancestor path
    /// (tag names from the root), used as provenance by the extractor.
    #[must_use]
    pub fn identified_nodes(&self) -> Vec<(String, &ExportNode)> {
        let mut out = Vec::new();
        collect_identified(&self.root, &self.root.tag, &mut out);
        out
    }
}

fn node_from_start<R>(reader: &Reader<R>, e: &BytesStart) -> Result<ExportNode, ExportError> {
    let tag = reader.decoder().decode(e.name().as_ref())?.into_owned();

    let mut id = None;
    for attr in e.attributes() {
        let attr = attr?;
        let key = reader.decoder().decode(attr.key.as_ref())?.into_owned();
        if key == ID_ATTR {
            let value = attr.unescape_value().map_or_else(
                |_| String::from_utf8_lossy(&attr.value).into_owned(),
                std::borrow::Cow::into_owned,
            );
            id = Some(value);
        }
    }

    Ok(ExportNode {
        tag,
        id,
        ..Default::default()
    })
}

/// Attach a completed node to the element currently being built.
fn push_child(stack: &mut [ExportNode], node: ExportNode) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
    }
}

/// Append decoded text to the element currently being built.
fn append_text(stack: &mut [ExportNode], text: &str) {
    if let Some(current) = stack.last_mut() {
        current.text.push_str(text);
    }
}

/// Decode XML entity references to their character values.
fn decode_entity(entity: &str) -> String {
    match entity {
        "lt" => "<".to_owned(),
        "gt" => ">".to_owned(),
        "amp" => "&".to_owned(),
        "apos" => "'".to_owned(),
        "quot" => "\"".to_owned(),
        // Numeric character references
        s if s.starts_with('#') => {
            let code = if s.starts_with("#x") || s.starts_with("#X") {
                u32::from_str_radix(&s[2..], 16).ok()
            } else {
                s[1..].parse::<u32>().ok()
            };
            code.and_then(char::from_u32)
                .map_or_else(|| format!("&{entity};"), |c| c.to_string())
        }
        // Unknown entity - preserve as-is
        _ => format!("&{entity};"),
    }
}

fn collect_identified<'a>(
    node: &'a ExportNode,
    path: &str,
    out: &mut Vec<(String, &'a ExportNode)>,
) {
    if node.id.is_some() {
        out.push((path.to_owned(), node));
    }
    for child in &node.children {
        let child_path = format!("{path}/{}", child.tag);
        collect_identified(child, &child_path, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_simple_export() {
        let tree = ExportTree::from_xml(
            r#"<export><block id="welcome">Hi there</block></export>"#,
        )
        .unwrap();

        assert_eq!(tree.root().tag, "export");
        assert_eq!(tree.root().children.len(), 1);
        let block = &tree.root().children[0];
        assert_eq!(block.id.as_deref(), Some("welcome"));
        assert_eq!(block.text, "Hi there");
        assert!(block.is_leaf());
    }

    #[test]
    fn test_parse_nested_children_in_document_order() {
        let tree = ExportTree::from_xml(
            "<export>\
             <block id=\"a\"><introduction>First</introduction><conclusion>Last</conclusion></block>\
             <block id=\"b\">Leaf</block>\
             </export>",
        )
        .unwrap();

        let block = &tree.root().children[0];
        assert_eq!(block.children.len(), 2);
        assert_eq!(block.children[0].tag, "introduction");
        assert_eq!(block.children[0].text, "First");
        assert_eq!(block.children[1].tag, "conclusion");

        let ids: Vec<_> = tree
            .identified_nodes()
            .into_iter()
            .map(|(_, n)| n.id.clone().unwrap())
            .collect();
        assert_eq!(ids, vec!["a".to_owned(), "b".to_owned()]);
    }

    #[test]
    fn test_parse_decodes_entities() {
        let tree =
            ExportTree::from_xml(r#"<export><block id="x">a &amp; b &lt;c&gt;</block></export>"#)
                .unwrap();
        assert_eq!(tree.root().children[0].text, "a & b <c>");
    }

    #[test]
    fn test_parse_cdata() {
        let tree = ExportTree::from_xml(
            r#"<export><block id="x"><![CDATA[raw <markup> kept]]></block></export>"#,
        )
        .unwrap();
        assert_eq!(tree.root().children[0].text, "raw <markup> kept");
    }

    #[test]
    fn test_parse_self_closing_node() {
        let tree = ExportTree::from_xml(r#"<export><block id="empty"/></export>"#).unwrap();
        let block = &tree.root().children[0];
        assert_eq!(block.id.as_deref(), Some("empty"));
        assert!(block.text.is_empty());
    }

    #[test]
    fn test_parse_empty_document_fails() {
        let result = ExportTree::from_xml("");
        assert!(matches!(result, Err(ExportError::Empty)));
    }

    #[test]
    fn test_parse_malformed_fails() {
        let result = ExportTree::from_xml("<export><block></export>");
        assert!(result.is_err());
    }

    #[test]
    fn test_identified_nodes_include_provenance_path() {
        let tree = ExportTree::from_xml(
            r#"<export><group><block id="deep">Text</block></group></export>"#,
        )
        .unwrap();

        let nodes = tree.identified_nodes();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].0, "export/group/block");
    }

    #[test]
    fn test_load_missing_file() {
        let result = ExportTree::load(Path::new("/nonexistent/export.xml"));
        assert!(matches!(result, Err(ExportError::Io { .. })));
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("export.xml");
        std::fs::write(&path, r#"<export><block id="p">Body</block></export>"#).unwrap();

        let tree = ExportTree::load(&path).unwrap();
        assert_eq!(tree.root().children[0].text, "Body");
    }
}
