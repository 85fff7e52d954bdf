//! Core type definitions for the arena tree
//!
//! Key design principles:
//! 1. Use u32 for indices (4 bytes vs 8 bytes pointer)
//! 2. Links are indices, never references: relinking is plain index updates
//! 3. Use SmallVec for small arrays (avoid heap allocation)

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Node identifier (index into arena)
/// u32 allows 4 billion nodes, enough for any document
pub type NodeId = u32;

/// Node type, using the standard DOM `nodeType` numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum NodeType {
    Element = 1,
    Text = 3,
    Comment = 8,
    Document = 9,
    DocumentType = 10,
    DocumentFragment = 11,
}

impl NodeType {
    pub fn name(self) -> &'static str {
        match self {
            NodeType::Element => "element",
            NodeType::Text => "text",
            NodeType::Comment => "comment",
            NodeType::Document => "document",
            NodeType::DocumentType => "doctype",
            NodeType::DocumentFragment => "fragment",
        }
    }
}

/// A single `key="value"` pair. Order within a node is significant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub key: String,
    pub value: String,
}

impl Attribute {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

pub type Attributes = SmallVec<[Attribute; 4]>;

/// The main tree node structure
///
/// Design philosophy:
/// - Small fixed-size fields first (better packing)
/// - Use indices instead of pointers
/// - Sibling links plus first/last child give O(1) relinking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomNode {
    pub node_type: NodeType,

    // Navigation indices
    pub parent: Option<NodeId>,
    pub first_child: Option<NodeId>,
    pub last_child: Option<NodeId>,
    pub prev_sibling: Option<NodeId>,
    pub next_sibling: Option<NodeId>,

    /// Lower-case tag name for elements, `#text`/`#comment`/`#document` otherwise
    pub node_name: String,
    /// Character data for text and comment nodes
    pub node_value: String,
    pub attributes: Attributes,
}

impl DomNode {
    fn bare(node_type: NodeType, node_name: String, node_value: String) -> Self {
        Self {
            node_type,
            parent: None,
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
            node_name,
            node_value,
            attributes: SmallVec::new(),
        }
    }

    pub fn element(tag: impl Into<String>) -> Self {
        Self::bare(
            NodeType::Element,
            tag.into().to_ascii_lowercase(),
            String::new(),
        )
    }

    pub fn text(data: impl Into<String>) -> Self {
        Self::bare(NodeType::Text, "#text".to_string(), data.into())
    }

    pub fn comment(data: impl Into<String>) -> Self {
        Self::bare(NodeType::Comment, "#comment".to_string(), data.into())
    }

    pub fn document() -> Self {
        Self::bare(NodeType::Document, "#document".to_string(), String::new())
    }

    pub fn fragment() -> Self {
        Self::bare(
            NodeType::DocumentFragment,
            "#document-fragment".to_string(),
            String::new(),
        )
    }

    pub fn doctype(name: impl Into<String>) -> Self {
        Self::bare(NodeType::DocumentType, name.into(), String::new())
    }

    /// Builder-style attribute append, used when constructing trees by hand
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push(Attribute::new(key, value));
        self
    }

    /// Get tag name for element nodes
    pub fn tag_name(&self) -> Option<&str> {
        if self.node_type == NodeType::Element {
            Some(&self.node_name)
        } else {
            None
        }
    }

    /// Check if node is an element
    pub fn is_element(&self) -> bool {
        self.node_type == NodeType::Element
    }

    /// Check if node is text
    pub fn is_text(&self) -> bool {
        self.node_type == NodeType::Text
    }

    /// Get attribute value (first match)
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.key == key)
            .map(|a| a.value.as_str())
    }

    /// Overwrite in place or append. Position of an existing key is preserved.
    pub fn set_attr(&mut self, key: &str, value: &str) {
        match self.attributes.iter_mut().find(|a| a.key == key) {
            Some(existing) => existing.value = value.to_string(),
            None => self.attributes.push(Attribute::new(key, value)),
        }
    }

    /// Remove the first pair matching `key`. Returns whether anything was removed.
    pub fn remove_attr(&mut self, key: &str) -> bool {
        match self.attributes.iter().position(|a| a.key == key) {
            Some(pos) => {
                self.attributes.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Same kind, name, data and attribute sequence. Links are not compared.
    pub fn same_content(&self, other: &DomNode) -> bool {
        self.node_type == other.node_type
            && self.node_name == other.node_name
            && self.node_value == other.node_value
            && self.attributes == other.attributes
    }
}
