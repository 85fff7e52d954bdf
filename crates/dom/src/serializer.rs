//! Markup Serializer - render a subtree back to HTML text
//!
//! This is the inverse of [`crate::parser::DomParser`]: `insertChild`
//! patches carry the inserted subtree as markup, and the receiving side
//! re-parses it with the same parser.

use crate::arena::DomArena;
use crate::error::Result;
use crate::types::*;
use crate::utils::{escape_attr, escape_text};

/// Elements that never have children or an end tag
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Elements whose content is raw text (no escaping, no child markup)
pub const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

pub fn is_void(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

pub fn is_raw_text(tag: &str) -> bool {
    RAW_TEXT_ELEMENTS.contains(&tag)
}

/// DOM Tree Serializer
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkupSerializer;

enum Step {
    Open(NodeId),
    Close(NodeId),
}

impl MarkupSerializer {
    pub fn new() -> Self {
        Self
    }

    /// Render a subtree to markup text
    pub fn render(&self, arena: &DomArena, node_id: NodeId) -> Result<String> {
        let mut output = String::with_capacity(256);
        self.render_into(arena, node_id, &mut output)?;
        Ok(output)
    }

    /// Render children only, e.g. the inner markup of an element
    pub fn render_children(&self, arena: &DomArena, node_id: NodeId) -> Result<String> {
        let mut output = String::with_capacity(256);
        for child in arena.children(node_id) {
            self.render_into(arena, child, &mut output)?;
        }
        Ok(output)
    }

    /// Iterative: an explicit stack of open/close steps instead of recursion
    pub fn render_into(&self, arena: &DomArena, node_id: NodeId, output: &mut String) -> Result<()> {
        let mut stack = vec![Step::Open(node_id)];

        while let Some(step) = stack.pop() {
            match step {
                Step::Open(id) => {
                    let node = arena.get(id)?;
                    match node.node_type {
                        NodeType::Element => {
                            output.push('<');
                            output.push_str(&node.node_name);
                            for attr in &node.attributes {
                                output.push(' ');
                                output.push_str(&attr.key);
                                output.push_str("=\"");
                                output.push_str(&escape_attr(&attr.value));
                                output.push('"');
                            }
                            output.push('>');

                            if is_void(&node.node_name) {
                                continue;
                            }
                            stack.push(Step::Close(id));
                            push_children(arena, node, &mut stack)?;
                        }
                        NodeType::Text => {
                            // A text node rendered on its own is re-parsed
                            // outside its raw-text parent, so it must be escaped
                            let raw = id != node_id
                                && node
                                    .parent
                                    .and_then(|p| arena.get(p).ok())
                                    .and_then(|p| p.tag_name())
                                    .is_some_and(is_raw_text);
                            if raw {
                                output.push_str(&node.node_value);
                            } else {
                                output.push_str(&escape_text(&node.node_value));
                            }
                        }
                        NodeType::Comment => {
                            output.push_str("<!--");
                            output.push_str(&node.node_value);
                            output.push_str("-->");
                        }
                        NodeType::DocumentType => {
                            output.push_str("<!DOCTYPE ");
                            output.push_str(&node.node_name);
                            output.push('>');
                        }
                        NodeType::Document | NodeType::DocumentFragment => {
                            push_children(arena, node, &mut stack)?;
                        }
                    }
                }
                Step::Close(id) => {
                    output.push_str("</");
                    output.push_str(&arena.get(id)?.node_name);
                    output.push('>');
                }
            }
        }

        Ok(())
    }
}

fn push_children(arena: &DomArena, node: &DomNode, stack: &mut Vec<Step>) -> Result<()> {
    let mut cursor = node.last_child;
    while let Some(child_id) = cursor {
        stack.push(Step::Open(child_id));
        cursor = arena.get(child_id)?.prev_sibling;
    }
    Ok(())
}
