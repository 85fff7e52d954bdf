//! Markup parser - build arena nodes from HTML text
//!
//! Handles the subset of HTML the sync protocol needs: elements with
//! quoted, unquoted and boolean attributes, void and self-closing tags,
//! raw-text `script`/`style`, comments, doctype and character references.
//! An end tag closes up to its nearest open match; a stray end tag is
//! dropped; end of input closes everything still open.
//!
//! It is deliberately not an HTML5 tree builder. No implicit `<p>` closing
//! and no foster parenting, which keeps `parse(render(n))` structurally
//! equal to `n` for every tree this parser produces.

use crate::arena::DomArena;
use crate::error::{DomError, Result};
use crate::serializer::{is_raw_text, is_void};
use crate::types::{Attribute, DomNode, NodeId, NodeType};
use crate::utils::decode_entities;
use serde::{Deserialize, Serialize};

/// Configuration for the parser
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParserConfig {
    /// Maximum element nesting depth
    pub max_depth: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self { max_depth: 512 }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DomParser {
    config: ParserConfig,
}

impl DomParser {
    pub fn new() -> Self {
        Self::with_config(ParserConfig::default())
    }

    pub fn with_config(config: ParserConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Parse a fragment holding exactly one top-level node into `arena`.
    ///
    /// The node comes back detached. Empty markup is an empty text node, so
    /// that every node the serializer can emit parses back to one node.
    pub fn parse_fragment(&self, arena: &mut DomArena, markup: &str) -> Result<NodeId> {
        if markup.is_empty() {
            return Ok(arena.add_node(DomNode::text("")));
        }

        let nodes = self.parse_fragment_nodes(arena, markup)?;
        match nodes.as_slice() {
            [single] => Ok(*single),
            _ => Err(DomError::Parse {
                offset: 0,
                message: format!(
                    "fragment has {} top-level nodes, expected exactly one",
                    nodes.len()
                ),
            }),
        }
    }

    /// Parse a fragment into detached top-level nodes, in document order.
    pub fn parse_fragment_nodes(&self, arena: &mut DomArena, markup: &str) -> Result<Vec<NodeId>> {
        let container = arena.add_node(DomNode::fragment());
        TreeBuilder::new(arena, markup, container, self.config.max_depth).run()?;

        let nodes: Vec<NodeId> = arena.children(container).collect();
        for &node in &nodes {
            arena.detach(node)?;
        }
        Ok(nodes)
    }

    /// Parse a whole document into a fresh arena.
    pub fn parse_document(&self, markup: &str) -> Result<(DomArena, NodeId)> {
        let mut arena = DomArena::with_capacity(markup.len() / 8 + 16);
        let doc = self.parse_document_into(&mut arena, markup)?;
        Ok((arena, doc))
    }

    /// Parse a document under a new `#document` node.
    ///
    /// Content without an `<html>` element is wrapped in a synthesized
    /// `html > (head, body)`; an `<html>` lacking head or body gets them.
    pub fn parse_document_into(&self, arena: &mut DomArena, markup: &str) -> Result<NodeId> {
        let doc = arena.add_node(DomNode::document());
        TreeBuilder::new(arena, markup, doc, self.config.max_depth).run()?;
        normalize_document(arena, doc)?;
        Ok(doc)
    }
}

fn find_child_element(arena: &DomArena, parent: NodeId, tag: &str) -> Option<NodeId> {
    arena
        .children(parent)
        .find(|&c| arena.get(c).ok().and_then(|n| n.tag_name()) == Some(tag))
}

fn normalize_document(arena: &mut DomArena, doc: NodeId) -> Result<()> {
    let html = match find_child_element(arena, doc, "html") {
        Some(html) => html,
        None => {
            let html = arena.add_node(DomNode::element("html"));
            let content: Vec<NodeId> = arena
                .children(doc)
                .filter(|&c| {
                    arena
                        .get(c)
                        .map(|n| n.node_type != NodeType::DocumentType)
                        .unwrap_or(false)
                })
                .collect();
            for node in content {
                arena.append_child(html, node)?;
            }
            arena.append_child(doc, html)?;
            html
        }
    };

    if find_child_element(arena, html, "body").is_none() {
        let body = arena.add_node(DomNode::element("body"));
        let content: Vec<NodeId> = arena
            .children(html)
            .filter(|&c| arena.get(c).ok().and_then(|n| n.tag_name()) != Some("head"))
            .collect();
        for node in content {
            arena.append_child(body, node)?;
        }
        arena.append_child(html, body)?;
    }

    if find_child_element(arena, html, "head").is_none() {
        let head = arena.add_node(DomNode::element("head"));
        arena.insert_child(html, head, 0)?;
    }

    Ok(())
}

/// Single-pass tokenizer + tree builder over a stack of open nodes
struct TreeBuilder<'a> {
    arena: &'a mut DomArena,
    input: &'a str,
    pos: usize,
    /// Open nodes; index 0 is the container and is never popped
    stack: Vec<NodeId>,
    max_depth: usize,
}

impl<'a> TreeBuilder<'a> {
    fn new(arena: &'a mut DomArena, input: &'a str, container: NodeId, max_depth: usize) -> Self {
        Self {
            arena,
            input,
            pos: 0,
            stack: vec![container],
            max_depth,
        }
    }

    fn error(&self, offset: usize, message: impl Into<String>) -> DomError {
        DomError::Parse {
            offset,
            message: message.into(),
        }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn current(&self) -> NodeId {
        self.stack[self.stack.len() - 1]
    }

    fn run(mut self) -> Result<()> {
        while self.pos < self.input.len() {
            let rest = self.rest();
            if rest.starts_with("<!--") {
                self.comment()?;
            } else if rest.starts_with("<!") {
                self.declaration()?;
            } else if rest.starts_with("</") {
                self.end_tag()?;
            } else if rest.starts_with('<')
                && rest[1..].starts_with(|c: char| c.is_ascii_alphabetic())
            {
                self.start_tag()?;
            } else {
                self.text()?;
            }
        }
        Ok(())
    }

    fn append(&mut self, node: DomNode) -> Result<NodeId> {
        let id = self.arena.add_node(node);
        let parent = self.current();
        self.arena.append_child(parent, id)?;
        Ok(id)
    }

    fn push_text(&mut self, data: &str) -> Result<()> {
        if data.is_empty() {
            return Ok(());
        }
        // A literal '<' splits a text run in two; merge back into one node.
        let parent = self.current();
        if let Some(last) = self.arena.get(parent)?.last_child {
            let node = self.arena.get_mut(last)?;
            if node.node_type == NodeType::Text {
                node.node_value.push_str(data);
                return Ok(());
            }
        }
        self.append(DomNode::text(data))?;
        Ok(())
    }

    fn text(&mut self) -> Result<()> {
        let rest = self.rest();
        // Skip the first char so a literal '<' makes progress
        let first = rest.chars().next().map(char::len_utf8).unwrap_or(1);
        let end = rest[first..]
            .find('<')
            .map(|i| i + first)
            .unwrap_or(rest.len());
        let data = decode_entities(&rest[..end]).into_owned();
        self.pos += end;
        self.push_text(&data)
    }

    fn comment(&mut self) -> Result<()> {
        let start = self.pos;
        let body = &self.input[start + 4..];
        let end = body
            .find("-->")
            .ok_or_else(|| self.error(start, "unterminated comment"))?;
        let data = body[..end].to_string();
        self.pos = start + 4 + end + 3;
        self.append(DomNode::comment(data))?;
        Ok(())
    }

    fn declaration(&mut self) -> Result<()> {
        let start = self.pos;
        let end = self.input[start..]
            .find('>')
            .ok_or_else(|| self.error(start, "unterminated declaration"))?;
        let inner = self.input[start + 2..start + end].trim();
        self.pos = start + end + 1;

        let is_doctype = inner.len() >= 7 && inner[..7].eq_ignore_ascii_case("doctype");
        if is_doctype {
            let name = inner[7..].trim().to_ascii_lowercase();
            self.append(DomNode::doctype(name))?;
        } else {
            self.append(DomNode::comment(inner.to_string()))?;
        }
        Ok(())
    }

    fn end_tag(&mut self) -> Result<()> {
        let start = self.pos;
        let end = self.input[start..]
            .find('>')
            .ok_or_else(|| self.error(start, "unterminated end tag"))?;
        let name = self.input[start + 2..start + end]
            .trim()
            .to_ascii_lowercase();
        self.pos = start + end + 1;

        let open = self.stack.iter().skip(1).rposition(|&id| {
            self.arena
                .get(id)
                .map(|n| n.node_name == name)
                .unwrap_or(false)
        });
        if let Some(index) = open {
            self.stack.truncate(index + 1);
        }
        Ok(())
    }

    fn start_tag(&mut self) -> Result<()> {
        let start = self.pos;
        let bytes = self.input.as_bytes();
        let mut i = start + 1;

        while i < bytes.len() && is_name_byte(bytes[i]) {
            i += 1;
        }
        let tag = self.input[start + 1..i].to_ascii_lowercase();
        let mut element = DomNode::element(tag.clone());
        let mut self_closing = false;

        loop {
            while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            if i >= bytes.len() {
                return Err(self.error(start, format!("unterminated <{}> tag", tag)));
            }
            match bytes[i] {
                b'>' => {
                    i += 1;
                    break;
                }
                b'/' => {
                    i += 1;
                    if bytes.get(i) == Some(&b'>') {
                        self_closing = true;
                        i += 1;
                        break;
                    }
                }
                _ => {
                    let (attr, next) = self.attribute(i)?;
                    i = next;
                    if element.attr(&attr.key).is_none() {
                        element.attributes.push(attr);
                    }
                }
            }
        }
        self.pos = i;

        let id = self.append(element)?;
        if self_closing || is_void(&tag) {
            return Ok(());
        }

        let depth = self.stack.len();
        if depth > self.max_depth {
            return Err(DomError::MaxDepthExceeded {
                current: depth,
                max: self.max_depth,
            });
        }
        self.stack.push(id);

        if is_raw_text(&tag) {
            self.raw_text(&tag)?;
        }
        Ok(())
    }

    /// Parse one attribute starting at byte `i`; returns it and the next offset
    fn attribute(&self, mut i: usize) -> Result<(Attribute, usize)> {
        let bytes = self.input.as_bytes();
        let name_start = i;
        while i < bytes.len()
            && !bytes[i].is_ascii_whitespace()
            && !matches!(bytes[i], b'=' | b'>' | b'/')
        {
            i += 1;
        }
        let key = self.input[name_start..i].to_ascii_lowercase();

        let mut j = i;
        while j < bytes.len() && bytes[j].is_ascii_whitespace() {
            j += 1;
        }
        if bytes.get(j) != Some(&b'=') {
            return Ok((Attribute::new(key, ""), i));
        }
        j += 1;
        while j < bytes.len() && bytes[j].is_ascii_whitespace() {
            j += 1;
        }

        let (raw, next) = match bytes.get(j).copied() {
            Some(quote) if quote == b'"' || quote == b'\'' => {
                let close = self.input[j + 1..]
                    .find(quote as char)
                    .ok_or_else(|| self.error(j, format!("unterminated value for `{}`", key)))?;
                (&self.input[j + 1..j + 1 + close], j + 1 + close + 1)
            }
            _ => {
                let value_start = j;
                while j < bytes.len() && !bytes[j].is_ascii_whitespace() && bytes[j] != b'>' {
                    j += 1;
                }
                (&self.input[value_start..j], j)
            }
        };

        Ok((Attribute::new(key, decode_entities(raw)), next))
    }

    /// Consume raw text up to `</tag`, leaving the end tag for the main loop
    fn raw_text(&mut self, tag: &str) -> Result<()> {
        let rest = self.rest();
        let needle = format!("</{}", tag);
        let end = rest
            .as_bytes()
            .windows(needle.len())
            .position(|w| w.eq_ignore_ascii_case(needle.as_bytes()))
            .unwrap_or(rest.len());
        let data = rest[..end].to_string();
        self.pos += end;
        self.push_text(&data)
    }
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b':' | b'.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serializer::MarkupSerializer;

    fn render(arena: &DomArena, id: NodeId) -> String {
        MarkupSerializer::new().render(arena, id).unwrap()
    }

    #[test]
    fn test_parse_text_fragment() {
        let mut arena = DomArena::new();
        let id = DomParser::new().parse_fragment(&mut arena, "1").unwrap();

        let node = arena.get(id).unwrap();
        assert!(node.is_text());
        assert_eq!(node.node_value, "1");
        assert_eq!(node.parent, None);
    }

    #[test]
    fn test_parse_empty_fragment_is_empty_text() {
        let mut arena = DomArena::new();
        let id = DomParser::new().parse_fragment(&mut arena, "").unwrap();
        assert!(arena.get(id).unwrap().is_text());
        assert_eq!(render(&arena, id), "");
    }

    #[test]
    fn test_parse_element_fragment() {
        let mut arena = DomArena::new();
        let markup = r#"<DIV id="a" class='x y' hidden data-n=3><p>one &amp; two</p><br/><img src="i.png"></DIV>"#;
        let id = DomParser::new().parse_fragment(&mut arena, markup).unwrap();

        let div = arena.get(id).unwrap();
        assert_eq!(div.tag_name(), Some("div"));
        assert_eq!(div.attr("class"), Some("x y"));
        assert_eq!(div.attr("hidden"), Some(""));
        assert_eq!(div.attr("data-n"), Some("3"));
        assert_eq!(arena.child_count(id), 3);

        assert_eq!(
            render(&arena, id),
            r#"<div id="a" class="x y" hidden="" data-n="3"><p>one &amp; two</p><br><img src="i.png"></div>"#
        );
    }

    #[test]
    fn test_fragment_must_have_one_root() {
        let mut arena = DomArena::new();
        let err = DomParser::new()
            .parse_fragment(&mut arena, "<a></a><b></b>")
            .unwrap_err();
        assert!(matches!(err, DomError::Parse { .. }));

        let nodes = DomParser::new()
            .parse_fragment_nodes(&mut arena, "<a></a><b></b>")
            .unwrap();
        assert_eq!(nodes.len(), 2);
    }

    #[test]
    fn test_malformed_markup() {
        let parser = DomParser::new();
        let mut arena = DomArena::new();

        for bad in ["<div", "<a href=\"x>", "<!-- open", "</div"] {
            let err = parser.parse_fragment(&mut arena, bad).unwrap_err();
            assert!(matches!(err, DomError::Parse { .. }), "{bad}: {err}");
        }
    }

    #[test]
    fn test_max_depth() {
        let parser = DomParser::with_config(ParserConfig { max_depth: 3 });
        let mut arena = DomArena::new();

        assert!(parser.parse_fragment(&mut arena, "<a><b><c></c></b></a>").is_ok());
        let err = parser
            .parse_fragment(&mut arena, "<a><b><c><d></d></c></b></a>")
            .unwrap_err();
        assert!(matches!(err, DomError::MaxDepthExceeded { current: 4, max: 3 }));
    }

    #[test]
    fn test_stray_end_tag_and_literal_lt() {
        let mut arena = DomArena::new();
        let id = DomParser::new()
            .parse_fragment(&mut arena, "<p>a < b</span> c</p>")
            .unwrap();

        assert_eq!(arena.child_count(id), 1);
        assert_eq!(render(&arena, id), "<p>a &lt; b c</p>");
    }

    #[test]
    fn test_script_raw_text() {
        let mut arena = DomArena::new();
        let id = DomParser::new()
            .parse_fragment(&mut arena, "<script>if (a<b) { x = '</p>'; }</script>")
            .unwrap();
        let text = arena.get(id).unwrap().first_child.unwrap();
        assert_eq!(arena.get(text).unwrap().node_value, "if (a<b) { x = '</p>'; }");
    }

    #[test]
    fn test_parse_document_synthesizes_wrapper() {
        let (arena, doc) = DomParser::new()
            .parse_document("<!DOCTYPE html><h1>hi</h1>")
            .unwrap();

        assert_eq!(
            render(&arena, doc),
            "<!DOCTYPE html><html><head></head><body><h1>hi</h1></body></html>"
        );
    }

    #[test]
    fn test_parse_full_document() {
        let markup = "<!doctype html><html><head><title>t</title></head><body><div id=\"counter\">0</div></body></html>";
        let (arena, doc) = DomParser::new().parse_document(markup).unwrap();

        assert_eq!(render(&arena, doc), markup.replace("doctype", "DOCTYPE"));
        assert!(arena.check_links(doc).unwrap());
    }

    #[test]
    fn test_render_parse_round_trip() {
        let parser = DomParser::new();
        let mut arena = DomArena::new();
        let markup = r#"<ul class="list"><li data-x="&quot;q&quot;">a</li><!--c--><li><b>b</b> &lt;tail&gt;</li></ul>"#;

        let first = parser.parse_fragment(&mut arena, markup).unwrap();
        let rendered = render(&arena, first);
        let second = parser.parse_fragment(&mut arena, &rendered).unwrap();

        assert!(arena.same_structure(first, &arena, second).unwrap());
        assert_eq!(rendered, markup);
    }
}
