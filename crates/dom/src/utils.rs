//! Utility functions for markup text handling

use crate::arena::DomArena;
use crate::error::Result;
use crate::types::{NodeId, NodeType};
use ahash::AHashMap;
use std::borrow::Cow;
use std::sync::OnceLock;

/// Cap text length for log output, respecting char boundaries
pub fn cap_text_length(text: &str, max_len: usize) -> Cow<'_, str> {
    if text.len() <= max_len {
        return Cow::Borrowed(text);
    }
    let mut end = max_len;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    Cow::Owned(format!("{}...", &text[..end]))
}

/// Get all text content from node and its children
pub fn get_text_content(arena: &DomArena, node_id: NodeId) -> Result<String> {
    let mut text = String::new();

    arena.traverse_df(node_id, |_, node| {
        if node.node_type == NodeType::Text {
            text.push_str(&node.node_value);
        }
        Ok(())
    })?;

    Ok(text)
}

fn escape_with<'a>(input: &'a str, special: &[char]) -> Cow<'a, str> {
    if !input.contains(special) {
        return Cow::Borrowed(input);
    }
    let mut out = String::with_capacity(input.len() + 8);
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' if special.contains(&'<') => out.push_str("&lt;"),
            '>' if special.contains(&'>') => out.push_str("&gt;"),
            '"' if special.contains(&'"') => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// Escape character data for a text node
pub fn escape_text(input: &str) -> Cow<'_, str> {
    escape_with(input, &['&', '<', '>'])
}

/// Escape a double-quoted attribute value
pub fn escape_attr(input: &str) -> Cow<'_, str> {
    escape_with(input, &['&', '"'])
}

fn named_entities() -> &'static AHashMap<&'static str, char> {
    static TABLE: OnceLock<AHashMap<&'static str, char>> = OnceLock::new();
    TABLE.get_or_init(|| {
        [
            ("amp", '&'),
            ("lt", '<'),
            ("gt", '>'),
            ("quot", '"'),
            ("apos", '\''),
            ("nbsp", '\u{a0}'),
            ("copy", '\u{a9}'),
            ("reg", '\u{ae}'),
            ("hellip", '\u{2026}'),
            ("mdash", '\u{2014}'),
            ("ndash", '\u{2013}'),
        ]
        .into_iter()
        .collect()
    })
}

/// Decode character references. Unknown or malformed references are kept
/// verbatim, as browsers do.
pub fn decode_entities(input: &str) -> Cow<'_, str> {
    if !input.contains('&') {
        return Cow::Borrowed(input);
    }

    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];

        let decoded = rest[1..].find(';').and_then(|semi| {
            let name = &rest[1..1 + semi];
            let c = if let Some(num) = name.strip_prefix('#') {
                let code = match num.strip_prefix(['x', 'X']) {
                    Some(hex) => u32::from_str_radix(hex, 16).ok(),
                    None => num.parse::<u32>().ok(),
                };
                code.and_then(char::from_u32)
            } else {
                named_entities().get(name).copied()
            };
            c.map(|c| (c, semi + 2))
        });

        match decoded {
            Some((c, consumed)) => {
                out.push(c);
                rest = &rest[consumed..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }

    out.push_str(rest);
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DomNode;

    #[test]
    fn test_cap_text_length() {
        assert_eq!(cap_text_length("hello", 10), "hello");
        assert_eq!(cap_text_length("hello world", 5), "hello...");
        assert_eq!(cap_text_length("héllo", 2), "h...");
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape_text("a < b & c > d"), "a &lt; b &amp; c &gt; d");
        assert_eq!(escape_attr(r#"say "hi" <now>"#), "say &quot;hi&quot; <now>");
        assert!(matches!(escape_text("plain"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("a &lt;b&gt; &amp; c"), "a <b> & c");
        assert_eq!(decode_entities("&#65;&#x42;&apos;"), "AB'");
        assert_eq!(decode_entities("fish & chips"), "fish & chips");
        assert_eq!(decode_entities("&bogus; &"), "&bogus; &");
    }

    #[test]
    fn test_text_content() {
        let mut arena = DomArena::new();
        let p = arena.add_node(DomNode::element("p"));
        let a = arena.add_node(DomNode::text("one "));
        let b = arena.add_node(DomNode::element("b"));
        let c = arena.add_node(DomNode::text("two"));
        arena.append_child(p, a).unwrap();
        arena.append_child(p, b).unwrap();
        arena.append_child(b, c).unwrap();

        assert_eq!(get_text_content(&arena, p).unwrap(), "one two");
    }
}
