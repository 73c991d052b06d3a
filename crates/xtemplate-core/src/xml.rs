//! Attribute and text helpers over `xot` XML trees
//!
//! Per-node attribute parsing never fails: a missing or unparseable
//! attribute falls back to the supplied default.

use std::str::FromStr;

use xot::{Node, Xot};

/// Local name of an element node, or `None` for non-element nodes
pub fn local_name<'a>(xot: &'a Xot, node: Node) -> Option<&'a str> {
    let element = xot.element(node)?;
    Some(xot.name_ns_str(element.name()).0)
}

/// String attribute value, if present
pub fn attr(xot: &Xot, node: Node, name: &str) -> Option<String> {
    if xot.element(node).is_none() {
        return None;
    }
    let name_id = xot.name(name)?;
    xot.attributes(node).get(name_id).cloned()
}

/// String attribute value with a fallback
pub fn attr_or(xot: &Xot, node: Node, name: &str, fallback: &str) -> String {
    attr(xot, node, name).unwrap_or_else(|| fallback.to_string())
}

/// Boolean attribute; accepts `true`/`false` in any case, anything else
/// falls back
pub fn attr_bool(xot: &Xot, node: Node, name: &str, fallback: bool) -> bool {
    match attr(xot, node, name) {
        Some(value) => match value.to_ascii_lowercase().as_str() {
            "true" => true,
            "false" => false,
            _ => fallback,
        },
        None => fallback,
    }
}

/// Parsed attribute of any `FromStr` type; parse failures fall back
pub fn attr_parse<T: FromStr>(xot: &Xot, node: Node, name: &str, fallback: T) -> T {
    attr(xot, node, name)
        .and_then(|value| value.parse().ok())
        .unwrap_or(fallback)
}

/// Text content of a text node, or `None` for any other node kind
pub fn text_of(xot: &Xot, node: Node) -> Option<String> {
    xot.text(node).map(|text| text.get().to_string())
}

/// Concatenated text content of a node and all its descendants
pub fn inner_text(xot: &Xot, node: Node) -> String {
    let mut result = String::new();
    for descendant in xot.descendants(node) {
        if let Some(text) = xot.text(descendant) {
            result.push_str(text.get());
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(xml: &str) -> (Xot, Node) {
        let mut xot = Xot::new();
        let doc = xot.parse(xml).expect("test xml should parse");
        let root = xot.document_element(doc).expect("document element");
        (xot, root)
    }

    #[test]
    fn test_attr_fallbacks() {
        let (xot, root) = parse(r#"<node id="x" count="nope" flag="TRUE"/>"#);
        assert_eq!(attr(&xot, root, "id"), Some("x".to_string()));
        assert_eq!(attr(&xot, root, "missing"), None);
        assert_eq!(attr_or(&xot, root, "missing", "y"), "y");
        assert_eq!(attr_parse::<i32>(&xot, root, "count", 7), 7);
        assert!(attr_bool(&xot, root, "flag", false));
        assert!(attr_bool(&xot, root, "missing", true));
    }

    #[test]
    fn test_inner_text_spans_children() {
        let (xot, root) = parse("<a>one<b>two</b>three</a>");
        assert_eq!(inner_text(&xot, root), "onetwothree");
    }
}
