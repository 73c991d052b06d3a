//! Tag registry: maps template tag names to node parse functions
//!
//! Registration is explicit and runs once, in declaration order. When two
//! registrations use the same tag the later one wins; this is the
//! documented tie-break, replacing the nondeterministic type-scan of
//! earlier designs.

use std::collections::HashMap;
use std::sync::OnceLock;

use xot::{Node, Xot};

use crate::node::TemplateNode;
use crate::parse;

/// Parses one XML element into a template node. Attribute problems fall
/// back to defaults, so node parsing itself never fails.
pub type NodeParser = fn(&Xot, Node) -> TemplateNode;

/// Case-insensitive tag → parser table
pub struct Registry {
    parsers: HashMap<String, NodeParser>,
}

impl Registry {
    pub fn new() -> Self {
        Registry {
            parsers: HashMap::new(),
        }
    }

    /// Register a parser for a tag; a later registration for the same tag
    /// overwrites the earlier one
    pub fn register(&mut self, tag: &str, parser: NodeParser) {
        self.parsers.insert(tag.to_ascii_lowercase(), parser);
    }

    /// Look up the parser for a tag, case-insensitively
    pub fn parser_for(&self, tag: &str) -> Option<NodeParser> {
        self.parsers.get(&tag.to_ascii_lowercase()).copied()
    }

    pub fn known_tags(&self) -> impl Iterator<Item = &str> {
        self.parsers.keys().map(|tag| tag.as_str())
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

/// The registry of standard template tags
pub fn standard() -> &'static Registry {
    static STANDARD: OnceLock<Registry> = OnceLock::new();
    STANDARD.get_or_init(|| {
        let mut registry = Registry::new();
        registry.register("namespace", parse::parse_namespace);
        registry.register("class", parse::parse_class);
        registry.register("struct", parse::parse_struct);
        registry.register("interface", parse::parse_interface);
        registry.register("enum", parse::parse_enum);
        registry.register("function", parse::parse_function);
        registry.register("property", parse::parse_property);
        registry.register("event", parse::parse_event);
        registry.register("getter", parse::parse_getter);
        registry.register("setter", parse::parse_setter);
        registry.register("comment", parse::parse_comment);
        registry.register("codeblock", parse::parse_codeblock);
        registry.register("if-build-option", parse::parse_if_build_option);
        registry.register("using", parse::parse_using);
        registry.register("build-option", parse::parse_build_option);
        registry.register("metadata", parse::parse_metadata);
        registry
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        let registry = standard();
        assert!(registry.parser_for("Namespace").is_some());
        assert!(registry.parser_for("IF-BUILD-OPTION").is_some());
        assert!(registry.parser_for("unknown-tag").is_none());
    }

    #[test]
    fn test_later_registration_wins() {
        use crate::node::NodeKind;

        let mut registry = Registry::new();
        registry.register("x", parse::parse_namespace);
        registry.register("x", parse::parse_comment);

        let mut xot = Xot::new();
        let doc = xot.parse("<x>hi</x>").unwrap();
        let root = xot.document_element(doc).unwrap();

        let parser = registry.parser_for("x").unwrap();
        let node = parser(&xot, root);
        assert!(matches!(node.kind, NodeKind::Comment { .. }));
    }
}
