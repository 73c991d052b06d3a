//! Typed template node tree
//!
//! A parsed template is a tree of [`TemplateNode`]s. Each node shares a
//! common record (identifier, optional display color, owned children) and
//! carries a per-variant payload. The tree is built once per parse and is
//! never mutated afterwards; settings-driven pruning works by testing
//! inclusion at render time.

use crate::settings::TemplateSettings;

/// Fields shared by every template node
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodeCommon {
    /// Identifier; used as the emitted name and as a substitution key
    pub id: String,
    /// Optional syntax-highlight color for the emitted text
    pub text_color: Option<String>,
    /// Owned child nodes, in document order
    pub children: Vec<TemplateNode>,
}

/// Virtuality of a function or property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Virtuality {
    #[default]
    None,
    Virtual,
    Abstract,
    Override,
}

impl Virtuality {
    /// Parse the `virtuality` attribute value, case-insensitively.
    /// Unknown values fall back to `None`.
    pub fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "virtual" => Virtuality::Virtual,
            "abstract" => Virtuality::Abstract,
            "override" => Virtuality::Override,
            _ => Virtuality::None,
        }
    }

    /// The emitted keyword, or `None` when there is nothing to emit
    pub fn keyword(self) -> Option<&'static str> {
        match self {
            Virtuality::None => None,
            Virtuality::Virtual => Some("virtual"),
            Virtuality::Abstract => Some("abstract"),
            Virtuality::Override => Some("override"),
        }
    }
}

/// Kind of an emitted type declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Class,
    Struct,
    Interface,
    Enum,
}

impl TypeKind {
    pub fn keyword(self) -> &'static str {
        match self {
            TypeKind::Class => "class",
            TypeKind::Struct => "struct",
            TypeKind::Interface => "interface",
            TypeKind::Enum => "enum",
        }
    }
}

/// Getter or setter of a property
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessorKind {
    Getter,
    Setter,
}

impl AccessorKind {
    pub fn keyword(self) -> &'static str {
        match self {
            AccessorKind::Getter => "get",
            AccessorKind::Setter => "set",
        }
    }
}

/// How a conditional node combines its referenced build options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    And,
    Or,
}

/// One build-option reference inside a conditional node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionRef {
    pub name: String,
    pub negated: bool,
}

impl OptionRef {
    /// Parse a single entry of the `options` attribute; a leading `!`
    /// negates the option.
    pub fn parse(entry: &str) -> Self {
        match entry.strip_prefix('!') {
            Some(name) => OptionRef {
                name: name.to_string(),
                negated: true,
            },
            None => OptionRef {
                name: entry.to_string(),
                negated: false,
            },
        }
    }
}

/// One parameter of a function node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argument {
    pub arg_type: String,
    pub name: String,
}

/// Per-variant payload of a template node
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Optional wrapping namespace; always included
    Namespace,
    /// A type declaration (class, struct, interface, enum)
    Type {
        kind: TypeKind,
        accessibility: String,
        is_sealed: bool,
        is_partial: bool,
        is_static: bool,
        is_abstract: bool,
        base: Option<String>,
        interfaces: Vec<String>,
    },
    /// A function declaration with an optional body
    Function {
        accessibility: String,
        virtuality: Virtuality,
        is_static: bool,
        is_sealed: bool,
        return_type: String,
        arguments: Vec<Argument>,
    },
    /// A property (or event) declaration
    Property {
        accessibility: String,
        prop_type: String,
        default_value: Option<String>,
        is_static: bool,
        virtuality: Virtuality,
        is_event: bool,
    },
    /// A property getter or setter
    Accessor { kind: AccessorKind, access: String },
    /// A comment; the body is already line-prefixed with the comment marker
    Comment { body: String },
    /// A raw block of code text
    CodeBlock { body: String },
    /// Children are rendered only when the option condition holds
    IfBuildOption {
        combinator: Combinator,
        options: Vec<OptionRef>,
    },
    /// A `using <id>;` directive
    Using { on_by_default: bool, optional: bool },
    /// Marks where extracted using directives are re-injected
    UsingPlaceholder,
    /// Declares a named build option; never rendered
    BuildOption {
        name: String,
        option_type: String,
        default: Option<String>,
        required: bool,
    },
    /// A key/value metadata entry; never rendered
    MetaData { key: String, value: String },
}

/// One unit of the template tree
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateNode {
    pub common: NodeCommon,
    pub kind: NodeKind,
}

impl TemplateNode {
    pub fn new(kind: NodeKind) -> Self {
        TemplateNode {
            common: NodeCommon::default(),
            kind,
        }
    }

    pub fn with_id<S: Into<String>>(mut self, id: S) -> Self {
        self.common.id = id.into();
        self
    }

    pub fn with_children(mut self, children: Vec<TemplateNode>) -> Self {
        self.common.children = children;
        self
    }

    /// The node identifier after the settings' substitution pipeline has
    /// run over it
    pub fn resolved_id(&self, settings: &TemplateSettings) -> String {
        settings.apply_replacements_to_text(&self.common.id)
    }

    /// Whether this node is included in the rendered output.
    ///
    /// Pure in `(self, settings)`: the default policy includes a node
    /// unless its resolved identifier is empty, which lets a node
    /// disappear when its name resolves to empty text.
    pub fn should_use(&self, settings: &TemplateSettings) -> bool {
        match &self.kind {
            NodeKind::Namespace => true,
            // a bodiless accessor emits nothing, so it must not count as
            // an included sibling
            NodeKind::Accessor { .. } => !self.common.children.is_empty(),
            NodeKind::Comment { .. } | NodeKind::CodeBlock { .. } => true,
            NodeKind::IfBuildOption {
                combinator,
                options,
            } => condition_met(*combinator, options, settings),
            NodeKind::BuildOption { .. } | NodeKind::MetaData { .. } => false,
            _ => !self.resolved_id(settings).is_empty(),
        }
    }
}

/// Evaluate a conditional node's option set against the settings.
///
/// Each option resolves to true when its value string-equals "true"
/// (case-insensitive); a negated entry inverts its individual result
/// before folding. AND folds from true, OR folds from false, so an empty
/// option set includes under AND and excludes under OR.
pub fn condition_met(
    combinator: Combinator,
    options: &[OptionRef],
    settings: &TemplateSettings,
) -> bool {
    let mut result = matches!(combinator, Combinator::And);

    for option in options {
        let mut met = settings
            .build_option_value(&option.name)
            .map_or(false, |value| value.eq_ignore_ascii_case("true"));

        if option.negated {
            met = !met;
        }

        match combinator {
            Combinator::And => result &= met,
            Combinator::Or => result |= met,
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::TemplateSettings;

    fn settings_with(options: &[(&str, &str)]) -> TemplateSettings {
        let mut settings = TemplateSettings::default();
        for (id, value) in options {
            settings.add_text_option(id, value);
        }
        settings
    }

    fn refs(entries: &[&str]) -> Vec<OptionRef> {
        entries.iter().map(|entry| OptionRef::parse(entry)).collect()
    }

    #[test]
    fn test_option_ref_negation() {
        let option = OptionRef::parse("!debug");
        assert!(option.negated);
        assert_eq!(option.name, "debug");

        let option = OptionRef::parse("debug");
        assert!(!option.negated);
    }

    #[test]
    fn test_and_condition_with_negation() {
        let settings = settings_with(&[("a", "true"), ("b", "false")]);
        assert!(condition_met(
            Combinator::And,
            &refs(&["a", "!b"]),
            &settings
        ));

        let settings = settings_with(&[("a", "true"), ("b", "true")]);
        assert!(!condition_met(
            Combinator::And,
            &refs(&["a", "!b"]),
            &settings
        ));
    }

    #[test]
    fn test_or_condition() {
        let settings = settings_with(&[("a", "false"), ("b", "True")]);
        assert!(condition_met(Combinator::Or, &refs(&["a", "b"]), &settings));

        let settings = settings_with(&[("a", "false"), ("b", "no")]);
        assert!(!condition_met(Combinator::Or, &refs(&["a", "b"]), &settings));
    }

    #[test]
    fn test_empty_option_set() {
        let settings = TemplateSettings::default();
        assert!(condition_met(Combinator::And, &[], &settings));
        assert!(!condition_met(Combinator::Or, &[], &settings));
    }

    #[test]
    fn test_unknown_option_is_false() {
        let settings = TemplateSettings::default();
        assert!(!condition_met(
            Combinator::And,
            &refs(&["missing"]),
            &settings
        ));
        assert!(condition_met(
            Combinator::And,
            &refs(&["!missing"]),
            &settings
        ));
    }

    #[test]
    fn test_accessor_inclusion_requires_a_body() {
        let settings = TemplateSettings::default();

        let empty = TemplateNode::new(NodeKind::Accessor {
            kind: AccessorKind::Setter,
            access: String::new(),
        });
        assert!(!empty.should_use(&settings));

        let with_body = TemplateNode::new(NodeKind::Accessor {
            kind: AccessorKind::Getter,
            access: String::new(),
        })
        .with_children(vec![TemplateNode::new(NodeKind::CodeBlock {
            body: "return x;".to_string(),
        })]);
        assert!(with_body.should_use(&settings));
    }

    #[test]
    fn test_default_inclusion_follows_resolved_id() {
        let settings = settings_with(&[("name", "Foo")]);
        let node = TemplateNode::new(NodeKind::Namespace).with_id("{name}");
        assert!(node.should_use(&settings));

        let function = TemplateNode::new(NodeKind::Function {
            accessibility: "public".to_string(),
            virtuality: Virtuality::None,
            is_static: false,
            is_sealed: false,
            return_type: "void".to_string(),
            arguments: Vec::new(),
        })
        .with_id("{missingoption}");
        // "{missingoption}" stays verbatim, so the id is not empty
        assert!(function.should_use(&settings));

        let unnamed = TemplateNode::new(NodeKind::Property {
            accessibility: "public".to_string(),
            prop_type: "int".to_string(),
            default_value: None,
            is_static: false,
            virtuality: Virtuality::None,
            is_event: false,
        });
        assert!(!unnamed.should_use(&settings));
    }
}
