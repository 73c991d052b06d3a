//! XML document → typed template tree
//!
//! The parser fails only at the document level: a missing `<template>`
//! root is an XML error, and an unsupported `format` version marks the
//! document malformed without parsing its children. Per-node attribute
//! problems fall back to defaults, unknown element tags are skipped, and
//! bare text content becomes code blocks.

use xot::{Node, Xot};

use crate::document::{BuildOptionDecl, FormatVersion, TemplateDocument, UsingDecl};
use crate::error::{Result, TemplateError};
use crate::node::{
    AccessorKind, Argument, Combinator, NodeCommon, NodeKind, OptionRef, TemplateNode, TypeKind,
    Virtuality,
};
use crate::registry;
use crate::render::COMMENT_COLOR;
use crate::xml;

/// Characters that separate entries of the `options` attribute
const OPTION_DELIMITERS: [char; 3] = [',', ';', ' '];

/// Line prefix applied to comment bodies
const COMMENT_LINE_PREFIX: &str = "// ";

/// Parse an XML template source into a document
pub fn parse_template(source: &str) -> Result<TemplateDocument> {
    let mut xot = Xot::new();
    let doc = xot
        .parse(source)
        .map_err(|error| TemplateError::xml(error.to_string()))?;
    let root = xot
        .document_element(doc)
        .map_err(|error| TemplateError::xml(error.to_string()))?;

    let root_name = xml::local_name(&xot, root).unwrap_or("");
    if !root_name.eq_ignore_ascii_case("template") {
        return Err(TemplateError::xml(format!(
            "expected <template> root element, found <{}>",
            root_name
        )));
    }

    let format = xml::attr_or(&xot, root, "format", "1.0")
        .parse::<FormatVersion>()
        .unwrap_or_default();

    let mut template = TemplateDocument {
        id: xml::attr_or(&xot, root, "id", ""),
        text_color: xml::attr(&xot, root, "text-color"),
        format,
        priority: xml::attr_parse(&xot, root, "priority", 0),
        is_malformed: false,
        usings: Vec::new(),
        build_options: Vec::new(),
        children: Vec::new(),
        source_path: None,
    };

    if !TemplateDocument::is_format_supported(template.format) {
        log::warn!(
            "template '{}' declares unsupported format {}",
            template.id,
            template.format
        );
        template.is_malformed = true;
        return Ok(template);
    }

    let mut has_using_placeholder = false;

    for child in xot.children(root) {
        let Some(node) = parse_node(&xot, child) else {
            continue;
        };

        match &node.kind {
            NodeKind::Using {
                on_by_default,
                optional,
            } => {
                template.usings.push(UsingDecl {
                    id: node.common.id.clone(),
                    on_by_default: *on_by_default,
                    optional: *optional,
                });
                // a single placeholder marks where the usings re-enter
                if !has_using_placeholder {
                    template
                        .children
                        .push(TemplateNode::new(NodeKind::UsingPlaceholder));
                    has_using_placeholder = true;
                }
            }
            NodeKind::BuildOption {
                name,
                option_type,
                default,
                required,
            } => {
                template.build_options.push(BuildOptionDecl {
                    id: node.common.id.clone(),
                    name: name.clone(),
                    option_type: option_type.clone(),
                    default: default.clone(),
                    required: *required,
                });
            }
            _ => template.children.push(node),
        }
    }

    Ok(template)
}

/// Parse one XML node into a template node, if the node maps to one.
/// Unknown element tags are skipped; non-blank text becomes a code block.
pub fn parse_node(xot: &Xot, node: Node) -> Option<TemplateNode> {
    if let Some(tag) = xml::local_name(xot, node) {
        if let Some(parser) = registry::standard().parser_for(tag) {
            return Some(parser(xot, node));
        }
        log::debug!("skipping unknown template tag <{}>", tag);
        return None;
    }

    if let Some(text) = xml::text_of(xot, node) {
        if text.trim().is_empty() {
            return None;
        }
        return Some(TemplateNode::new(NodeKind::CodeBlock {
            body: clean_code_text(&text),
        }));
    }

    None
}

fn parse_common(xot: &Xot, node: Node) -> NodeCommon {
    NodeCommon {
        id: xml::attr_or(xot, node, "id", ""),
        text_color: xml::attr(xot, node, "text-color"),
        children: Vec::new(),
    }
}

fn parse_children(xot: &Xot, node: Node) -> Vec<TemplateNode> {
    xot.children(node)
        .filter_map(|child| parse_node(xot, child))
        .collect()
}

pub fn parse_namespace(xot: &Xot, node: Node) -> TemplateNode {
    let mut common = parse_common(xot, node);
    common.children = parse_children(xot, node);
    TemplateNode {
        common,
        kind: NodeKind::Namespace,
    }
}

fn parse_type(xot: &Xot, node: Node, kind: TypeKind) -> TemplateNode {
    let mut common = parse_common(xot, node);
    let mut interfaces = Vec::new();

    for child in xot.children(node) {
        // implemented-interface contracts are attributes of the type, not
        // rendered children
        if let Some(tag) = xml::local_name(xot, child) {
            if tag.eq_ignore_ascii_case("implements") {
                let name = xml::attr_or(xot, child, "id", "");
                if !name.is_empty() {
                    interfaces.push(name);
                }
                continue;
            }
        }
        if let Some(parsed) = parse_node(xot, child) {
            common.children.push(parsed);
        }
    }

    TemplateNode {
        common,
        kind: NodeKind::Type {
            kind,
            accessibility: xml::attr_or(xot, node, "accessibility", "public"),
            is_sealed: xml::attr_bool(xot, node, "sealed", false),
            is_partial: xml::attr_bool(xot, node, "partial", false),
            is_static: xml::attr_bool(xot, node, "static", false),
            is_abstract: xml::attr_bool(xot, node, "abstract", false),
            base: xml::attr(xot, node, "base").filter(|base| !base.is_empty()),
            interfaces,
        },
    }
}

pub fn parse_class(xot: &Xot, node: Node) -> TemplateNode {
    parse_type(xot, node, TypeKind::Class)
}

pub fn parse_struct(xot: &Xot, node: Node) -> TemplateNode {
    parse_type(xot, node, TypeKind::Struct)
}

pub fn parse_interface(xot: &Xot, node: Node) -> TemplateNode {
    parse_type(xot, node, TypeKind::Interface)
}

pub fn parse_enum(xot: &Xot, node: Node) -> TemplateNode {
    parse_type(xot, node, TypeKind::Enum)
}

pub fn parse_function(xot: &Xot, node: Node) -> TemplateNode {
    let mut common = parse_common(xot, node);
    let mut arguments = Vec::new();

    for child in xot.children(node) {
        if let Some(tag) = xml::local_name(xot, child) {
            if tag.eq_ignore_ascii_case("argument") {
                arguments.push(Argument {
                    arg_type: xml::attr_or(xot, child, "type", "?"),
                    name: xml::attr_or(xot, child, "id", "?"),
                });
                continue;
            }
        }
        if let Some(parsed) = parse_node(xot, child) {
            common.children.push(parsed);
        }
    }

    TemplateNode {
        common,
        kind: NodeKind::Function {
            accessibility: xml::attr_or(xot, node, "accessibility", "public"),
            virtuality: Virtuality::parse(&xml::attr_or(xot, node, "virtuality", "")),
            is_static: xml::attr_bool(xot, node, "static", false),
            is_sealed: xml::attr_bool(xot, node, "sealed", false),
            return_type: xml::attr_or(xot, node, "returnType", "void"),
            arguments,
        },
    }
}

fn parse_property_like(xot: &Xot, node: Node, is_event: bool) -> TemplateNode {
    let mut common = parse_common(xot, node);
    common.children = parse_children(xot, node);

    TemplateNode {
        common,
        kind: NodeKind::Property {
            accessibility: xml::attr_or(xot, node, "accessibility", "public"),
            prop_type: xml::attr_or(xot, node, "type", "?"),
            default_value: xml::attr(xot, node, "default").filter(|value| !value.is_empty()),
            is_static: xml::attr_bool(xot, node, "static", false),
            virtuality: Virtuality::parse(&xml::attr_or(xot, node, "virtuality", "")),
            is_event,
        },
    }
}

pub fn parse_property(xot: &Xot, node: Node) -> TemplateNode {
    parse_property_like(xot, node, false)
}

pub fn parse_event(xot: &Xot, node: Node) -> TemplateNode {
    parse_property_like(xot, node, true)
}

fn parse_accessor(xot: &Xot, node: Node, kind: AccessorKind) -> TemplateNode {
    let mut common = parse_common(xot, node);
    common.children = parse_children(xot, node);

    TemplateNode {
        common,
        kind: NodeKind::Accessor {
            kind,
            access: xml::attr_or(xot, node, "access", ""),
        },
    }
}

pub fn parse_getter(xot: &Xot, node: Node) -> TemplateNode {
    parse_accessor(xot, node, AccessorKind::Getter)
}

pub fn parse_setter(xot: &Xot, node: Node) -> TemplateNode {
    parse_accessor(xot, node, AccessorKind::Setter)
}

pub fn parse_comment(xot: &Xot, node: Node) -> TemplateNode {
    let mut common = parse_common(xot, node);
    common.text_color = Some(COMMENT_COLOR.to_string());

    let body = clean_code_text(&xml::inner_text(xot, node));
    let body = format!(
        "{}{}",
        COMMENT_LINE_PREFIX,
        body.replace('\n', &format!("\n{}", COMMENT_LINE_PREFIX))
    );

    TemplateNode {
        common,
        kind: NodeKind::Comment { body },
    }
}

pub fn parse_codeblock(xot: &Xot, node: Node) -> TemplateNode {
    TemplateNode {
        common: parse_common(xot, node),
        kind: NodeKind::CodeBlock {
            body: clean_code_text(&xml::inner_text(xot, node)),
        },
    }
}

pub fn parse_if_build_option(xot: &Xot, node: Node) -> TemplateNode {
    let mut common = parse_common(xot, node);
    common.children = parse_children(xot, node);

    let options = xml::attr_or(xot, node, "options", "")
        .split(&OPTION_DELIMITERS[..])
        .filter(|entry| !entry.is_empty())
        .map(OptionRef::parse)
        .collect();

    let combinator = if xml::attr_or(xot, node, "operator", "and").eq_ignore_ascii_case("and") {
        Combinator::And
    } else {
        Combinator::Or
    };

    TemplateNode {
        common,
        kind: NodeKind::IfBuildOption {
            combinator,
            options,
        },
    }
}

pub fn parse_using(xot: &Xot, node: Node) -> TemplateNode {
    TemplateNode {
        common: parse_common(xot, node),
        kind: NodeKind::Using {
            on_by_default: xml::attr_bool(xot, node, "default", true),
            optional: xml::attr_bool(xot, node, "optional", false),
        },
    }
}

pub fn parse_build_option(xot: &Xot, node: Node) -> TemplateNode {
    let name = xml::attr_or(xot, node, "name", "");
    let mut common = parse_common(xot, node);
    common.id = xml::attr(xot, node, "replacement").unwrap_or_else(|| name.to_lowercase());

    TemplateNode {
        common,
        kind: NodeKind::BuildOption {
            name,
            option_type: xml::attr_or(xot, node, "type", "string"),
            default: xml::attr(xot, node, "default"),
            required: xml::attr_bool(xot, node, "required", true),
        },
    }
}

pub fn parse_metadata(xot: &Xot, node: Node) -> TemplateNode {
    TemplateNode {
        common: parse_common(xot, node),
        kind: NodeKind::MetaData {
            key: xml::attr_or(xot, node, "key", ""),
            value: xml::attr_or(xot, node, "value", ""),
        },
    }
}

/// Normalize a raw text block: drop leading/trailing blank lines and strip
/// the common leading whitespace, so the XML file's own indentation does
/// not leak into the output.
fn clean_code_text(text: &str) -> String {
    let normalized = text.replace("\r\n", "\n");
    let lines: Vec<&str> = normalized.split('\n').collect();

    let Some(start) = lines.iter().position(|line| !line.trim().is_empty()) else {
        return String::new();
    };
    let end = lines
        .iter()
        .rposition(|line| !line.trim().is_empty())
        .unwrap_or(start);
    let lines = &lines[start..=end];

    let indent = lines
        .iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start().len())
        .min()
        .unwrap_or(0);

    lines
        .iter()
        .map(|line| {
            if line.len() >= indent {
                &line[indent..]
            } else {
                line.trim_start()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
