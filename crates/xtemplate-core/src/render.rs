//! Tree → text rendering
//!
//! A depth-first, document-order walk over the node tree. Only nodes whose
//! inclusion test passes are visited, and a single newline separates
//! consecutive included siblings, never before the first or after the
//! last. Indentation is tracked as nesting depth and emitted as a run of
//! tabs at the start of every line; post-processing converts the run to
//! the requested indentation style afterwards.

use crate::document::TemplateDocument;
use crate::node::{NodeKind, TemplateNode, Virtuality};
use crate::settings::TemplateSettings;

pub const USING_NAMESPACE_COLOR: &str = "#BBBBBB";
pub const COMMENT_COLOR: &str = "#37A143";
pub const SYSTEM_KEYWORD_COLOR: &str = "#4885A8";
pub const ACCESSIBILITY_KEYWORD_COLOR: &str = "#5396BD";
pub const TYPE_COLOR: &str = "#53bda8";

/// Growing output buffer with the small append helpers the renderer needs
pub struct SourceWriter {
    buf: String,
}

impl SourceWriter {
    pub fn new() -> Self {
        SourceWriter {
            buf: String::with_capacity(4096),
        }
    }

    pub fn push(&mut self, text: &str) {
        self.buf.push_str(text);
    }

    pub fn space(&mut self) {
        self.buf.push(' ');
    }

    pub fn push_if(&mut self, text: &str, condition: bool) {
        if condition {
            self.buf.push_str(text);
        }
    }

    /// One indentation unit per nesting level
    pub fn indentations(&mut self, level: usize) {
        for _ in 0..level {
            self.buf.push('\t');
        }
    }

    /// Append a multi-line text, indenting every line to the given level
    pub fn push_indented(&mut self, text: &str, level: usize) {
        if text.is_empty() {
            return;
        }

        let normalized = text.replace("\r\n", "\n");
        let mut first = true;
        for line in normalized.split('\n') {
            if !first {
                self.buf.push('\n');
            }
            first = false;
            self.indentations(level);
            self.buf.push_str(line);
        }
    }

    /// Open a rich-text color tag when highlighting is enabled
    pub fn begin_color(&mut self, settings: &TemplateSettings, color: &str) {
        if settings.enable_syntax_highlighting && !color.is_empty() {
            self.buf.push_str("<color=");
            self.buf.push_str(color);
            self.buf.push('>');
        }
    }

    /// Close a rich-text color tag when highlighting is enabled
    pub fn end_color(&mut self, settings: &TemplateSettings, color: &str) {
        if settings.enable_syntax_highlighting && !color.is_empty() {
            self.buf.push_str("</color>");
        }
    }

    pub fn into_string(self) -> String {
        self.buf
    }
}

impl Default for SourceWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Render a document's resolved children into output text
pub fn render_document(template: &TemplateDocument, settings: &TemplateSettings) -> String {
    let mut writer = SourceWriter::new();
    let children = template.serializable_children(settings);
    render_children(&children, &mut writer, 0, settings);
    writer.into_string()
}

/// Render a sibling list, separating consecutive included nodes with a
/// single newline
pub fn render_children(
    children: &[TemplateNode],
    writer: &mut SourceWriter,
    indent: usize,
    settings: &TemplateSettings,
) {
    let mut first = true;

    for child in children {
        if !child.should_use(settings) {
            continue;
        }
        if !first {
            writer.push("\n");
        }
        first = false;
        render_node(child, writer, indent, settings);
    }
}

fn render_node(
    node: &TemplateNode,
    writer: &mut SourceWriter,
    indent: usize,
    settings: &TemplateSettings,
) {
    match &node.kind {
        NodeKind::Namespace => render_namespace(node, writer, indent, settings),
        NodeKind::Type { .. } => render_type(node, writer, indent, settings),
        NodeKind::Function { .. } => render_function(node, writer, indent, settings),
        NodeKind::Property { .. } => render_property(node, writer, indent, settings),
        NodeKind::Accessor { .. } => render_accessor(node, writer, indent, settings),
        NodeKind::Comment { body } | NodeKind::CodeBlock { body } => {
            let color = node.common.text_color.as_deref().unwrap_or("");
            writer.begin_color(settings, color);
            writer.push_indented(body, indent);
            writer.end_color(settings, color);
        }
        NodeKind::IfBuildOption { .. } => {
            render_children(&node.common.children, writer, indent, settings);
        }
        NodeKind::Using { .. } => {
            writer.begin_color(settings, USING_NAMESPACE_COLOR);
            writer.push("using ");
            writer.push(&node.common.id);
            writer.push(";");
            writer.end_color(settings, USING_NAMESPACE_COLOR);
        }
        // declarations and markers produce no output themselves
        NodeKind::UsingPlaceholder | NodeKind::BuildOption { .. } | NodeKind::MetaData { .. } => {}
    }
}

fn render_namespace(
    node: &TemplateNode,
    writer: &mut SourceWriter,
    indent: usize,
    settings: &TemplateSettings,
) {
    let name = node.resolved_id(settings);

    // a namespace whose name resolves to empty renders only its children
    if name.is_empty() {
        render_children(&node.common.children, writer, indent, settings);
        return;
    }

    writer.indentations(indent);
    writer.begin_color(settings, SYSTEM_KEYWORD_COLOR);
    writer.push("namespace ");
    writer.end_color(settings, SYSTEM_KEYWORD_COLOR);
    writer.push(&name);
    writer.push("\n");
    writer.indentations(indent);
    writer.push("{\n");

    render_children(&node.common.children, writer, indent + 1, settings);

    writer.push("\n");
    writer.indentations(indent);
    writer.push("}");
}

fn render_type(
    node: &TemplateNode,
    writer: &mut SourceWriter,
    indent: usize,
    settings: &TemplateSettings,
) {
    let NodeKind::Type {
        kind,
        accessibility,
        is_sealed,
        is_partial,
        is_static,
        is_abstract,
        base,
        interfaces,
    } = &node.kind
    else {
        return;
    };

    writer.indentations(indent);
    writer.begin_color(settings, ACCESSIBILITY_KEYWORD_COLOR);
    writer.push(accessibility);
    writer.end_color(settings, ACCESSIBILITY_KEYWORD_COLOR);
    writer.space();

    writer.begin_color(settings, SYSTEM_KEYWORD_COLOR);
    writer.push(kind.keyword());
    writer.space();
    writer.push_if("static ", *is_static);
    writer.push_if("partial ", *is_partial);
    writer.push_if("abstract ", *is_abstract);
    writer.push_if("sealed ", *is_sealed);
    writer.end_color(settings, SYSTEM_KEYWORD_COLOR);

    writer.begin_color(settings, TYPE_COLOR);
    writer.push(&node.common.id);
    writer.end_color(settings, TYPE_COLOR);

    if let Some(base) = base {
        writer.push(" : ");
        writer.begin_color(settings, TYPE_COLOR);
        writer.push(base);
        writer.end_color(settings, TYPE_COLOR);
    }

    for (index, interface) in interfaces.iter().enumerate() {
        if index == 0 && base.is_none() {
            writer.push(" : ");
        } else {
            writer.push(", ");
        }
        writer.begin_color(settings, TYPE_COLOR);
        writer.push(interface);
        writer.end_color(settings, TYPE_COLOR);
    }

    writer.push("\n");
    writer.indentations(indent);
    writer.push("{\n");

    render_children(&node.common.children, writer, indent + 1, settings);

    writer.push("\n");
    writer.indentations(indent);
    writer.push("}");
}

fn render_function(
    node: &TemplateNode,
    writer: &mut SourceWriter,
    indent: usize,
    settings: &TemplateSettings,
) {
    let NodeKind::Function {
        accessibility,
        virtuality,
        is_static,
        is_sealed,
        return_type,
        arguments,
    } = &node.kind
    else {
        return;
    };

    writer.indentations(indent);
    writer.begin_color(settings, ACCESSIBILITY_KEYWORD_COLOR);
    writer.push(accessibility);
    writer.end_color(settings, ACCESSIBILITY_KEYWORD_COLOR);
    writer.space();

    writer.begin_color(settings, SYSTEM_KEYWORD_COLOR);
    writer.push_if("static ", *is_static);
    writer.push_if("sealed ", *is_sealed);
    if let Some(keyword) = virtuality.keyword() {
        writer.push(keyword);
        writer.space();
    }
    writer.end_color(settings, SYSTEM_KEYWORD_COLOR);

    writer.begin_color(settings, TYPE_COLOR);
    writer.push(return_type);
    writer.end_color(settings, TYPE_COLOR);
    writer.space();
    writer.push(&node.common.id);

    writer.push("(");
    for (index, argument) in arguments.iter().enumerate() {
        if index > 0 {
            writer.push(", ");
        }
        writer.begin_color(settings, TYPE_COLOR);
        writer.push(&argument.arg_type);
        writer.end_color(settings, TYPE_COLOR);
        writer.space();
        writer.push(&argument.name);
    }
    writer.push(")");

    // an abstract function is a bare signature with no body block
    if *virtuality == Virtuality::Abstract {
        writer.push(";");
        return;
    }

    writer.push("\n");
    writer.indentations(indent);
    writer.push("{\n");
    render_children(&node.common.children, writer, indent + 1, settings);
    writer.push("\n");
    writer.indentations(indent);
    writer.push("}");
}

fn render_property(
    node: &TemplateNode,
    writer: &mut SourceWriter,
    indent: usize,
    settings: &TemplateSettings,
) {
    let NodeKind::Property {
        accessibility,
        prop_type,
        default_value,
        is_static,
        virtuality,
        is_event,
    } = &node.kind
    else {
        return;
    };

    writer.indentations(indent);
    writer.begin_color(settings, ACCESSIBILITY_KEYWORD_COLOR);
    writer.push(accessibility);
    writer.push_if(" event", *is_event);
    writer.end_color(settings, ACCESSIBILITY_KEYWORD_COLOR);
    writer.space();

    writer.begin_color(settings, SYSTEM_KEYWORD_COLOR);
    writer.push_if("static ", *is_static);
    if let Some(keyword) = virtuality.keyword() {
        writer.push(keyword);
        writer.space();
    }
    writer.end_color(settings, SYSTEM_KEYWORD_COLOR);

    writer.begin_color(settings, TYPE_COLOR);
    writer.push(prop_type);
    writer.end_color(settings, TYPE_COLOR);
    writer.space();
    writer.push(&node.common.id);

    if !node.common.children.is_empty() {
        writer.push("\n");
        writer.indentations(indent);
        writer.push("{\n");
        render_children(&node.common.children, writer, indent + 1, settings);
        writer.push("\n");
        writer.indentations(indent);
        writer.push("}");
        return;
    }

    if let Some(default) = default_value {
        writer.push(" = ");
        if prop_type.eq_ignore_ascii_case("string") {
            writer.push("\"");
            writer.push(default);
            writer.push("\"");
        } else {
            writer.push(default);
        }
    }
    writer.push(";");
}

fn render_accessor(
    node: &TemplateNode,
    writer: &mut SourceWriter,
    indent: usize,
    settings: &TemplateSettings,
) {
    let NodeKind::Accessor { kind, access } = &node.kind else {
        return;
    };

    // an accessor with no body emits nothing at all
    if node.common.children.is_empty() {
        return;
    }

    writer.indentations(indent);
    writer.begin_color(settings, ACCESSIBILITY_KEYWORD_COLOR);
    if !access.is_empty() {
        writer.push(access);
        writer.space();
    }
    writer.end_color(settings, ACCESSIBILITY_KEYWORD_COLOR);

    writer.begin_color(settings, SYSTEM_KEYWORD_COLOR);
    writer.push(kind.keyword());
    writer.end_color(settings, SYSTEM_KEYWORD_COLOR);

    if let [only] = node.common.children.as_slice() {
        if let NodeKind::CodeBlock { body } = &only.kind {
            if !body.contains('\n') {
                // single single-line body collapses onto one line
                writer.push(" { ");
                render_children(&node.common.children, writer, 0, settings);
                writer.push(" }");
                return;
            }
        }
    }

    writer.push("\n");
    writer.indentations(indent);
    writer.push("{\n");
    render_children(&node.common.children, writer, indent + 1, settings);
    writer.push("\n");
    writer.indentations(indent);
    writer.push("}");
}
