//! End-to-end build pipeline: render a template, normalize line endings
//! and indentation, then run the text substitutions

use std::path::Path;

use walkdir::WalkDir;

use crate::document::TemplateDocument;
use crate::error::{Result, TemplateError};
use crate::render;
use crate::settings::{LineEndings, TabMode, TemplateSettings};

pub const UNIX_LINE_ENDINGS: &str = "\n";
pub const WINDOWS_LINE_ENDINGS: &str = "\r\n";
/// File extension of template files, without the leading dot
pub const TEMPLATE_EXTENSION: &str = "xtemplate";

/// Render a template to its final output text.
///
/// Fails when the template is malformed (its declared format version is
/// outside the supported range). The pipeline is render, then line-ending
/// normalization, then tab normalization, then placeholder substitution.
pub fn build_code_from_template(
    template: &TemplateDocument,
    settings: &TemplateSettings,
) -> Result<String> {
    if template.is_malformed {
        return Err(TemplateError::malformed(template.format));
    }

    let rendered = render::render_document(template, settings);
    let rendered = normalize_line_endings(&rendered, settings.line_endings);
    let rendered = normalize_tabs(&rendered, settings.tab_mode);
    Ok(settings.apply_replacements_to_text(&rendered))
}

/// Rewrite all line endings to the requested style. Collapses `\r\n` to
/// `\n` first, so the pass is idempotent and mixed input comes out
/// uniform.
pub fn normalize_line_endings(text: &str, line_endings: LineEndings) -> String {
    let collapsed = text.replace(WINDOWS_LINE_ENDINGS, UNIX_LINE_ENDINGS);

    match line_endings {
        LineEndings::Unix => collapsed,
        LineEndings::Windows => collapsed.replace(UNIX_LINE_ENDINGS, WINDOWS_LINE_ENDINGS),
    }
}

/// Rewrite indentation to the requested style: four spaces per tab
pub fn normalize_tabs(text: &str, tab_mode: TabMode) -> String {
    match tab_mode {
        TabMode::Tabs => text.replace("    ", "\t"),
        TabMode::Spaces => text.replace('\t', "    "),
    }
}

/// Find and parse every template file under a directory tree.
///
/// Files that fail to load or parse are logged and skipped. The result is
/// sorted by priority, highest first, then by id.
pub fn find_templates_in_project<P: AsRef<Path>>(root: P) -> Vec<TemplateDocument> {
    let mut templates = Vec::new();

    for entry in WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path
            .extension()
            .map_or(true, |ext| !ext.eq_ignore_ascii_case(TEMPLATE_EXTENSION))
        {
            continue;
        }

        match TemplateDocument::from_file(path) {
            Ok(template) => templates.push(template),
            Err(err) => {
                log::warn!("skipping template {}: {}", path.display(), err);
            }
        }
    }

    templates.sort_by(|a, b| b.priority.cmp(&a.priority).then_with(|| a.id.cmp(&b.id)));
    templates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_template;

    #[test]
    fn test_line_ending_normalization_is_idempotent() {
        let mixed = "a\r\nb\nc";
        assert_eq!(normalize_line_endings(mixed, LineEndings::Unix), "a\nb\nc");
        assert_eq!(
            normalize_line_endings(mixed, LineEndings::Windows),
            "a\r\nb\r\nc"
        );

        let once = normalize_line_endings(mixed, LineEndings::Windows);
        assert_eq!(normalize_line_endings(&once, LineEndings::Windows), once);
    }

    #[test]
    fn test_tab_normalization() {
        assert_eq!(normalize_tabs("    x", TabMode::Tabs), "\tx");
        assert_eq!(normalize_tabs("\tx", TabMode::Spaces), "    x");
    }

    #[test]
    fn test_build_rejects_malformed_template() {
        let template =
            parse_template(r#"<template id="T" format="9.9"><class id="C"/></template>"#).unwrap();
        assert!(template.is_malformed);

        let settings = TemplateSettings::default();
        let result = build_code_from_template(&template, &settings);
        assert!(matches!(
            result,
            Err(TemplateError::MalformedDocument { .. })
        ));
    }

    #[test]
    fn test_build_applies_replacements_after_rendering() {
        let template = parse_template(
            r#"<template id="T" format="1.0"><class id="{classname}"><codeblock>// made {currentYear}</codeblock></class></template>"#,
        )
        .unwrap();

        let mut settings = TemplateSettings::default();
        settings.add_text_option("classname", "Player");

        let output = build_code_from_template(&template, &settings).unwrap();
        assert!(output.starts_with("public class Player\n{"));
        assert!(!output.contains("{currentYear}"));
    }

    #[test]
    fn test_build_honors_formatting_settings() {
        let template = parse_template(
            r#"<template id="T" format="1.0"><class id="C"><codeblock>body();</codeblock></class></template>"#,
        )
        .unwrap();

        let mut settings = TemplateSettings::default();
        settings.line_endings = LineEndings::Windows;
        settings.tab_mode = TabMode::Spaces;

        let output = build_code_from_template(&template, &settings).unwrap();
        assert_eq!(output, "public class C\r\n{\r\n    body();\r\n}");
    }

    #[test]
    fn test_find_templates_sorts_by_priority_then_id() {
        let dir = tempfile::tempdir().unwrap();
        let write = |name: &str, body: &str| {
            std::fs::write(dir.path().join(name), body).unwrap();
        };

        write(
            "b.xtemplate",
            r#"<template id="Beta" format="1.0" priority="1"/>"#,
        );
        write(
            "a.xtemplate",
            r#"<template id="Alpha" format="1.0" priority="1"/>"#,
        );
        write(
            "c.xtemplate",
            r#"<template id="Gamma" format="1.0" priority="5"/>"#,
        );
        write("notes.txt", "not a template");
        write("broken.xtemplate", "<not closed");

        let templates = find_templates_in_project(dir.path());
        let ids: Vec<&str> = templates.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["Gamma", "Alpha", "Beta"]);
    }

    #[test]
    fn test_unsupported_format_still_listed() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("old.xtemplate"),
            r#"<template id="Old" format="0.9"/>"#,
        )
        .unwrap();

        let templates = find_templates_in_project(dir.path());
        assert_eq!(templates.len(), 1);
        assert!(templates[0].is_malformed);
    }
}
