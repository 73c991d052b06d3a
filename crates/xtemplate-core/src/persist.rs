//! Saving and restoring user choices between sessions
//!
//! Values live in a flat string key/value store. Formatting choices are
//! global per project; build-option values and optional-using toggles are
//! keyed per template and stored as JSON payloads.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::document::TemplateDocument;
use crate::error::Result;
use crate::query::QuerySettings;
use crate::settings::{LineEndings, OptionalUsing, TabMode, TemplateSettings};

/// Flat string key/value storage for user preferences
pub trait SettingsStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str);
}

/// In-memory store, for tests and one-shot runs
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl SettingsStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
    }
}

/// Store backed by a JSON file. Writes go straight to disk; a missing or
/// unreadable file behaves as an empty store.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    values: HashMap<String, String>,
}

impl JsonFileStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let values = std::fs::read_to_string(&path)
            .ok()
            .and_then(|text| serde_json::from_str(&text).ok())
            .unwrap_or_default();
        JsonFileStore { path, values }
    }

    fn flush(&self) -> Result<()> {
        let text = serde_json::to_string_pretty(&self.values)?;
        std::fs::write(&self.path, text)?;
        Ok(())
    }
}

impl SettingsStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
        if let Err(err) = self.flush() {
            log::warn!("failed to persist settings to {}: {}", self.path.display(), err);
        }
    }
}

const KEY_PREFIX: &str = "com.xtemplate.builder";
const QUERY_SETTINGS_KEY: &str = "com.xtemplate.query.settings";

fn project_key(project: &str, setting: &str) -> String {
    format!("{}.{}.{}", KEY_PREFIX, project, setting)
}

fn template_key(project: &str, template_id: &str, setting: &str) -> String {
    format!("{}.{}.template.{}.{}", KEY_PREFIX, project, template_id, setting)
}

/// The persisted slice of one build option
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SavedBuildOption {
    id: String,
    text_value: String,
}

/// Save the global formatting choices for a project
pub fn save_formatting<S: SettingsStore>(
    store: &mut S,
    project: &str,
    settings: &TemplateSettings,
) {
    let line_endings = match settings.line_endings {
        LineEndings::Unix => "unix",
        LineEndings::Windows => "windows",
    };
    let tab_mode = match settings.tab_mode {
        TabMode::Tabs => "tabs",
        TabMode::Spaces => "spaces",
    };

    store.set(&project_key(project, "lineEndings"), line_endings);
    store.set(&project_key(project, "tabMode"), tab_mode);
    store.set(
        &project_key(project, "syntaxHighlighting"),
        if settings.enable_syntax_highlighting {
            "true"
        } else {
            "false"
        },
    );
}

/// Restore the global formatting choices for a project. Keys never saved
/// leave the current value alone.
pub fn restore_formatting<S: SettingsStore>(
    store: &S,
    project: &str,
    settings: &mut TemplateSettings,
) {
    match store.get(&project_key(project, "lineEndings")).as_deref() {
        Some("unix") => settings.line_endings = LineEndings::Unix,
        Some("windows") => settings.line_endings = LineEndings::Windows,
        _ => {}
    }
    match store.get(&project_key(project, "tabMode")).as_deref() {
        Some("tabs") => settings.tab_mode = TabMode::Tabs,
        Some("spaces") => settings.tab_mode = TabMode::Spaces,
        _ => {}
    }
    if let Some(value) = store.get(&project_key(project, "syntaxHighlighting")) {
        settings.enable_syntax_highlighting = value == "true";
    }
}

/// Save the per-template choices: build-option values and optional-using
/// toggles
pub fn save_template_choices<S: SettingsStore>(
    store: &mut S,
    project: &str,
    template: &TemplateDocument,
    settings: &TemplateSettings,
) -> Result<()> {
    let options: Vec<SavedBuildOption> = settings
        .build_options
        .iter()
        .map(|option| SavedBuildOption {
            id: option.id.clone(),
            text_value: option.text_value.clone(),
        })
        .collect();
    store.set(
        &template_key(project, &template.id, "buildOptions"),
        &serde_json::to_string(&options)?,
    );

    store.set(
        &template_key(project, &template.id, "usings"),
        &serde_json::to_string(&settings.optional_usings)?,
    );
    Ok(())
}

/// Restore per-template choices into settings freshly seeded from the
/// template.
///
/// Saved build-option values are applied only to options the template
/// still declares. Saved optional usings update the matching declared
/// entries; saved custom entries are appended. A corrupt payload is
/// ignored.
pub fn restore_template_choices<S: SettingsStore>(
    store: &S,
    project: &str,
    template: &TemplateDocument,
    settings: &mut TemplateSettings,
) {
    if let Some(payload) = store.get(&template_key(project, &template.id, "buildOptions")) {
        match serde_json::from_str::<Vec<SavedBuildOption>>(&payload) {
            Ok(saved) => {
                for entry in saved {
                    settings.set_build_option(&entry.id, &entry.text_value);
                }
            }
            Err(err) => log::warn!("ignoring corrupt build-option payload: {}", err),
        }
    }

    if let Some(payload) = store.get(&template_key(project, &template.id, "usings")) {
        match serde_json::from_str::<Vec<OptionalUsing>>(&payload) {
            Ok(saved) => {
                for entry in saved {
                    if !settings.set_optional_using(&entry.id, entry.is_enabled) && entry.is_custom
                    {
                        settings.optional_usings.push(entry);
                    }
                }
            }
            Err(err) => log::warn!("ignoring corrupt usings payload: {}", err),
        }
    }
}

/// Save the reference-query settings
pub fn save_query_settings<S: SettingsStore>(store: &mut S, settings: &QuerySettings) -> Result<()> {
    store.set(QUERY_SETTINGS_KEY, &serde_json::to_string(settings)?);
    Ok(())
}

/// Restore the reference-query settings, falling back to defaults when
/// nothing was saved or the payload is corrupt
pub fn restore_query_settings<S: SettingsStore>(store: &S) -> QuerySettings {
    store
        .get(QUERY_SETTINGS_KEY)
        .and_then(|payload| serde_json::from_str(&payload).ok())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_template;

    fn sample_template() -> TemplateDocument {
        parse_template(
            r#"<template id="Sample" format="1.0"><build-option name="Namespace" type="string"/><using id="System.Linq" optional="true" default="true"/></template>"#,
        )
        .unwrap()
    }

    #[test]
    fn test_formatting_round_trip() {
        let mut store = MemoryStore::default();
        let mut settings = TemplateSettings::default();
        settings.line_endings = LineEndings::Windows;
        settings.tab_mode = TabMode::Spaces;
        settings.enable_syntax_highlighting = true;

        save_formatting(&mut store, "proj", &settings);

        let mut restored = TemplateSettings::default();
        restore_formatting(&store, "proj", &mut restored);
        assert_eq!(restored.line_endings, LineEndings::Windows);
        assert_eq!(restored.tab_mode, TabMode::Spaces);
        assert!(restored.enable_syntax_highlighting);
    }

    #[test]
    fn test_restore_without_saved_values_changes_nothing() {
        let store = MemoryStore::default();
        let mut settings = TemplateSettings::default();
        restore_formatting(&store, "proj", &mut settings);
        assert_eq!(settings.line_endings, LineEndings::Unix);
        assert_eq!(settings.tab_mode, TabMode::Tabs);
    }

    #[test]
    fn test_template_choices_round_trip() {
        let template = sample_template();
        let mut store = MemoryStore::default();

        let mut settings = TemplateSettings::for_template(&template);
        settings.set_build_option("namespace", "Game.Core");
        settings.set_optional_using("System.Linq", false);
        settings.add_custom_using("Custom.Lib");
        save_template_choices(&mut store, "proj", &template, &settings).unwrap();

        let mut restored = TemplateSettings::for_template(&template);
        restore_template_choices(&store, "proj", &template, &mut restored);
        assert_eq!(restored.build_option_value("namespace"), Some("Game.Core"));
        assert!(!restored.is_optional_using_enabled("System.Linq"));
        assert!(restored.is_optional_using_enabled("Custom.Lib"));
        assert!(restored
            .optional_usings
            .iter()
            .any(|u| u.id == "Custom.Lib" && u.is_custom));
    }

    #[test]
    fn test_saved_option_for_removed_declaration_is_ignored() {
        let template = sample_template();
        let mut store = MemoryStore::default();
        store.set(
            &template_key("proj", "Sample", "buildOptions"),
            r#"[{"id":"gone","text_value":"x"}]"#,
        );

        let mut settings = TemplateSettings::for_template(&template);
        restore_template_choices(&store, "proj", &template, &mut settings);
        assert!(settings.build_option_value("gone").is_none());
    }

    #[test]
    fn test_corrupt_payload_is_ignored() {
        let template = sample_template();
        let mut store = MemoryStore::default();
        store.set(&template_key("proj", "Sample", "buildOptions"), "not json");

        let mut settings = TemplateSettings::for_template(&template);
        restore_template_choices(&store, "proj", &template, &mut settings);
        assert_eq!(settings.build_option_value("namespace"), Some(""));
    }

    #[test]
    fn test_query_settings_round_trip() {
        let mut store = MemoryStore::default();
        let mut settings = QuerySettings::default();
        settings.root_folder = "Packages".to_string();
        settings.allow_replace = false;

        save_query_settings(&mut store, &settings).unwrap();
        let restored = restore_query_settings(&store);
        assert_eq!(restored, settings);
    }

    #[test]
    fn test_json_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");

        let mut store = JsonFileStore::open(&path);
        store.set("a", "1");
        store.set("b", "2");

        let reopened = JsonFileStore::open(&path);
        assert_eq!(reopened.get("a").as_deref(), Some("1"));
        assert_eq!(reopened.get("b").as_deref(), Some("2"));
        assert_eq!(reopened.get("missing"), None);
    }

    #[test]
    fn test_json_file_store_tolerates_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        std::fs::write(&path, "{{{").unwrap();

        let store = JsonFileStore::open(&path);
        assert_eq!(store.get("anything"), None);
    }
}
