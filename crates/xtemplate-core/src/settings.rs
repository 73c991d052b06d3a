//! Render settings: build options, optional usings, formatting choices
//! and the text-substitution pipeline

use chrono::{Datelike, Local, Timelike};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::document::{BuildOptionDecl, TemplateDocument};

/// Line-ending style of the generated file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineEndings {
    /// Unix and macOS `\n`
    #[default]
    Unix,
    /// Microsoft Windows `\r\n`
    Windows,
}

/// Indentation style of the generated file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TabMode {
    /// Regular tabs `\t`
    #[default]
    Tabs,
    /// Four spaces per indentation unit
    Spaces,
}

/// The typed value a build option carries alongside its text value
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    Text,
    Int(i64),
    Float(f64),
    Bool(bool),
}

/// A named, user-editable value that gates conditional nodes and can be
/// interpolated into the rendered output
#[derive(Debug, Clone, PartialEq)]
pub struct BuildOption {
    /// Replacement identifier; `{id}` in template text interpolates the
    /// current text value
    pub id: String,
    /// Display name
    pub name: String,
    /// Current value as text
    pub text_value: String,
    pub is_required: bool,
    /// Typed view of the text value
    pub typed: TypedValue,
}

impl BuildOption {
    /// Build the runtime option for a declaration, or `None` when the
    /// declared type is unknown
    pub fn from_decl(decl: &BuildOptionDecl) -> Option<BuildOption> {
        let typed = match decl.option_type.to_ascii_lowercase().as_str() {
            "string" | "text" => TypedValue::Text,
            "int" => TypedValue::Int(0),
            "float" | "double" => TypedValue::Float(0.0),
            "bool" | "boolean" => TypedValue::Bool(false),
            _ => return None,
        };

        let mut option = BuildOption {
            id: decl.id.clone(),
            name: decl.name.clone(),
            text_value: String::new(),
            is_required: decl.required,
            typed,
        };
        option.set_text_value(decl.default.clone().unwrap_or_default());
        Some(option)
    }

    /// Update the text value, re-parsing the typed value where it applies.
    /// A text that fails to parse leaves the previous typed value alone.
    pub fn set_text_value<S: Into<String>>(&mut self, text_value: S) {
        self.text_value = text_value.into();

        match &mut self.typed {
            TypedValue::Text => {}
            TypedValue::Int(value) => {
                if let Ok(parsed) = self.text_value.parse() {
                    *value = parsed;
                }
            }
            TypedValue::Float(value) => {
                if let Ok(parsed) = self.text_value.parse() {
                    *value = parsed;
                }
            }
            TypedValue::Bool(value) => {
                if let Ok(parsed) = self.text_value.to_ascii_lowercase().parse() {
                    *value = parsed;
                }
            }
        }
    }

    /// A required option is met once its text value is non-empty
    pub fn is_requirement_met(&self) -> bool {
        !self.text_value.is_empty()
    }
}

/// An optional using directive the user can toggle, or a custom entry the
/// user added themselves
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionalUsing {
    pub id: String,
    pub is_enabled: bool,
    pub is_custom: bool,
}

/// One replace-until-absent substitution; every occurrence of the pattern
/// is replaced by a freshly computed value
struct FreshReplacer {
    pattern: &'static str,
    resolver: Box<dyn Fn() -> String + Send + Sync>,
}

/// Resolved settings for rendering one template
pub struct TemplateSettings {
    /// Emit Unity rich-text color tags around keywords and types
    pub enable_syntax_highlighting: bool,
    pub line_endings: LineEndings,
    pub tab_mode: TabMode,
    pub build_options: Vec<BuildOption>,
    pub optional_usings: Vec<OptionalUsing>,
    replacers: Vec<FreshReplacer>,
}

impl std::fmt::Debug for TemplateSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateSettings")
            .field("enable_syntax_highlighting", &self.enable_syntax_highlighting)
            .field("line_endings", &self.line_endings)
            .field("tab_mode", &self.tab_mode)
            .field("build_options", &self.build_options)
            .field("optional_usings", &self.optional_usings)
            .finish()
    }
}

impl Default for TemplateSettings {
    fn default() -> Self {
        TemplateSettings {
            enable_syntax_highlighting: false,
            line_endings: LineEndings::default(),
            tab_mode: TabMode::default(),
            build_options: Vec::new(),
            optional_usings: Vec::new(),
            replacers: standard_replacers(),
        }
    }
}

impl TemplateSettings {
    /// Settings seeded from a template's declared build options and
    /// optional usings
    pub fn for_template(template: &TemplateDocument) -> Self {
        let mut settings = Self::default();

        for decl in &template.build_options {
            if let Some(option) = BuildOption::from_decl(decl) {
                settings.build_options.push(option);
            }
        }

        for using in &template.usings {
            if using.optional {
                settings.optional_usings.push(OptionalUsing {
                    id: using.id.clone(),
                    is_enabled: using.on_by_default,
                    is_custom: false,
                });
            }
        }

        settings
    }

    /// Current text value of a build option, by replacement id
    pub fn build_option_value(&self, id: &str) -> Option<&str> {
        self.build_options
            .iter()
            .find(|option| option.id == id)
            .map(|option| option.text_value.as_str())
    }

    /// Set the text value of a build option; returns false when no option
    /// with that id exists
    pub fn set_build_option(&mut self, id: &str, text_value: &str) -> bool {
        match self.build_options.iter_mut().find(|option| option.id == id) {
            Some(option) => {
                option.set_text_value(text_value);
                true
            }
            None => false,
        }
    }

    /// Convenience for adding a plain text option (used by callers that
    /// build settings without a template)
    pub fn add_text_option(&mut self, id: &str, text_value: &str) {
        let mut option = BuildOption {
            id: id.to_string(),
            name: id.to_string(),
            text_value: String::new(),
            is_required: false,
            typed: TypedValue::Text,
        };
        option.set_text_value(text_value);
        self.build_options.push(option);
    }

    /// Whether the optional using with the given id is enabled; usings
    /// never declared optional are always on
    pub fn is_optional_using_enabled(&self, id: &str) -> bool {
        self.optional_usings
            .iter()
            .find(|using| using.id == id)
            .map_or(true, |using| using.is_enabled)
    }

    /// Toggle an optional using; returns false when no using with that id
    /// exists
    pub fn set_optional_using(&mut self, id: &str, enabled: bool) -> bool {
        match self.optional_usings.iter_mut().find(|using| using.id == id) {
            Some(using) => {
                using.is_enabled = enabled;
                true
            }
            None => false,
        }
    }

    /// Add a user-supplied using directive not declared by the template
    pub fn add_custom_using(&mut self, id: &str) {
        self.optional_usings.push(OptionalUsing {
            id: id.to_string(),
            is_enabled: true,
            is_custom: true,
        });
    }

    /// Ids of the required build options whose requirement is not met
    pub fn unmet_required_options(&self) -> Vec<&str> {
        self.build_options
            .iter()
            .filter(|option| option.is_required && !option.is_requirement_met())
            .map(|option| option.id.as_str())
            .collect()
    }

    /// Run the substitution pipeline over a piece of text.
    ///
    /// Build-option interpolation runs first: `{id}` becomes the option's
    /// current text value, unresolved ids stay verbatim. The fresh-value
    /// replacers then run in registration order; each occurrence of a
    /// pattern is replaced by a freshly computed value, so two occurrences
    /// of the same pattern yield two different values.
    pub fn apply_replacements_to_text(&self, text: &str) -> String {
        let mut result = text.to_string();

        for option in &self.build_options {
            let token = format!("{{{}}}", option.id);
            result = result.replace(&token, &option.text_value);
        }

        for replacer in &self.replacers {
            while let Some(index) = result.find(replacer.pattern) {
                let fresh = (replacer.resolver)();
                result.replace_range(index..index + replacer.pattern.len(), &fresh);
            }
        }

        result
    }
}

/// The standard placeholder substitutions, in the order they run
fn standard_replacers() -> Vec<FreshReplacer> {
    fn fresh(
        pattern: &'static str,
        resolver: impl Fn() -> String + Send + Sync + 'static,
    ) -> FreshReplacer {
        FreshReplacer {
            pattern,
            resolver: Box::new(resolver),
        }
    }

    vec![
        fresh("{Random:System.Guid}", || Uuid::new_v4().to_string()),
        fresh("{Random:System.Int}", || {
            rand::random::<i32>().to_string()
        }),
        fresh("{currentYear}", || Local::now().year().to_string()),
        fresh("{currentMonth}", || Local::now().month().to_string()),
        fresh("{currentDay}", || Local::now().day().to_string()),
        fresh("{currentHour}", || Local::now().hour().to_string()),
        fresh("{currentMinute}", || Local::now().minute().to_string()),
        fresh("{currentSecond}", || Local::now().second().to_string()),
    ]
}
