//! The parsed template document and its format-version gate

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;

use crate::error::Result;
use crate::node::{NodeKind, TemplateNode};
use crate::parse;
use crate::settings::TemplateSettings;

/// Metadata key for the generated file-name prefix
pub const METADATA_FILENAME_PREFIX: &str = "filenamePrefix";
/// Metadata key for the generated file-name suffix
pub const METADATA_FILENAME_SUFFIX: &str = "filenameSuffix";

/// Oldest template format this engine can render
pub const MIN_SUPPORTED_FORMAT: FormatVersion = FormatVersion([1, 0, 0, 0]);
/// Newest template format this engine can render
pub const MAX_SUPPORTED_FORMAT: FormatVersion = FormatVersion([1, 0, 0, 0]);

/// A four-component dotted version, as declared by the `format` attribute.
/// Missing components are zero, so `"1.0"` equals `1.0.0.0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct FormatVersion(pub [u32; 4]);

#[derive(Debug, Error)]
#[error("invalid format version")]
pub struct ParseVersionError;

impl FromStr for FormatVersion {
    type Err = ParseVersionError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut components = [0u32; 4];
        let mut count = 0;

        for part in s.split('.') {
            if count >= 4 {
                return Err(ParseVersionError);
            }
            components[count] = part.trim().parse().map_err(|_| ParseVersionError)?;
            count += 1;
        }

        if count == 0 {
            return Err(ParseVersionError);
        }
        Ok(FormatVersion(components))
    }
}

impl fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d] = self.0;
        write!(f, "{}.{}.{}.{}", a, b, c, d)
    }
}

/// A using directive declared at the template root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsingDecl {
    pub id: String,
    /// For optional usings, whether the toggle starts enabled
    pub on_by_default: bool,
    pub optional: bool,
}

/// A build option declared at the template root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptionDecl {
    /// Replacement id; defaults to the lowercased name when the template
    /// does not declare one
    pub id: String,
    pub name: String,
    /// Declared type as written (`string`, `int`, `float`, `bool`, ...)
    pub option_type: String,
    pub default: Option<String>,
    pub required: bool,
}

/// The parsed representation of one XML template file
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateDocument {
    /// Template identifier; also the fallback base name of generated files
    pub id: String,
    pub text_color: Option<String>,
    /// Declared format version
    pub format: FormatVersion,
    /// Sort/grouping key for template listings
    pub priority: i32,
    /// True when the declared format is unsupported; a malformed document
    /// participates in listings but cannot be rendered
    pub is_malformed: bool,
    /// Using directives, extracted out of the child list
    pub usings: Vec<UsingDecl>,
    /// Build-option declarations, extracted out of the child list
    pub build_options: Vec<BuildOptionDecl>,
    /// Ordered child nodes; the first extracted using is replaced by a
    /// single placeholder marking the injection point
    pub children: Vec<TemplateNode>,
    /// File this template was loaded from, if any
    pub source_path: Option<PathBuf>,
}

impl TemplateDocument {
    /// Whether a declared format version falls within the supported range
    /// (both ends inclusive)
    pub fn is_format_supported(version: FormatVersion) -> bool {
        version >= MIN_SUPPORTED_FORMAT && version <= MAX_SUPPORTED_FORMAT
    }

    /// Load and parse a template file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<TemplateDocument> {
        let source = std::fs::read_to_string(path.as_ref())?;
        let mut template = parse::parse_template(&source)?;
        template.source_path = Some(path.as_ref().to_path_buf());
        Ok(template)
    }

    /// Look up a metadata entry by key, case-insensitively. The last
    /// matching entry wins.
    pub fn metadata(&self, key: &str) -> Option<&str> {
        let mut result = None;

        for child in &self.children {
            if let NodeKind::MetaData {
                key: entry_key,
                value,
            } = &child.kind
            {
                if entry_key.eq_ignore_ascii_case(key) {
                    result = Some(value.as_str());
                }
            }
        }

        result
    }

    /// Suggested name of the generated file: prefix metadata, then the
    /// `filename` build option (falling back to the template id), then
    /// suffix metadata, then the `.cs` extension.
    pub fn suggested_file_name(&self, settings: &TemplateSettings) -> String {
        let mut result = String::new();
        result.push_str(self.metadata(METADATA_FILENAME_PREFIX).unwrap_or(""));
        result.push_str(
            settings
                .build_option_value("filename")
                .unwrap_or(self.id.as_str()),
        );
        result.push_str(self.metadata(METADATA_FILENAME_SUFFIX).unwrap_or(""));
        result.push_str(".cs");
        result
    }

    /// The children to render, with the using placeholder resolved.
    ///
    /// Injection happens exactly once, at the placeholder's original
    /// position: template-declared usings first (skipping disabled
    /// optional ones), then enabled custom usings, deduplicated against
    /// the template-declared entries.
    pub fn serializable_children(&self, settings: &TemplateSettings) -> Vec<TemplateNode> {
        let mut result = Vec::with_capacity(self.children.len());

        for child in &self.children {
            if matches!(child.kind, NodeKind::UsingPlaceholder) {
                result.extend(self.using_children(settings));
                continue;
            }

            if child.should_use(settings) {
                result.push(child.clone());
            }
        }

        result
    }

    fn using_children(&self, settings: &TemplateSettings) -> Vec<TemplateNode> {
        let mut result = Vec::new();
        let mut emitted: Vec<&str> = Vec::new();

        for using in &self.usings {
            if using.optional && !settings.is_optional_using_enabled(&using.id) {
                continue;
            }
            emitted.push(using.id.as_str());
            result.push(using_node(&using.id));
        }

        for custom in &settings.optional_usings {
            if custom.is_custom
                && custom.is_enabled
                && !custom.id.is_empty()
                && !emitted.contains(&custom.id.as_str())
            {
                result.push(using_node(&custom.id));
            }
        }

        result
    }
}

fn using_node(id: &str) -> TemplateNode {
    TemplateNode::new(NodeKind::Using {
        on_by_default: true,
        optional: false,
    })
    .with_id(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_version_parsing() {
        let version: FormatVersion = "1.0".parse().unwrap();
        assert_eq!(version, FormatVersion([1, 0, 0, 0]));

        let version: FormatVersion = "1.2.3.4".parse().unwrap();
        assert_eq!(version, FormatVersion([1, 2, 3, 4]));

        assert!("".parse::<FormatVersion>().is_err());
        assert!("1.2.3.4.5".parse::<FormatVersion>().is_err());
        assert!("one".parse::<FormatVersion>().is_err());
    }

    #[test]
    fn test_format_version_ordering() {
        let low: FormatVersion = "0.9".parse().unwrap();
        let current: FormatVersion = "1.0.0.0".parse().unwrap();
        let high: FormatVersion = "1.0.0.1".parse().unwrap();

        assert!(low < current);
        assert!(current < high);
        assert!(TemplateDocument::is_format_supported(current));
        assert!(!TemplateDocument::is_format_supported(low));
        assert!(!TemplateDocument::is_format_supported(high));
    }

    #[test]
    fn test_format_version_display() {
        let version: FormatVersion = "1.0".parse().unwrap();
        assert_eq!(version.to_string(), "1.0.0.0");
    }
}
