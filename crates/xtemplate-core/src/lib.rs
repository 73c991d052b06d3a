//! XML-driven source-file template engine, plus a regex scanner for asset
//! references.
//!
//! A template is an XML document describing the shape of a source file:
//! namespaces, types, members, raw code blocks, conditional sections and
//! build-option declarations. Rendering resolves the user's settings
//! against the tree (pruning conditional nodes, injecting using
//! directives), walks it depth-first into text, normalizes line endings
//! and indentation, and finally substitutes placeholders.

pub mod builder;
pub mod document;
pub mod error;
pub mod node;
pub mod parse;
pub mod persist;
pub mod query;
pub mod registry;
pub mod render;
pub mod settings;
pub mod xml;

pub use builder::{
    build_code_from_template, find_templates_in_project, normalize_line_endings, normalize_tabs,
    TEMPLATE_EXTENSION,
};
pub use document::{FormatVersion, TemplateDocument};
pub use error::{Result, TemplateError};
pub use node::{NodeKind, TemplateNode};
pub use parse::parse_template;
pub use query::{
    pattern_for_identities, pattern_for_identity, AssetIdentity, CancellationToken, DirFileSystem,
    ProjectFileSystem, QuerySettings, ReferenceQuery,
};
pub use render::render_document;
pub use settings::{BuildOption, LineEndings, OptionalUsing, TabMode, TemplateSettings};
