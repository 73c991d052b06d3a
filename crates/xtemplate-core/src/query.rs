//! Regex scan over project text assets for references to an asset, with
//! optional in-place replacement

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use regex::Regex;
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::error::Result;

/// Where and what the scanner searches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuerySettings {
    /// Directory the scan starts from
    pub root_folder: String,
    /// File extensions considered text assets, with the leading dot
    pub extensions: Vec<String>,
    /// Whether replacement is permitted for this query
    pub allow_replace: bool,
}

impl Default for QuerySettings {
    fn default() -> Self {
        QuerySettings {
            root_folder: "Assets".to_string(),
            extensions: vec![
                ".prefab".to_string(),
                ".unity".to_string(),
                ".asset".to_string(),
                ".mat".to_string(),
                ".spriteatlas".to_string(),
            ],
            allow_replace: true,
        }
    }
}

impl QuerySettings {
    fn matches_extension(&self, path: &Path) -> bool {
        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name,
            None => return false,
        };
        self.extensions
            .iter()
            .any(|ext| name.to_ascii_lowercase().ends_with(&ext.to_ascii_lowercase()))
    }
}

/// Cooperative cancellation flag shared between a scan and its caller
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// File access the query runs against. The indirection keeps scans
/// testable without a real project tree.
pub trait ProjectFileSystem {
    /// All files under the root that the query settings select
    fn find_files(&self, settings: &QuerySettings) -> Vec<PathBuf>;
    fn read_text(&self, path: &Path) -> std::io::Result<String>;
    fn write_text(&self, path: &Path, contents: &str) -> std::io::Result<()>;
    /// Called after files changed on disk, so the host can re-import them
    fn refresh(&self) {}
}

/// Directory-backed file system
#[derive(Debug, Default)]
pub struct DirFileSystem;

impl ProjectFileSystem for DirFileSystem {
    fn find_files(&self, settings: &QuerySettings) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = WalkDir::new(&settings.root_folder)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| settings.matches_extension(path))
            .collect();
        files.sort();
        files
    }

    fn read_text(&self, path: &Path) -> std::io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn write_text(&self, path: &Path, contents: &str) -> std::io::Result<()> {
        std::fs::write(path, contents)
    }
}

/// Identity of the asset being searched for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetIdentity {
    /// A whole asset file, identified by its guid
    Main { guid: String },
    /// An object inside an asset file, identified by file id and guid
    Sub { file_id: i64, guid: String },
}

/// The search pattern for one asset identity, as it appears in serialized
/// asset text
pub fn pattern_for_identity(identity: &AssetIdentity) -> String {
    match identity {
        AssetIdentity::Main { guid } => format!("guid: {}", guid),
        AssetIdentity::Sub { file_id, guid } => {
            format!("fileID: {}, guid: {}", file_id, guid)
        }
    }
}

/// An alternation pattern matching any of the given identities
pub fn pattern_for_identities(identities: &[AssetIdentity]) -> String {
    let mut pattern = String::new();
    for (index, identity) in identities.iter().enumerate() {
        if index > 0 {
            pattern.push('|');
        }
        pattern.push('(');
        pattern.push_str(&pattern_for_identity(identity));
        pattern.push(')');
    }
    pattern
}

/// A reference search and its accumulated results
#[derive(Debug)]
pub struct ReferenceQuery {
    pub settings: QuerySettings,
    /// Paths of files whose text matched the last search
    pub referencing_paths: Vec<PathBuf>,
}

impl ReferenceQuery {
    pub fn new(settings: QuerySettings) -> Self {
        ReferenceQuery {
            settings,
            referencing_paths: Vec::new(),
        }
    }

    /// Scan the project for files matching the pattern, accumulating their
    /// paths. A cancelled token stops the scan between files; results
    /// gathered so far are kept.
    pub fn find_references<F: ProjectFileSystem>(
        &mut self,
        fs: &F,
        pattern: &str,
        token: &CancellationToken,
    ) -> Result<()> {
        let regex = Regex::new(pattern)?;
        self.referencing_paths.clear();

        let files = fs.find_files(&self.settings);
        let total = files.len();
        log::info!("searching {} files for references", total);

        for path in files {
            if token.is_cancelled() {
                log::info!(
                    "search cancelled after {} matches",
                    self.referencing_paths.len()
                );
                break;
            }

            let contents = fs.read_text(&path)?;
            if regex.is_match(&contents) {
                log::debug!("reference found in {}", path.display());
                self.referencing_paths.push(path);
            }
        }

        Ok(())
    }

    /// Rewrite every match of the pattern in the previously found files.
    ///
    /// A cancelled token stops the rewrite between files; files already
    /// rewritten stay rewritten. The result set is cleared and the file
    /// system refreshed afterwards whether the rewrite finished, failed
    /// or was cancelled, so a later search never sees stale results.
    pub fn replace_references<F: ProjectFileSystem>(
        &mut self,
        fs: &F,
        pattern: &str,
        replacement: &str,
        token: &CancellationToken,
    ) -> Result<usize> {
        let result = self.replace_in_files(fs, pattern, replacement, token);
        self.referencing_paths.clear();
        fs.refresh();
        result
    }

    fn replace_in_files<F: ProjectFileSystem>(
        &self,
        fs: &F,
        pattern: &str,
        replacement: &str,
        token: &CancellationToken,
    ) -> Result<usize> {
        let regex = Regex::new(pattern)?;
        let mut rewritten = 0;

        for path in &self.referencing_paths {
            if token.is_cancelled() {
                log::info!("replace cancelled after {} rewritten files", rewritten);
                break;
            }

            let contents = fs.read_text(path)?;
            let replaced = regex.replace_all(&contents, replacement);
            if replaced != contents {
                fs.write_text(path, &replaced)?;
                rewritten += 1;
                log::info!("rewrote references in {}", path.display());
            }
        }

        Ok(rewritten)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::BTreeMap;

    /// In-memory file system for scan tests
    #[derive(Default)]
    struct MemFileSystem {
        files: RefCell<BTreeMap<PathBuf, String>>,
        refreshed: RefCell<bool>,
    }

    impl MemFileSystem {
        fn with_file(self, path: &str, contents: &str) -> Self {
            self.files
                .borrow_mut()
                .insert(PathBuf::from(path), contents.to_string());
            self
        }
    }

    impl ProjectFileSystem for MemFileSystem {
        fn find_files(&self, settings: &QuerySettings) -> Vec<PathBuf> {
            self.files
                .borrow()
                .keys()
                .filter(|path| settings.matches_extension(path))
                .cloned()
                .collect()
        }

        fn read_text(&self, path: &Path) -> std::io::Result<String> {
            self.files
                .borrow()
                .get(path)
                .cloned()
                .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, "missing"))
        }

        fn write_text(&self, path: &Path, contents: &str) -> std::io::Result<()> {
            self.files
                .borrow_mut()
                .insert(path.to_path_buf(), contents.to_string());
            Ok(())
        }

        fn refresh(&self) {
            *self.refreshed.borrow_mut() = true;
        }
    }

    fn guid_identity(guid: &str) -> AssetIdentity {
        AssetIdentity::Main {
            guid: guid.to_string(),
        }
    }

    #[test]
    fn test_pattern_builders() {
        assert_eq!(pattern_for_identity(&guid_identity("abc123")), "guid: abc123");
        assert_eq!(
            pattern_for_identity(&AssetIdentity::Sub {
                file_id: 42,
                guid: "abc123".to_string()
            }),
            "fileID: 42, guid: abc123"
        );
        assert_eq!(
            pattern_for_identities(&[guid_identity("a"), guid_identity("b")]),
            "(guid: a)|(guid: b)"
        );
    }

    #[test]
    fn test_find_references_accumulates_matches() {
        let fs = MemFileSystem::default()
            .with_file("Assets/a.prefab", "m_Script: {fileID: 1, guid: abc}")
            .with_file("Assets/b.prefab", "nothing here")
            .with_file("Assets/c.unity", "guid: abc again")
            .with_file("Assets/readme.txt", "guid: abc but wrong extension");

        let mut query = ReferenceQuery::new(QuerySettings::default());
        query
            .find_references(&fs, "guid: abc", &CancellationToken::new())
            .unwrap();

        assert_eq!(
            query.referencing_paths,
            vec![PathBuf::from("Assets/a.prefab"), PathBuf::from("Assets/c.unity")]
        );
    }

    #[test]
    fn test_invalid_pattern_is_an_error() {
        let fs = MemFileSystem::default();
        let mut query = ReferenceQuery::new(QuerySettings::default());
        let result = query.find_references(&fs, "(unclosed", &CancellationToken::new());
        assert!(matches!(
            result,
            Err(crate::error::TemplateError::InvalidPattern(_))
        ));
    }

    #[test]
    fn test_cancellation_keeps_partial_results() {
        let fs = MemFileSystem::default()
            .with_file("Assets/a.prefab", "guid: abc")
            .with_file("Assets/b.prefab", "guid: abc");

        let token = CancellationToken::new();
        token.cancel();

        let mut query = ReferenceQuery::new(QuerySettings::default());
        query.find_references(&fs, "guid: abc", &token).unwrap();

        // cancelled before the first file; no results, no error
        assert!(query.referencing_paths.is_empty());
    }

    #[test]
    fn test_replace_rewrites_and_clears_results() {
        let fs = MemFileSystem::default()
            .with_file("Assets/a.prefab", "guid: old, guid: old")
            .with_file("Assets/b.prefab", "guid: other");

        let mut query = ReferenceQuery::new(QuerySettings::default());
        query
            .find_references(&fs, "guid: old", &CancellationToken::new())
            .unwrap();
        assert_eq!(query.referencing_paths.len(), 1);

        let rewritten = query
            .replace_references(&fs, "guid: old", "guid: new", &CancellationToken::new())
            .unwrap();
        assert_eq!(rewritten, 1);
        assert_eq!(
            fs.read_text(Path::new("Assets/a.prefab")).unwrap(),
            "guid: new, guid: new"
        );
        assert!(query.referencing_paths.is_empty());
        assert!(*fs.refreshed.borrow());
    }

    #[test]
    fn test_replace_clears_results_even_on_failure() {
        let fs = MemFileSystem::default();
        let mut query = ReferenceQuery::new(QuerySettings::default());
        query
            .referencing_paths
            .push(PathBuf::from("Assets/missing.prefab"));

        let result = query.replace_references(&fs, "guid: x", "guid: y", &CancellationToken::new());
        assert!(result.is_err());
        assert!(query.referencing_paths.is_empty());
        assert!(*fs.refreshed.borrow());
    }

    #[test]
    fn test_cancelled_replace_keeps_files_and_clears_results() {
        let fs = MemFileSystem::default().with_file("Assets/a.prefab", "guid: old");

        let mut query = ReferenceQuery::new(QuerySettings::default());
        query
            .find_references(&fs, "guid: old", &CancellationToken::new())
            .unwrap();
        assert_eq!(query.referencing_paths.len(), 1);

        let token = CancellationToken::new();
        token.cancel();
        let rewritten = query
            .replace_references(&fs, "guid: old", "guid: new", &token)
            .unwrap();

        // stopped before the first file; no rewrite, no error, and the
        // result set is still cleared with a refresh
        assert_eq!(rewritten, 0);
        assert_eq!(
            fs.read_text(Path::new("Assets/a.prefab")).unwrap(),
            "guid: old"
        );
        assert!(query.referencing_paths.is_empty());
        assert!(*fs.refreshed.borrow());
    }

    #[test]
    fn test_extension_matching_is_case_insensitive() {
        let settings = QuerySettings::default();
        assert!(settings.matches_extension(Path::new("Assets/Thing.PREFAB")));
        assert!(!settings.matches_extension(Path::new("Assets/Thing.cs")));
    }
}
