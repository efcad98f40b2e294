//! Source packaging value types and path-exclusion logic.

use std::path::PathBuf;

/// What to include in (and exclude from) the source archive.
///
/// Only the declared directories and files go in — never a full recursive
/// copy of the working tree.
#[derive(Clone, Debug)]
pub struct SourceSpec {
    /// Root of the local working tree to package from.
    pub root: PathBuf,
    /// Directories to include, relative to `root`, walked recursively.
    pub include_dirs: Vec<String>,
    /// Single files to include, relative to `root`.
    pub include_files: Vec<String>,
    /// Patterns to skip: a bare name matches any path component, a
    /// `*.ext` pattern matches file names by extension.
    pub exclude: Vec<String>,
}

impl SourceSpec {
    /// The include/exclude set the exporter build needs.
    #[must_use]
    pub fn exporter_defaults(root: PathBuf) -> Self {
        Self {
            root,
            include_dirs: vec!["cmd".into(), "internal".into(), "pkg".into(), "etc".into()],
            include_files: vec![
                "go.mod".into(),
                "go.sum".into(),
                "Makefile".into(),
                "LICENSE".into(),
            ],
            exclude: vec![
                ".git".into(),
                "downloads".into(),
                "vendor".into(),
                "node_modules".into(),
                "__pycache__".into(),
                "*.bat".into(),
                "*.ps1".into(),
            ],
        }
    }
}

/// A packed source archive, created fresh per run in a temporary location
/// and deleted once it is no longer needed.
#[derive(Clone, Debug)]
pub struct SourceArchive {
    pub path: PathBuf,
    pub byte_size: u64,
    pub sha256: String,
    /// Sorted list of included relative paths. Completeness is
    /// deterministic for a given working tree.
    pub manifest: Vec<String>,
}

/// Whether a relative path (forward-slash separated) matches any exclude
/// pattern.
#[must_use]
pub fn is_excluded(rel_path: &str, patterns: &[String]) -> bool {
    patterns.iter().any(|pattern| {
        if let Some(ext) = pattern.strip_prefix("*.") {
            rel_path
                .rsplit('/')
                .next()
                .is_some_and(|name| name.rsplit('.').next() == Some(ext) && name.contains('.'))
        } else {
            rel_path.split('/').any(|component| component == pattern)
        }
    })
}
