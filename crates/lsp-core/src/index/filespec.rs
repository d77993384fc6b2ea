//! File specs: the inputs to the background indexer.

use std::path::PathBuf;

/// One entry from a library's `files:` list in the project configuration.
#[derive(Debug, Clone)]
pub enum FileSpec {
    /// A single file, given literally.
    Path(PathBuf),
    /// A recursive directory search matched against a case-insensitive
    /// basename regex.
    FileQuery {
        directory: PathBuf,
        search_regex: String,
        max_depth: Option<usize>,
    },
}

/// Where a file spec came from in the project configuration, so a missing
/// path can be reported as a persistent diagnostic keyed to the offending
/// YAML line/column.
#[derive(Debug, Clone)]
pub struct ConfigOrigin {
    pub path: PathBuf,
    pub line: usize,
    pub column: usize,
}

/// A file spec paired with the library it contributes to.
#[derive(Debug, Clone)]
pub struct LibraryFileSpec {
    pub library: String,
    pub spec: FileSpec,
    pub origin: Option<ConfigOrigin>,
}

/// Replaces a literal `${workspaceFolder}` prefix with `root`.
pub fn resolve_workspace_folder(raw: &str, root: &std::path::Path) -> PathBuf {
    const MACRO: &str = "${workspaceFolder}";
    match raw.strip_prefix(MACRO) {
        Some(rest) => root.join(rest.trim_start_matches('/')),
        None => PathBuf::from(raw),
    }
}
