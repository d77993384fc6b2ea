//! Project configuration: a YAML file mapping library
//! names to the file specs that belong to them, read with `serde_norway`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{HostError, Result};
use crate::index::filespec::{ConfigOrigin, FileSpec, LibraryFileSpec};

/// One item of a library's `files:` list: either a literal path or a
/// recursive directory query.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum FileEntry {
    Query {
        directory: String,
        search_regex: String,
        #[serde(default)]
        max_depth: Option<usize>,
    },
    Path(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LibraryConfig {
    #[serde(default)]
    files: Vec<FileEntry>,
}

/// The top-level project configuration: a map of library name to its
/// file list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    libraries: HashMap<String, LibraryConfig>,
    /// The document `read` parsed this from, kept around so `file_specs`
    /// can recover per-entry positions `serde_norway`'s typed output
    /// doesn't retain.
    #[serde(skip)]
    raw_source: String,
}

impl ProjectConfig {
    /// Reads and parses a project configuration file. YAML syntax errors
    /// are reported with the line/column `serde_norway` attaches to them.
    pub fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| HostError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: ProjectConfig = serde_norway::from_str(&text).map_err(|err| {
            let location = err.location();
            let line = location.as_ref().map(|l| l.line()).unwrap_or(0);
            let column = location.as_ref().map(|l| l.column()).unwrap_or(0);
            HostError::ConfigParse {
                path: path.to_path_buf(),
                line,
                column,
                message: err.to_string(),
            }
        })?;
        config.raw_source = text;
        Ok(config)
    }

    /// Flattens every library's file list into specs the indexer can
    /// partition across workers. Specs carry `config_path` plus the
    /// entry's line/column within the document, recovered from the raw
    /// text by `locate_file_entries` since `serde_norway`'s typed output
    /// doesn't retain per-node positions; an entry the scanner can't place
    /// (an unusual flow-style list, say) falls back to `0, 0`.
    pub fn file_specs(&self, config_path: &Path) -> Vec<LibraryFileSpec> {
        let positions = locate_file_entries(&self.raw_source);
        let mut specs = Vec::new();
        for (library, config) in &self.libraries {
            for (index, entry) in config.files.iter().enumerate() {
                let spec = match entry {
                    FileEntry::Path(raw) => FileSpec::Path(PathBuf::from(raw)),
                    FileEntry::Query {
                        directory,
                        search_regex,
                        max_depth,
                    } => FileSpec::FileQuery {
                        directory: PathBuf::from(directory),
                        search_regex: search_regex.clone(),
                        max_depth: *max_depth,
                    },
                };
                let (line, column) = positions.get(&(library.clone(), index)).copied().unwrap_or((0, 0));
                specs.push(LibraryFileSpec {
                    library: library.clone(),
                    spec,
                    origin: Some(ConfigOrigin {
                        path: config_path.to_path_buf(),
                        line,
                        column,
                    }),
                });
            }
        }
        specs
    }

    pub fn library_names(&self) -> impl Iterator<Item = &str> {
        self.libraries.keys().map(String::as_str)
    }
}

/// Scans a `vhdl_config.yaml` document's raw text for the position of each
/// library's `files:` sequence items, keyed by `(library name, index within
/// that library's file list)`. Tracks indentation rather than parsing YAML
/// properly: good enough for the block-sequence style the example configs
/// and tests use, best-effort (falls back to `0, 0`) for anything flow-style
/// or otherwise unusual.
fn locate_file_entries(raw: &str) -> HashMap<(String, usize), (usize, usize)> {
    let mut positions = HashMap::new();
    let mut current_library: Option<String> = None;
    let mut index_in_library = 0usize;
    let mut in_files_block = false;
    let mut files_indent = 0usize;

    for (line_no, raw_line) in raw.lines().enumerate() {
        let indent = raw_line.len() - raw_line.trim_start().len();
        let trimmed = raw_line.trim_start();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        if in_files_block && indent <= files_indent {
            in_files_block = false;
        }

        if !in_files_block {
            if let Some(name) = trimmed.strip_suffix(':').filter(|name| !name.is_empty()) {
                if name == "files" {
                    in_files_block = true;
                    files_indent = indent;
                } else if name != "libraries" {
                    current_library = Some(name.to_string());
                    index_in_library = 0;
                }
                continue;
            }
        }

        if in_files_block && trimmed.starts_with("- ") {
            if let Some(library) = &current_library {
                let content = &trimmed[2..];
                let leading_ws = content.len() - content.trim_start().len();
                let column = indent + 2 + leading_ws;
                positions.insert((library.clone(), index_in_library), (line_no, column));
                index_in_library += 1;
            }
        }
    }
    positions
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn reads_literal_paths_and_file_queries() {
        let file = write_temp(
            r#"
libraries:
  work:
    files:
      - src/top.vhd
      - directory: src/ip
        search_regex: "\\.vhd$"
        max_depth: 2
"#,
        );
        let config = ProjectConfig::read(file.path()).unwrap();
        let specs = config.file_specs(file.path());
        assert_eq!(specs.len(), 2);
        assert!(specs.iter().any(|s| matches!(s.spec, FileSpec::Path(_))));
        assert!(specs.iter().any(|s| matches!(s.spec, FileSpec::FileQuery { .. })));
    }

    #[test]
    fn file_specs_recover_real_line_and_column_per_entry() {
        let file = write_temp(
            "libraries:\n  work:\n    files:\n      - src/top.vhd\n      - src/pkg.vhd\n",
        );
        let config = ProjectConfig::read(file.path()).unwrap();
        let specs = config.file_specs(file.path());
        let top = specs
            .iter()
            .find(|s| matches!(&s.spec, FileSpec::Path(p) if p == Path::new("src/top.vhd")))
            .unwrap();
        let pkg = specs
            .iter()
            .find(|s| matches!(&s.spec, FileSpec::Path(p) if p == Path::new("src/pkg.vhd")))
            .unwrap();
        let top_origin = top.origin.as_ref().unwrap();
        let pkg_origin = pkg.origin.as_ref().unwrap();
        assert_eq!((top_origin.line, top_origin.column), (3, 8));
        assert_eq!((pkg_origin.line, pkg_origin.column), (4, 8));
    }

    #[test]
    fn an_entry_the_scanner_cant_place_falls_back_to_zero() {
        let file = write_temp("libraries:\n  work:\n    files: [src/top.vhd]\n");
        let config = ProjectConfig::read(file.path()).unwrap();
        let specs = config.file_specs(file.path());
        assert_eq!(specs.len(), 1);
        let origin = specs[0].origin.as_ref().unwrap();
        assert_eq!((origin.line, origin.column), (0, 0));
    }

    #[test]
    fn malformed_yaml_reports_a_parse_error() {
        let file = write_temp("libraries: [this is not a map");
        let err = ProjectConfig::read(file.path()).unwrap_err();
        assert!(matches!(err, HostError::ConfigParse { .. }));
    }

    #[test]
    fn a_missing_file_is_reported_as_a_read_error() {
        let err = ProjectConfig::read(Path::new("/definitely/not/a/real/config.yaml")).unwrap_err();
        assert!(matches!(err, HostError::ConfigRead { .. }));
    }
}
