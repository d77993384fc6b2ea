//! A single indexer worker: processes a disjoint slice of file
//! specs sequentially, cooperatively stoppable between files and between
//! specs.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use regex::RegexBuilder;

use crate::index::collaborators::{LibraryManager, ParserKind, ParserRegistry};
use crate::index::compass::Compass;
use crate::index::filelist::FileList;
use crate::index::filespec::{resolve_workspace_folder, ConfigOrigin, FileSpec, LibraryFileSpec};

/// One fault surfaced while indexing, with the config-file position it
/// traces back to when the triggering spec carried one.
#[derive(Debug, Clone)]
pub struct IndexDiagnostic {
    pub message: String,
    pub origin: Option<ConfigOrigin>,
}

pub type DiagnoseCallback = Arc<dyn Fn(IndexDiagnostic) + Send + Sync>;

/// Processes one slice of library file specs on its own thread.
pub struct Worker {
    slice: Vec<LibraryFileSpec>,
    workspace_root: PathBuf,
    parsers: ParserRegistry,
    library_manager: Arc<dyn LibraryManager>,
    filelist: Arc<FileList>,
    compass: Arc<Compass>,
    diagnose: DiagnoseCallback,
    busy: AtomicBool,
    completed: AtomicBool,
    stop: AtomicBool,
}

impl Worker {
    pub fn new(
        slice: Vec<LibraryFileSpec>,
        workspace_root: PathBuf,
        parsers: ParserRegistry,
        library_manager: Arc<dyn LibraryManager>,
        filelist: Arc<FileList>,
        compass: Arc<Compass>,
        diagnose: DiagnoseCallback,
    ) -> Self {
        Worker {
            slice,
            workspace_root,
            parsers,
            library_manager,
            filelist,
            compass,
            diagnose,
            busy: AtomicBool::new(false),
            completed: AtomicBool::new(false),
            stop: AtomicBool::new(false),
        }
    }

    pub fn busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    pub fn completed(&self) -> bool {
        self.completed.load(Ordering::SeqCst)
    }

    /// Cooperative stop: observed between files within a spec and between
    /// specs, never interrupts in-flight parsing.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    fn stopped(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    /// Runs this worker's slice to completion (or until stopped). Intended
    /// to be called on a dedicated thread by `Explorer`.
    pub fn run(&self) {
        self.busy.store(true, Ordering::SeqCst);
        for spec in &self.slice {
            if self.stopped() {
                break;
            }
            let found = self.process_one(spec);
            self.compass.completed(found);
        }
        self.busy.store(false, Ordering::SeqCst);
        self.completed.store(true, Ordering::SeqCst);
    }

    fn process_one(&self, spec: &LibraryFileSpec) -> usize {
        let files = match &spec.spec {
            FileSpec::Path(raw) => {
                let resolved = resolve_workspace_folder(&raw.to_string_lossy(), &self.workspace_root);
                if !resolved.exists() {
                    self.report_missing_path(&resolved, spec);
                    return 0;
                }
                vec![resolved]
            }
            FileSpec::FileQuery {
                directory,
                search_regex,
                max_depth,
            } => {
                let root = resolve_workspace_folder(&directory.to_string_lossy(), &self.workspace_root);
                if !root.exists() {
                    self.report_missing_path(&root, spec);
                    return 0;
                }
                match RegexBuilder::new(search_regex).case_insensitive(true).build() {
                    Ok(pattern) => self.walk(&root, &pattern, *max_depth),
                    Err(err) => {
                        (self.diagnose)(IndexDiagnostic {
                            message: format!("invalid search regex `{search_regex}`: {err}"),
                            origin: spec.origin.clone(),
                        });
                        Vec::new()
                    }
                }
            }
        };

        let mut found = 0;
        for file in files {
            if self.stopped() {
                break;
            }
            self.filelist.record(file.clone(), spec.library.clone());
            if let Some(kind) = ParserKind::from_extension(&file) {
                if let Some(parser) = self.parsers.for_kind(kind) {
                    match parser.parse(&file) {
                        Ok(entries) => {
                            for entry in entries {
                                self.library_manager.insert(&spec.library, entry);
                            }
                        }
                        Err(err) => {
                            (self.diagnose)(IndexDiagnostic {
                                message: format!("failed to parse {}: {err}", file.display()),
                                origin: spec.origin.clone(),
                            });
                        }
                    }
                }
            }
            found += 1;
        }
        found
    }

    fn report_missing_path(&self, path: &Path, spec: &LibraryFileSpec) {
        let message = match &spec.origin {
            Some(origin) => format!(
                "{}:{}:{}: path `{}` does not exist",
                origin.path.display(),
                origin.line,
                origin.column,
                path.display()
            ),
            None => format!("path `{}` does not exist", path.display()),
        };
        (self.diagnose)(IndexDiagnostic {
            message,
            origin: spec.origin.clone(),
        });
    }

    fn walk(&self, root: &Path, pattern: &regex::Regex, max_depth: Option<usize>) -> Vec<PathBuf> {
        let mut found = Vec::new();
        self.walk_depth(root, pattern, max_depth, 0, &mut found);
        found
    }

    fn walk_depth(&self, dir: &Path, pattern: &regex::Regex, max_depth: Option<usize>, depth: usize, out: &mut Vec<PathBuf>) {
        if self.stopped() {
            return;
        }
        if let Some(limit) = max_depth {
            if depth > limit {
                return;
            }
        }
        let Ok(entries) = std::fs::read_dir(dir) else {
            return;
        };
        for entry in entries.flatten() {
            if self.stopped() {
                return;
            }
            let path = entry.path();
            if path.is_dir() {
                self.walk_depth(&path, pattern, max_depth, depth + 1, out);
                continue;
            }
            if !path.is_file() {
                continue;
            }
            let Some(basename) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if pattern.is_match(basename) {
                out.push(path);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::tempdir;

    struct NullLibraryManager;
    impl LibraryManager for NullLibraryManager {
        fn insert(&self, _library: &str, _entry: crate::index::collaborators::SymbolEntry) {}
    }

    fn diagnostics() -> (DiagnoseCallback, Arc<Mutex<Vec<IndexDiagnostic>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let log_clone = log.clone();
        let cb: DiagnoseCallback = Arc::new(move |diag: IndexDiagnostic| log_clone.lock().unwrap().push(diag));
        (cb, log)
    }

    #[test]
    fn file_query_walks_directory_and_records_filelist_entries() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("top.vhd"), "").unwrap();
        std::fs::write(dir.path().join("ignore.txt"), "").unwrap();

        let (diagnose, _log) = diagnostics();
        let filelist = Arc::new(FileList::new());
        let compass = Arc::new(Compass::new(1, None));
        let slice = vec![LibraryFileSpec {
            library: "work".into(),
            spec: FileSpec::FileQuery {
                directory: dir.path().to_path_buf(),
                search_regex: r"\.vhd$".into(),
                max_depth: None,
            },
            origin: None,
        }];
        let worker = Worker::new(
            slice,
            PathBuf::new(),
            ParserRegistry::new(),
            Arc::new(NullLibraryManager),
            filelist.clone(),
            compass.clone(),
            diagnose,
        );
        worker.run();

        assert!(worker.completed());
        assert_eq!(compass.completed_count(), 1);
        assert_eq!(filelist.len(), 1);
        assert!(!filelist.libraries_for(&dir.path().join("top.vhd")).is_empty());
    }

    #[test]
    fn a_missing_literal_path_is_diagnosed_and_counted_as_zero_found() {
        let (diagnose, log) = diagnostics();
        let filelist = Arc::new(FileList::new());
        let compass = Arc::new(Compass::new(1, None));
        let slice = vec![LibraryFileSpec {
            library: "work".into(),
            spec: FileSpec::Path(PathBuf::from("/definitely/not/real.vhd")),
            origin: None,
        }];
        let worker = Worker::new(
            slice,
            PathBuf::new(),
            ParserRegistry::new(),
            Arc::new(NullLibraryManager),
            filelist,
            compass.clone(),
            diagnose,
        );
        worker.run();

        assert_eq!(compass.completed_count(), 1);
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[test]
    fn a_missing_path_diagnostic_carries_its_config_origin() {
        let (diagnose, log) = diagnostics();
        let filelist = Arc::new(FileList::new());
        let compass = Arc::new(Compass::new(1, None));
        let origin = crate::index::filespec::ConfigOrigin {
            path: PathBuf::from("/repo/vhdl_config.yaml"),
            line: 4,
            column: 8,
        };
        let slice = vec![LibraryFileSpec {
            library: "work".into(),
            spec: FileSpec::Path(PathBuf::from("/definitely/not/real.vhd")),
            origin: Some(origin.clone()),
        }];
        let worker = Worker::new(
            slice,
            PathBuf::new(),
            ParserRegistry::new(),
            Arc::new(NullLibraryManager),
            filelist,
            compass,
            diagnose,
        );
        worker.run();

        let diagnostics = log.lock().unwrap();
        assert_eq!(diagnostics.len(), 1);
        let reported_origin = diagnostics[0].origin.as_ref().unwrap();
        assert_eq!(reported_origin.line, 4);
        assert_eq!(reported_origin.column, 8);
    }

    #[test]
    fn stop_is_observed_between_specs() {
        let (diagnose, _log) = diagnostics();
        let filelist = Arc::new(FileList::new());
        let compass = Arc::new(Compass::new(2, None));
        let slice = vec![
            LibraryFileSpec {
                library: "work".into(),
                spec: FileSpec::Path(PathBuf::from("/nope/a.vhd")),
                origin: None,
            },
            LibraryFileSpec {
                library: "work".into(),
                spec: FileSpec::Path(PathBuf::from("/nope/b.vhd")),
                origin: None,
            },
        ];
        let worker = Arc::new(Worker::new(
            slice,
            PathBuf::new(),
            ParserRegistry::new(),
            Arc::new(NullLibraryManager),
            filelist,
            compass,
            diagnose,
        ));
        worker.stop();
        worker.run();
        assert!(worker.completed());
    }
}
