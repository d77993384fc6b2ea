//! The file-list registry: maps an absolute path to every library that
//! claims it. A path claimed by more than one library simply owns a
//! `Vec<LibraryHandle>` with one entry per claim.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// One library's claim on a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryHandle {
    pub library: String,
}

/// Registry of every file discovered by the indexer, keyed by absolute
/// path. Guarded by a single mutex.
#[derive(Default)]
pub struct FileList {
    entries: Mutex<HashMap<PathBuf, Vec<LibraryHandle>>>,
}

impl FileList {
    pub fn new() -> Self {
        FileList::default()
    }

    pub fn record(&self, path: PathBuf, library: impl Into<String>) {
        let mut entries = self.entries.lock().unwrap();
        entries.entry(path).or_default().push(LibraryHandle { library: library.into() });
    }

    pub fn libraries_for(&self, path: &Path) -> Vec<LibraryHandle> {
        self.entries.lock().unwrap().get(path).cloned().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
