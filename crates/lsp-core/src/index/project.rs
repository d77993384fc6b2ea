//! `ProjectIndex`:
//! owns the current library-manager / filelist / explorer generation behind
//! one mutex and performs a staged swap on reload.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::config::ProjectConfig;
use crate::index::collaborators::{LibraryManager, ParserRegistry};
use crate::index::compass::Compass;
use crate::index::explorer::Explorer;
use crate::index::filelist::FileList;
use crate::index::worker::DiagnoseCallback;
use crate::progress::WorkDoneProgress;

/// One generation of the index: a library manager, the filelist it fed, and
/// the explorer that drove both.
struct Generation {
    library_manager: Arc<dyn LibraryManager>,
    filelist: Arc<FileList>,
    explorer: Arc<Explorer>,
}

/// Holds the current generation of the background index and swaps it out on
/// reload. The swap itself never blocks a reader: the previous generation's
/// explorer is stopped and joined *before* the lock that performs the
/// pointer replacement is taken.
pub struct ProjectIndex {
    parsers: ParserRegistry,
    diagnose: DiagnoseCallback,
    current: Mutex<Option<Generation>>,
}

impl ProjectIndex {
    pub fn new(parsers: ParserRegistry, diagnose: DiagnoseCallback) -> Self {
        ProjectIndex {
            parsers,
            diagnose,
            current: Mutex::new(None),
        }
    }

    /// The filelist of the current generation, if any reload has happened
    /// yet.
    pub fn filelist(&self) -> Option<Arc<FileList>> {
        self.current.lock().unwrap().as_ref().map(|g| g.filelist.clone())
    }

    pub fn library_manager(&self) -> Option<Arc<dyn LibraryManager>> {
        self.current.lock().unwrap().as_ref().map(|g| g.library_manager.clone())
    }

    /// Builds a new library manager / filelist / explorer from `config`,
    /// starts its worker pool against `worker_count` workers, then performs
    /// the staged swap against whatever generation is current. Returns the
    /// new generation's `Compass` so the caller can wire a progress bar's
    /// lifetime to it or wait on completion via the explorer.
    pub fn reload(
        &self,
        config: &ProjectConfig,
        config_path: &Path,
        workspace_root: PathBuf,
        worker_count: usize,
        library_manager: Arc<dyn LibraryManager>,
        progress_bar: Option<WorkDoneProgress>,
    ) -> Arc<Compass> {
        let specs = config.file_specs(config_path);
        let total = specs.len();
        let filelist = Arc::new(FileList::new());
        let compass = Arc::new(Compass::new(total, progress_bar));

        let explorer = Arc::new(Explorer::start(
            specs,
            worker_count.max(1),
            workspace_root,
            self.parsers.clone(),
            library_manager.clone(),
            filelist.clone(),
            compass.clone(),
            self.diagnose.clone(),
        ));

        // Snapshot the outgoing generation without removing it yet: readers
        // (e.g. hover/definition lookups, if the core ever grows them) keep
        // seeing the old generation until the swap below.
        let outgoing = self
            .current
            .lock()
            .unwrap()
            .as_ref()
            .map(|g| (g.library_manager.clone(), g.explorer.clone()));

        if let Some((_, explorer)) = &outgoing {
            explorer.stop();
            explorer.join();
        }

        let mut current = self.current.lock().unwrap();
        *current = Some(Generation {
            library_manager,
            filelist,
            explorer,
        });
        if let Some((library_manager, _)) = outgoing {
            library_manager.destroy();
        }
        drop(current);

        compass
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::collaborators::SymbolEntry;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingManager {
        inserts: AtomicUsize,
        destroyed: Arc<AtomicUsize>,
    }

    impl LibraryManager for CountingManager {
        fn insert(&self, _library: &str, _entry: SymbolEntry) {
            self.inserts.fetch_add(1, Ordering::SeqCst);
        }

        fn destroy(&self) {
            self.destroyed.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn empty_config() -> ProjectConfig {
        serde_norway::from_str("libraries: {}").unwrap()
    }

    #[test]
    fn reload_with_no_prior_generation_does_not_call_destroy() {
        let diagnose: DiagnoseCallback = Arc::new(|_diag| {});
        let index = ProjectIndex::new(ParserRegistry::new(), diagnose);
        let destroyed = Arc::new(AtomicUsize::new(0));
        let manager = Arc::new(CountingManager {
            inserts: AtomicUsize::new(0),
            destroyed: destroyed.clone(),
        });

        let compass = index.reload(
            &empty_config(),
            Path::new("/repo/vhdl_config.yaml"),
            PathBuf::from("/repo"),
            1,
            manager,
            None,
        );
        assert_eq!(compass.completed_count(), 0);
        assert_eq!(destroyed.load(Ordering::SeqCst), 0);
        assert!(index.filelist().is_some());
    }

    #[test]
    fn second_reload_destroys_the_first_generations_manager() {
        let diagnose: DiagnoseCallback = Arc::new(|_diag| {});
        let index = ProjectIndex::new(ParserRegistry::new(), diagnose);
        let destroyed = Arc::new(AtomicUsize::new(0));

        let first = Arc::new(CountingManager {
            inserts: AtomicUsize::new(0),
            destroyed: destroyed.clone(),
        });
        index.reload(
            &empty_config(),
            Path::new("/repo/vhdl_config.yaml"),
            PathBuf::from("/repo"),
            1,
            first,
            None,
        );
        assert_eq!(destroyed.load(Ordering::SeqCst), 0);

        let second = Arc::new(CountingManager {
            inserts: AtomicUsize::new(0),
            destroyed: destroyed.clone(),
        });
        index.reload(
            &empty_config(),
            Path::new("/repo/vhdl_config.yaml"),
            PathBuf::from("/repo"),
            1,
            second,
            None,
        );
        assert_eq!(destroyed.load(Ordering::SeqCst), 1);
    }
}
