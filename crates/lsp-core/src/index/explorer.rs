//! `Explorer`: partitions file specs evenly across a fixed
//! worker pool and supervises it.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use crate::index::collaborators::{LibraryManager, ParserRegistry};
use crate::index::compass::Compass;
use crate::index::filelist::FileList;
use crate::index::filespec::LibraryFileSpec;
use crate::index::worker::{DiagnoseCallback, Worker};

/// Splits `specs` into `workers` disjoint, near-equal slices: the first
/// `total % workers` slices get one extra element.
pub fn partition(specs: Vec<LibraryFileSpec>, workers: usize) -> Vec<Vec<LibraryFileSpec>> {
    let workers = workers.max(1);
    let total = specs.len();
    let length = total / workers;
    let remainder = total % workers;

    let mut slices = Vec::with_capacity(workers);
    let mut iter = specs.into_iter();
    for i in 0..workers {
        let take = length + if i < remainder { 1 } else { 0 };
        slices.push(iter.by_ref().take(take).collect());
    }
    slices
}

/// Owns a fixed pool of `Worker`s, each running on its own thread.
pub struct Explorer {
    workers: Vec<Arc<Worker>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Explorer {
    /// Builds the pool and spawns every worker immediately.
    #[allow(clippy::too_many_arguments)]
    pub fn start(
        specs: Vec<LibraryFileSpec>,
        worker_count: usize,
        workspace_root: PathBuf,
        parsers: ParserRegistry,
        library_manager: Arc<dyn LibraryManager>,
        filelist: Arc<FileList>,
        compass: Arc<Compass>,
        diagnose: DiagnoseCallback,
    ) -> Self {
        let slices = partition(specs, worker_count);
        let mut workers = Vec::with_capacity(slices.len());
        let mut handles = Vec::with_capacity(slices.len());

        for slice in slices {
            let worker = Arc::new(Worker::new(
                slice,
                workspace_root.clone(),
                parsers.clone(),
                library_manager.clone(),
                filelist.clone(),
                compass.clone(),
                diagnose.clone(),
            ));
            let spawned = worker.clone();
            handles.push(std::thread::spawn(move || spawned.run()));
            workers.push(worker);
        }

        Explorer {
            workers,
            handles: Mutex::new(handles),
        }
    }

    /// Signals every worker to stop at its next cooperative checkpoint.
    pub fn stop(&self) {
        for worker in &self.workers {
            worker.stop();
        }
    }

    /// `true` once every worker has finished its slice.
    pub fn done(&self) -> bool {
        self.workers.iter().all(|worker| worker.completed())
    }

    /// Busy-waits until every worker reports completed.
    pub fn join(&self) {
        let handles = std::mem::take(&mut *self.handles.lock().unwrap());
        for handle in handles {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_gives_remainder_slices_one_extra_element() {
        let specs: Vec<LibraryFileSpec> = (0..7)
            .map(|i| LibraryFileSpec {
                library: "work".into(),
                spec: crate::index::filespec::FileSpec::Path(PathBuf::from(format!("f{i}.vhd"))),
                origin: None,
            })
            .collect();
        let slices = partition(specs, 3);
        let lengths: Vec<usize> = slices.iter().map(Vec::len).collect();
        assert_eq!(lengths, vec![3, 2, 2]);
    }

    #[test]
    fn partition_handles_fewer_specs_than_workers() {
        let specs: Vec<LibraryFileSpec> = vec![LibraryFileSpec {
            library: "work".into(),
            spec: crate::index::filespec::FileSpec::Path(PathBuf::from("only.vhd")),
            origin: None,
        }];
        let slices = partition(specs, 4);
        let lengths: Vec<usize> = slices.iter().map(Vec::len).collect();
        assert_eq!(lengths, vec![1, 0, 0, 0]);
    }
}
