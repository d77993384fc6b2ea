//! `Compass`: the shared progress-accounting object the worker
//! pool reports completion through.

use std::sync::Mutex;

use crate::progress::WorkDoneProgress;

struct Counters {
    completed: usize,
    found: usize,
}

/// Tracks how many of `total` file-spec requests have completed, reporting
/// through an optional progress bar and firing a one-shot callback once
/// every request has completed.
pub struct Compass {
    total: usize,
    counters: Mutex<Counters>,
    progress_bar: Option<Mutex<WorkDoneProgress>>,
    on_all_requests_completed: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl Compass {
    pub fn new(total: usize, progress_bar: Option<WorkDoneProgress>) -> Self {
        Compass {
            total,
            counters: Mutex::new(Counters { completed: 0, found: 0 }),
            progress_bar: progress_bar.map(Mutex::new),
            on_all_requests_completed: Mutex::new(None),
        }
    }

    pub fn on_all_requests_completed(&self, callback: impl FnOnce() + Send + 'static) {
        *self.on_all_requests_completed.lock().unwrap() = Some(Box::new(callback));
    }

    pub fn completed_count(&self) -> usize {
        self.counters.lock().unwrap().completed
    }

    /// Called by a worker once a single spec has finished, `found` being
    /// the number of files it discovered (0 on failure).
    pub fn completed(&self, found: usize) {
        let (completed, total_found) = {
            let mut counters = self.counters.lock().unwrap();
            counters.completed += 1;
            counters.found += found;
            (counters.completed, counters.found)
        };

        let percent = if self.total == 0 {
            100
        } else {
            (completed * 100 / self.total) as u32
        };
        let message = format!("Found {total_found} files. (Done/Total = {completed}/{total}).", total = self.total);

        if let Some(bar) = &self.progress_bar {
            bar.lock().unwrap().report(percent, message);
        }

        if completed == self.total {
            if let Some(callback) = self.on_all_requests_completed.lock().unwrap().take() {
                callback();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn callback_fires_only_once_all_specs_completed() {
        let compass = Compass::new(2, None);
        let fired = Arc::new(AtomicBool::new(false));
        let fired_clone = fired.clone();
        compass.on_all_requests_completed(move || fired_clone.store(true, Ordering::SeqCst));

        compass.completed(3);
        assert!(!fired.load(Ordering::SeqCst));
        compass.completed(1);
        assert!(fired.load(Ordering::SeqCst));
    }

    #[test]
    fn zero_total_reports_full_percent_without_dividing_by_zero() {
        let compass = Compass::new(0, None);
        compass.completed(0);
        assert_eq!(compass.completed_count(), 1);
    }
}
