//! One writer, many readers, sticky atomic boolean: a single `Arc<AtomicBool>`
//! shared between a source that can only set the flag and tokens that can
//! only read it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Owns the cancellation flag for one in-flight request. Dropped once the
/// request is removed from the incoming in-flight table.
#[derive(Debug, Clone)]
pub struct CancelSource {
    flag: Arc<AtomicBool>,
}

impl CancelSource {
    pub fn new() -> Self {
        CancelSource {
            flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Sets the flag. Relaxed ordering is sufficient: cancellation is
    /// advisory and carries no other memory to synchronize.
    pub fn request_cancellation(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// Creates a new observer handle sharing this source's flag.
    pub fn token(&self) -> CancelToken {
        CancelToken {
            flag: self.flag.clone(),
        }
    }
}

impl Default for CancelSource {
    fn default() -> Self {
        Self::new()
    }
}

/// A read-only, copyable view onto a `CancelSource`'s flag. Handlers poll
/// this; they cannot request cancellation themselves.
#[derive(Debug, Clone)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_observes_source_cancellation() {
        let source = CancelSource::new();
        let token = source.token();
        assert!(!token.is_cancelled());
        source.request_cancellation();
        assert!(token.is_cancelled());
    }

    #[test]
    fn cancellation_is_sticky() {
        let source = CancelSource::new();
        source.request_cancellation();
        source.request_cancellation();
        assert!(source.token().is_cancelled());
    }

    #[test]
    fn tokens_are_independent_of_source_clones() {
        let source = CancelSource::new();
        let token = source.token();
        let source_clone = source.clone();
        source_clone.request_cancellation();
        assert!(token.is_cancelled());
        assert!(source.is_cancelled());
    }
}
