//! Work-done progress reporting: a scoped handle that
//! emits `$/progress` `begin`/`report`/`end` notifications and sends the
//! terminal `end` at drop time if one hasn't already gone out.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::json;

use crate::raw::RawJson;
use crate::transport::Transport;

/// Gates creation of a second progress bar for the same client. Shared
/// between the client facade and every `WorkDoneProgress` handle it hands
/// out.
#[derive(Clone, Default)]
pub struct ProgressVisibility(Arc<AtomicBool>);

impl ProgressVisibility {
    pub fn new() -> Self {
        ProgressVisibility(Arc::new(AtomicBool::new(false)))
    }

    /// Atomically claims visibility; `None` if a bar is already live.
    fn claim(&self) -> Option<ProgressGuard> {
        if self.0.swap(true, Ordering::SeqCst) {
            None
        } else {
            Some(ProgressGuard(self.0.clone()))
        }
    }
}

struct ProgressGuard(Arc<AtomicBool>);

impl Drop for ProgressGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// A scoped work-done progress bar. `report` drives the `begin`/`report`/
/// `end` state machine; dropping the handle before reaching 100% still
/// emits a terminal `end` notification.
pub struct WorkDoneProgress {
    token: String,
    title: String,
    transport: Arc<dyn Transport>,
    started: bool,
    finished: bool,
    _guard: ProgressGuard,
}

impl WorkDoneProgress {
    /// Creates a progress bar for `token`, or `None` if one is already
    /// visible for this client.
    pub fn create(
        token: impl Into<String>,
        title: impl Into<String>,
        transport: Arc<dyn Transport>,
        visibility: &ProgressVisibility,
    ) -> Option<Self> {
        let guard = visibility.claim()?;
        Some(WorkDoneProgress {
            token: token.into(),
            title: title.into(),
            transport,
            started: false,
            finished: false,
            _guard: guard,
        })
    }

    /// `percent` is clamped into `1..=100` when zero.
    pub fn report(&mut self, percent: u32, message: impl Into<String>) {
        if self.finished {
            return;
        }
        let message = message.into();

        if percent >= 100 {
            if self.started {
                self.send_end();
            }
            return;
        }

        let clamped = percent.max(1).min(100);
        if !self.started {
            self.send_begin(clamped, &message);
        } else {
            self.send_report(clamped, &message);
        }
    }

    fn send_begin(&mut self, percent: u32, message: &str) {
        self.started = true;
        self.send(json!({
            "token": self.token,
            "value": {
                "kind": "begin",
                "title": self.title,
                "message": message,
                "percentage": percent,
            }
        }));
    }

    fn send_report(&mut self, percent: u32, message: &str) {
        self.send(json!({
            "token": self.token,
            "value": {
                "kind": "report",
                "message": message,
                "percentage": percent,
            }
        }));
    }

    fn send_end(&mut self) {
        self.finished = true;
        self.send(json!({
            "token": self.token,
            "value": { "kind": "end" }
        }));
    }

    fn send(&self, payload: serde_json::Value) {
        let raw = RawJson::from_value(&payload).expect("progress payload always serializes");
        let text = crate::codec::encode_notification("$/progress", Some(&raw));
        self.transport.write(&text);
    }
}

impl Drop for WorkDoneProgress {
    fn drop(&mut self) {
        if self.started && !self.finished {
            self.send_end();
        }
    }
}
