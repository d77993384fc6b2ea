//! Client facade: the narrow surface handlers use to talk back
//! to the connected peer.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use serde_json::{json, Value};

use crate::dispatcher::{Dispatcher, IncomingResponse, ResponseCallback};
use crate::id::Id;
use crate::progress::{ProgressVisibility, WorkDoneProgress};

/// Thin wrapper around a `Dispatcher` exposing only outbound operations,
/// handed to request/notification handlers instead of the dispatcher
/// itself so handler code cannot reach into routing internals.
#[derive(Clone)]
pub struct Client {
    dispatcher: Arc<Dispatcher>,
    progress_visibility: ProgressVisibility,
    /// Diagnostics published per-URI by `publish_persistent_diagnostic`,
    /// kept around because `textDocument/publishDiagnostics` replaces the
    /// whole array on every call: several independent callers (a bad
    /// config parse, several missing-path workers) can target the same
    /// URI and each needs its own entry to survive the others' publishes.
    persistent_diagnostics: Arc<Mutex<HashMap<String, Vec<Value>>>>,
}

impl Client {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Client {
            dispatcher,
            progress_visibility: ProgressVisibility::new(),
            persistent_diagnostics: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Sends a one-way notification. Returns `false` if the transport has
    /// gone bad.
    pub fn notify(&self, method: &str, params: Option<Value>) -> bool {
        self.dispatcher.send_notification(method, params)
    }

    /// Sends a request and returns its id immediately; `on_response` fires
    /// once, from inside the dispatcher's read loop, whenever the matching
    /// response frame arrives.
    pub fn request(
        &self,
        method: &str,
        params: Option<Value>,
        on_response: Option<Box<dyn FnOnce(IncomingResponse) + Send>>,
    ) -> Id {
        let callback: Option<ResponseCallback> = on_response;
        self.dispatcher.send_request(method, params, callback)
    }

    /// Creates a scoped work-done progress bar for `token`, or `None` if
    /// one is already visible.
    pub fn create_progress(&self, token: impl Into<String>, title: impl Into<String>) -> Option<WorkDoneProgress> {
        WorkDoneProgress::create(
            token,
            title,
            self.dispatcher.transport().clone(),
            &self.progress_visibility,
        )
    }

    /// Adds one diagnostic to `uri`'s persistent set, at `line`/`column`
    /// (0-based, LSP convention), and republishes the whole set. The
    /// diagnostic stays until `clear_persistent_diagnostic` is called for
    /// the same `uri` — used for configuration faults that outlive a
    /// single document version, e.g. a bad config file or a library entry
    /// whose path doesn't exist.
    pub fn publish_persistent_diagnostic(&self, uri: &str, message: impl Into<String>, line: usize, column: usize) -> bool {
        let diagnostic = json!({
            "range": {
                "start": { "line": line, "character": column },
                "end": { "line": line, "character": column },
            },
            "severity": 1,
            "message": message.into(),
        });
        let diagnostics = {
            let mut published = self.persistent_diagnostics.lock().unwrap();
            let entry = published.entry(uri.to_string()).or_default();
            entry.push(diagnostic);
            entry.clone()
        };
        self.send_publish_diagnostics(uri, diagnostics)
    }

    /// Clears every diagnostic previously published against `uri`.
    pub fn clear_persistent_diagnostic(&self, uri: &str) -> bool {
        self.persistent_diagnostics.lock().unwrap().remove(uri);
        self.send_publish_diagnostics(uri, Vec::new())
    }

    fn send_publish_diagnostics(&self, uri: &str, diagnostics: Vec<Value>) -> bool {
        self.notify(
            "textDocument/publishDiagnostics",
            Some(json!({ "uri": uri, "diagnostics": diagnostics })),
        )
    }
}
