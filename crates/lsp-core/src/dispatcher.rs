//! The dispatcher. Routes parsed messages to registered handlers, tracks
//! in-flight ids in both directions, enforces the initialization lifecycle,
//! and reports protocol faults via a diagnostic callback.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use serde_json::Value;
use tracing::warn;

use crate::cancellation::{CancelSource, CancelToken};
use crate::codec::{self, Decoded, Outcome};
use crate::error::HostError;
use crate::error_codes;
use crate::id::{Id, IdOrNull};
use crate::raw::RawJson;
use crate::transport::Transport;

pub type NotificationHandler = Arc<dyn Fn(IncomingNotification) + Send + Sync>;
pub type RequestHandler = Arc<dyn Fn(Arc<IncomingRequest>) + Send + Sync>;
pub type ResponseCallback = Box<dyn FnOnce(IncomingResponse) + Send>;
pub type DiagnoseCallback = Box<dyn Fn(&str) + Send + Sync>;

/// A received notification handed to a bound handler.
#[derive(Debug, Clone)]
pub struct IncomingNotification {
    pub method: String,
    pub params: Option<Value>,
}

/// A received response paired back to the outgoing request that caused it
/// (spec data model `IncomingResponse`).
#[derive(Debug, Clone)]
pub struct IncomingResponse {
    pub id: Id,
    pub outcome: Outcome,
}

struct OutgoingEntry {
    on_response: Option<ResponseCallback>,
}

struct IncomingEntry {
    source: CancelSource,
    internal_id: u64,
}

/// A request received from the client, handed to its bound handler.
/// Exactly one of `reply`/`error` may be called; the handle's destructor
/// diagnoses an unreplied request (spec data model invariant 1).
pub struct IncomingRequest {
    pub id: Id,
    pub method: String,
    pub params: Option<Value>,
    token: CancelToken,
    internal_id: u64,
    replied: AtomicBool,
    dispatcher: Weak<Dispatcher>,
}

impl IncomingRequest {
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn cancellation_token(&self) -> CancelToken {
        self.token.clone()
    }

    /// Replies successfully. Returns `false` (and diagnoses) if this
    /// request was already replied to.
    pub fn reply(&self, result: Option<Value>) -> bool {
        if self.replied.swap(true, Ordering::SeqCst) {
            self.diagnose_double_reply();
            return false;
        }
        if let Some(dispatcher) = self.dispatcher.upgrade() {
            dispatcher.finish_incoming(&self.id, self.internal_id);
            let raw = result.map(|v| RawJson::from_value(&v).expect("result always serializes"));
            let text = codec::encode_success(&IdOrNull::Id(self.id.clone()), raw.as_ref());
            dispatcher.transport.write(&text);
        }
        true
    }

    /// Replies with a JSON-RPC error. Returns `false` (and diagnoses) if
    /// this request was already replied to.
    pub fn error(&self, code: i64, message: impl Into<String>, data: Option<Value>) -> bool {
        if self.replied.swap(true, Ordering::SeqCst) {
            self.diagnose_double_reply();
            return false;
        }
        if let Some(dispatcher) = self.dispatcher.upgrade() {
            dispatcher.finish_incoming(&self.id, self.internal_id);
            let raw = data.map(|v| RawJson::from_value(&v).expect("data always serializes"));
            let text = codec::encode_error(&IdOrNull::Id(self.id.clone()), code, &message.into(), raw.as_ref());
            dispatcher.transport.write(&text);
        }
        true
    }

    fn diagnose_double_reply(&self) {
        if let Some(dispatcher) = self.dispatcher.upgrade() {
            dispatcher.diagnose(&format!("request {} was replied to more than once", self.id));
        }
    }
}

impl Drop for IncomingRequest {
    fn drop(&mut self) {
        if !self.replied.load(Ordering::SeqCst) {
            if let Some(dispatcher) = self.dispatcher.upgrade() {
                dispatcher.diagnose(&format!("request {} was dropped without a reply", self.id));
            }
        }
    }
}

/// Whether the read loop should keep running, and if not, what exit code
/// to report.
enum LoopControl {
    Continue,
    Exit(bool),
}

/// Routes JSON-RPC envelopes between a transport and bound handlers.
pub struct Dispatcher {
    transport: Arc<dyn Transport>,
    notification_handlers: Mutex<HashMap<String, NotificationHandler>>,
    request_handlers: Mutex<HashMap<String, RequestHandler>>,
    outgoing: Mutex<HashMap<Id, OutgoingEntry>>,
    incoming: Mutex<HashMap<Id, IncomingEntry>>,
    next_outgoing_id: AtomicU64,
    next_internal_id: AtomicU64,
    initialized: AtomicBool,
    shutdown_seen: AtomicBool,
    on_diagnose: Mutex<Option<DiagnoseCallback>>,
}

impl Dispatcher {
    pub fn new(transport: Arc<dyn Transport>) -> Arc<Self> {
        Arc::new(Dispatcher {
            transport,
            notification_handlers: Mutex::new(HashMap::new()),
            request_handlers: Mutex::new(HashMap::new()),
            outgoing: Mutex::new(HashMap::new()),
            incoming: Mutex::new(HashMap::new()),
            next_outgoing_id: AtomicU64::new(1),
            next_internal_id: AtomicU64::new(1),
            initialized: AtomicBool::new(false),
            shutdown_seen: AtomicBool::new(false),
            on_diagnose: Mutex::new(None),
        })
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub fn on_diagnose(&self, callback: impl Fn(&str) + Send + Sync + 'static) {
        *self.on_diagnose.lock().unwrap() = Some(Box::new(callback));
    }

    fn diagnose(&self, message: &str) {
        match self.on_diagnose.lock().unwrap().as_ref() {
            Some(cb) => cb(message),
            None => warn!("{message}"),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    pub fn mark_initialized(&self) {
        self.initialized.store(true, Ordering::SeqCst);
    }

    pub fn shutdown_was_requested(&self) -> bool {
        self.shutdown_seen.load(Ordering::SeqCst)
    }

    pub fn mark_shutdown_requested(&self) {
        self.shutdown_seen.store(true, Ordering::SeqCst);
    }

    /// Registers a handler for an incoming notification method. At most one
    /// handler per method.
    pub fn bind_notification(
        &self,
        method: impl Into<String>,
        handler: impl Fn(IncomingNotification) + Send + Sync + 'static,
    ) -> Result<(), HostError> {
        let method = method.into();
        let mut handlers = self.notification_handlers.lock().unwrap();
        if handlers.contains_key(&method) {
            return Err(HostError::DuplicateHandler {
                kind: "notification",
                method,
            });
        }
        handlers.insert(method, Arc::new(handler));
        Ok(())
    }

    /// Registers a handler for an incoming request method. At most one
    /// handler per method.
    pub fn bind_request(
        &self,
        method: impl Into<String>,
        handler: impl Fn(Arc<IncomingRequest>) + Send + Sync + 'static,
    ) -> Result<(), HostError> {
        let method = method.into();
        let mut handlers = self.request_handlers.lock().unwrap();
        if handlers.contains_key(&method) {
            return Err(HostError::DuplicateHandler {
                kind: "request",
                method,
            });
        }
        handlers.insert(method, Arc::new(handler));
        Ok(())
    }

    pub fn get_id_for_next_outgoing_request(&self) -> Id {
        Id::Int(self.next_outgoing_id.fetch_add(1, Ordering::SeqCst) as i64)
    }

    /// Sends an outgoing notification. Returns `false` if the transport has
    /// gone bad.
    pub fn send_notification(&self, method: &str, params: Option<Value>) -> bool {
        if !self.transport.good() {
            return false;
        }
        let raw = params.map(|v| RawJson::from_value(&v).expect("params always serialize"));
        let text = codec::encode_notification(method, raw.as_ref());
        self.transport.write(&text);
        true
    }

    /// Sends an outgoing request, recording its id in the outgoing
    /// in-flight table before the write completes.
    pub fn send_request(
        self: &Arc<Self>,
        method: &str,
        params: Option<Value>,
        on_response: Option<ResponseCallback>,
    ) -> Id {
        let id = self.get_id_for_next_outgoing_request();
        {
            let mut table = self.outgoing.lock().unwrap();
            table.insert(id.clone(), OutgoingEntry { on_response });
        }
        let raw = params.map(|v| RawJson::from_value(&v).expect("params always serialize"));
        let text = codec::encode_request(&id, method, raw.as_ref());
        self.transport.write(&text);
        id
    }

    fn finish_incoming(&self, id: &Id, internal_id: u64) {
        let mut table = self.incoming.lock().unwrap();
        if let Some(entry) = table.get(id) {
            if entry.internal_id == internal_id {
                table.remove(id);
            }
        }
    }

    /// Drives `read -> classify -> route` until the transport goes bad or
    /// an `exit` notification is observed. Returns whether a prior
    /// `shutdown` request had been seen.
    pub fn forever_loop(self: &Arc<Self>) -> bool {
        loop {
            let Some(frame) = self.transport.read() else {
                return false;
            };
            match self.route_frame(&frame) {
                LoopControl::Continue => continue,
                LoopControl::Exit(clean) => return clean,
            }
        }
    }

    fn route_frame(self: &Arc<Self>, frame: &str) -> LoopControl {
        let decoded = match codec::decode(frame) {
            Ok(Some(decoded)) => decoded,
            Ok(None) => {
                self.diagnose("received an envelope that is neither a request, a response, nor a notification");
                return LoopControl::Continue;
            }
            Err(err) => {
                self.diagnose(&format!("received unparseable JSON: {err}"));
                return LoopControl::Continue;
            }
        };

        match decoded {
            Decoded::Request { id, method, params } => {
                self.handle_request(id, method, params);
                LoopControl::Continue
            }
            Decoded::Notification { method, params } if method == "exit" => {
                self.handle_notification(method, params);
                LoopControl::Exit(self.shutdown_was_requested())
            }
            Decoded::Notification { method, params } if method == "$/cancelRequest" => {
                self.handle_cancel(params);
                LoopControl::Continue
            }
            Decoded::Notification { method, params } => {
                self.handle_notification(method, params);
                LoopControl::Continue
            }
            Decoded::Response { id, outcome } => {
                self.handle_response(id, outcome);
                LoopControl::Continue
            }
        }
    }

    fn handle_request(self: &Arc<Self>, id: Id, method: String, params: Option<Value>) {
        let gated = method != "initialize" && method != "shutdown" && !self.is_initialized();
        if gated {
            let text = codec::encode_error(
                &IdOrNull::Id(id),
                error_codes::SERVER_NOT_INITIALIZED,
                "server not initialized",
                None,
            );
            self.transport.write(&text);
            return;
        }

        let handler = self.request_handlers.lock().unwrap().get(&method).cloned();
        let Some(handler) = handler else {
            let text = codec::encode_error(&IdOrNull::Id(id), error_codes::METHOD_NOT_FOUND, "method not found", None);
            self.transport.write(&text);
            return;
        };

        let internal_id = self.next_internal_id.fetch_add(1, Ordering::SeqCst);
        let source = CancelSource::new();
        let token = source.token();
        {
            let mut table = self.incoming.lock().unwrap();
            table.insert(id.clone(), IncomingEntry { source, internal_id });
        }

        let request = Arc::new(IncomingRequest {
            id,
            method,
            params,
            token,
            internal_id,
            replied: AtomicBool::new(false),
            dispatcher: Arc::downgrade(self),
        });
        handler(request);
    }

    fn handle_notification(&self, method: String, params: Option<Value>) {
        if !self.is_initialized() && method != "exit" {
            self.diagnose(&format!("dropping notification `{method}` received before initialize"));
            return;
        }
        let handler = self.notification_handlers.lock().unwrap().get(&method).cloned();
        match handler {
            Some(handler) => handler(IncomingNotification { method, params }),
            None => self.diagnose(&format!("dropping unknown notification `{method}`")),
        }
    }

    fn handle_cancel(&self, params: Option<Value>) {
        let Some(params) = params else {
            self.diagnose("$/cancelRequest missing params");
            return;
        };
        let Some(id_value) = params.get("id") else {
            self.diagnose("$/cancelRequest missing id");
            return;
        };
        let Some(id) = Id::from_value(id_value) else {
            self.diagnose("$/cancelRequest id is neither an integer nor a string");
            return;
        };
        let table = self.incoming.lock().unwrap();
        if let Some(entry) = table.get(&id) {
            entry.source.request_cancellation();
        }
    }

    fn handle_response(&self, id: IdOrNull, outcome: Outcome) {
        let Some(id) = id.as_id().cloned() else {
            self.diagnose("response with null id has no matching outgoing request");
            return;
        };
        let entry = self.outgoing.lock().unwrap().remove(&id);
        let Some(entry) = entry else {
            self.diagnose(&format!("response for unknown outgoing request id {id}"));
            return;
        };
        if let Some(callback) = entry.on_response {
            callback(IncomingResponse { id, outcome });
        }
    }
}
