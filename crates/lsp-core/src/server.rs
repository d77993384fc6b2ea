//! Server facade: wires the default lifecycle handlers
//! (`initialize`/`initialized`/`shutdown`/`exit`) onto a `Dispatcher`, lets
//! an implementation bind the rest, then drives the read loop.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::client::Client;
use crate::dispatcher::Dispatcher;
use crate::error::HostError;
use crate::transport::Transport;

/// The behavior a concrete language server supplies. Every method has a
/// default so an implementation only overrides what it needs.
pub trait LanguageServer: Send + Sync {
    /// Called once, before the read loop starts, to bind request and
    /// notification handlers beyond the default lifecycle ones.
    fn setup(&self, dispatcher: &Dispatcher, client: &Client) -> Result<(), HostError> {
        let _ = (dispatcher, client);
        Ok(())
    }

    /// Builds the `initialize` result. The default is an empty capabilities
    /// skeleton; a real implementation advertises what it supports.
    fn capabilities(&self) -> Value {
        json!({ "capabilities": {} })
    }

    /// Called when an `initialize` request arrives, after the default
    /// handler has recorded capabilities but before it replies.
    fn on_initialize(&self, _params: Option<Value>, _client: &Client) {}

    /// Called when a `shutdown` request arrives, before the default
    /// handler replies and the dispatcher's shutdown flag is set.
    fn on_shutdown(&self, _client: &Client) {}

    /// Called when the client's `initialized` notification arrives, after
    /// the dispatcher has flipped its own initialized flag. A concrete
    /// implementation kicks off the first project (re)load from here; a
    /// default implementation has nothing to do.
    fn on_initialized(&self, _client: &Client) {}
}

/// Drives a `LanguageServer` implementation over a transport.
pub struct Server<S> {
    dispatcher: Arc<Dispatcher>,
    client: Client,
    implementation: Arc<S>,
}

impl<S: LanguageServer + 'static> Server<S> {
    pub fn new(transport: Arc<dyn Transport>, implementation: Arc<S>) -> Self {
        let dispatcher = Dispatcher::new(transport);
        let client = Client::new(dispatcher.clone());
        Server {
            dispatcher,
            client,
            implementation,
        }
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Binds the four default lifecycle handlers, runs `setup`, then drives
    /// the dispatcher's read loop to completion. Returns whether the
    /// exchange ended cleanly: a `shutdown` request was seen before the
    /// `exit` notification that ended the loop.
    pub fn run(&self) -> Result<bool, HostError> {
        self.bind_lifecycle_handlers()?;
        self.implementation.setup(&self.dispatcher, &self.client)?;
        Ok(self.dispatcher.forever_loop())
    }

    fn bind_lifecycle_handlers(&self) -> Result<(), HostError> {
        let implementation = self.implementation.clone();
        let client = self.client.clone();
        self.dispatcher.bind_request("initialize", move |request| {
            implementation.on_initialize(request.params.clone(), &client);
            request.reply(Some(implementation.capabilities()));
            // The dispatcher flips its own flag only after the reply is
            // written: reply first, then become ready.
        })?;
        // `mark_initialized` needs dispatcher access; wrap once more so the
        // flag flips right after the reply above.
        let dispatcher_for_init = self.dispatcher.clone();
        let implementation = self.implementation.clone();
        let client = self.client.clone();
        self.dispatcher.bind_notification("initialized", move |_| {
            dispatcher_for_init.mark_initialized();
            implementation.on_initialized(&client);
        })?;

        let implementation = self.implementation.clone();
        let client = self.client.clone();
        let dispatcher_for_shutdown = self.dispatcher.clone();
        self.dispatcher.bind_request("shutdown", move |request| {
            implementation.on_shutdown(&client);
            dispatcher_for_shutdown.mark_shutdown_requested();
            request.reply(None);
        })?;

        self.dispatcher.bind_notification("exit", |_| {
            // The dispatcher itself ends the read loop on `exit`; nothing
            // else to do here.
        })?;

        Ok(())
    }
}
