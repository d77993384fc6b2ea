//! JSON-RPC 2.0 dispatcher, cancellation, replay harness, and background
//! file indexer for a hardware-description-language LSP host.
//!
//! The pieces compose as: a [`transport::Transport`] feeds framed text into
//! a [`dispatcher::Dispatcher`], which classifies each frame ([`codec`]) and
//! routes it to handlers bound through a [`server::Server`]/[`client::Client`]
//! facade pair. Cancellation ([`cancellation`]) and progress reporting
//! ([`progress`]) ride the same channel. The [`index`] module drives a
//! worker pool over project file specs ([`config`]) independently of the
//! dispatcher's own thread.

#![forbid(unsafe_code)]

pub mod cancellation;
pub mod client;
pub mod codec;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod error_codes;
pub mod id;
pub mod index;
pub mod progress;
pub mod raw;
pub mod server;
pub mod transport;

pub use client::Client;
pub use dispatcher::{Dispatcher, IncomingNotification, IncomingRequest, IncomingResponse};
pub use error::{HostError, Result};
pub use id::{Id, IdOrNull};
pub use index::project::ProjectIndex;
pub use server::{LanguageServer, Server};
pub use transport::Transport;
