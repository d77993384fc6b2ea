use std::path::PathBuf;

use thiserror::Error;

use crate::id::Id;

/// Errors surfaced by the dispatcher, transport, replay harness, and
/// background indexer.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("transport read failed: {0}")]
    TransportRead(#[source] std::io::Error),
    #[error("transport write failed: {0}")]
    TransportWrite(#[source] std::io::Error),
    #[error("transport is no longer usable")]
    TransportClosed,
    #[error("failed to open journal tee file `{path}`: {source}")]
    JournalOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed JSON-RPC envelope: {0}")]
    Codec(#[from] serde_json::Error),
    #[error("envelope is neither a request, a response, nor a notification")]
    UnclassifiableEnvelope,
    #[error("response carries neither `result` nor `error`")]
    MalformedResponse,
    #[error("handler already registered for {kind} method `{method}`")]
    DuplicateHandler { kind: &'static str, method: String },
    #[error("no handler registered for method `{0}`")]
    MethodNotFound(String),
    #[error("request {0} was replied to more than once")]
    DoubleReply(Id),
    #[error("request {0} was dropped without a reply")]
    UnrepliedRequest(Id),
    #[error("response for unknown outgoing request id {0}")]
    UnknownResponseId(Id),
    #[error("server has not been initialized")]
    NotInitialized,
    #[error("a progress bar is already visible for this client")]
    ProgressAlreadyVisible,
    #[error("failed to read project config `{path}`: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse project config `{path}` at line {line}, column {column}: {message}")]
    ConfigParse {
        path: PathBuf,
        line: usize,
        column: usize,
        message: String,
    },
    #[error("file spec path `{0}` does not exist")]
    MissingPath(PathBuf),
    #[error("journal parse error at {path}:{line}: {message}")]
    JournalParse {
        path: PathBuf,
        line: usize,
        message: String,
    },
}

pub type Result<T, E = HostError> = std::result::Result<T, E>;
