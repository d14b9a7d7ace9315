//! Unified error types for missal.
//!
//! Every variant renders with a stable upper-case code prefix so failures can be
//! matched in logs and by protocol adapters without parsing prose.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use tokio_rusqlite::rusqlite;

/// Unified error type shared by the store, the pipeline and the service.
///
/// All payloads are plain data so one refresh outcome can be handed to every
/// caller waiting on the same key.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The requested key is not configured.
    #[error("UNKNOWN_KEY: {0}")]
    UnknownKey(String),

    /// Network, DNS or TLS failure while fetching the source document.
    #[error("FETCH_FAILED: {0}")]
    FetchTransport(String),

    /// The source answered with a non-success status.
    #[error("HTTP_STATUS: {status} from {url}")]
    HttpStatus { status: u16, url: String },

    /// The fetch exceeded its timeout.
    #[error("FETCH_TIMEOUT: {0}")]
    FetchTimeout(String),

    /// Response body exceeded the configured byte limit.
    #[error("FETCH_TOO_LARGE: {0}")]
    FetchTooLarge(String),

    /// The selector rule matched nothing in the fetched document.
    #[error("FRAGMENT_NOT_FOUND: {0}")]
    FragmentNotFound(String),

    /// The selector rule matched a node with no meaningful content.
    #[error("EMPTY_FRAGMENT: {0}")]
    EmptyFragment(String),

    /// The cache store could not be read or written.
    #[error("CACHE_UNAVAILABLE: {0}")]
    CacheUnavailable(String),

    /// Migration failed to apply.
    #[error("CACHE_UNAVAILABLE: migration failed: {0}")]
    MigrationFailed(String),

    /// Invalid input parameters or configuration values.
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Anything the pipeline did not anticipate (panicked refresh task, etc).
    #[error("INTERNAL: {0}")]
    Internal(String),
}

/// Coarse classification of an [`Error`] for routing layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Key is not configured.
    UnknownKey,
    /// A configured key could not be served right now.
    Unavailable,
    /// Caller sent something malformed.
    InvalidInput,
    /// Bug or unexpected state.
    Internal,
}

impl Error {
    /// Classify the error so "not configured" is never conflated with "pipeline failed".
    pub fn class(&self) -> ErrorClass {
        match self {
            Error::UnknownKey(_) => ErrorClass::UnknownKey,
            Error::FetchTransport(_)
            | Error::HttpStatus { .. }
            | Error::FetchTimeout(_)
            | Error::FetchTooLarge(_)
            | Error::FragmentNotFound(_)
            | Error::EmptyFragment(_)
            | Error::CacheUnavailable(_)
            | Error::MigrationFailed(_) => ErrorClass::Unavailable,
            Error::InvalidInput(_) => ErrorClass::InvalidInput,
            Error::Internal(_) => ErrorClass::Internal,
        }
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::CacheUnavailable("connection closed".into()),
            tokio_rusqlite::Error::Close(_) => Error::CacheUnavailable("connection close failed".into()),
            _ => Error::CacheUnavailable("connection closed".into()),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::CacheUnavailable(err.to_string())
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::CacheUnavailable(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::CacheUnavailable(err.to_string())
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let code = match err.class() {
            ErrorClass::UnknownKey => -32004,
            ErrorClass::Unavailable => -32003,
            ErrorClass::InvalidInput => -32602,
            ErrorClass::Internal => -32603,
        };

        McpError { code: ErrorCode(code), message: err.to_string().into(), data: None }
    }
}
