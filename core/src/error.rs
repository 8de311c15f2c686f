//! Error types for the lazy HTTP client.
//!
//! # Design
//! Configuration mistakes (`InvalidArgument`, `UnsupportedOperation`,
//! `NotFound`) are raised by the setter that caused them, never deferred to
//! execution. `Transport` covers every failure of the underlying transfer and
//! keeps the transport's own error category next to its message so callers
//! can tell a timeout from a refused connection.

use std::fmt;
use std::path::PathBuf;

/// Broad category of a transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    Timeout,
    HostNotFound,
    Connection,
    Tls,
    Protocol,
    Io,
    Other,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransportErrorKind::Timeout => "timeout",
            TransportErrorKind::HostNotFound => "host not found",
            TransportErrorKind::Connection => "connection",
            TransportErrorKind::Tls => "tls",
            TransportErrorKind::Protocol => "protocol",
            TransportErrorKind::Io => "io",
            TransportErrorKind::Other => "other",
        };
        f.write_str(s)
    }
}

/// Errors returned by `RequestSpec` setters and `HttpClient` accessors.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    /// A configuration value was rejected, e.g. an unsupported method.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The operation is not allowed for the current configuration, e.g.
    /// attaching a file to a non-POST request.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// A file given for upload does not exist or is not a regular file.
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The transfer itself failed (DNS, connect, TLS, timeout, ...).
    #[error("transport error ({kind}): {message}")]
    Transport {
        kind: TransportErrorKind,
        message: String,
    },

    /// The response body could not be decoded as JSON.
    #[error("decode error: {0}")]
    Decode(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl HttpError {
    pub(crate) fn transport(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        HttpError::Transport {
            kind,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, HttpError>;
