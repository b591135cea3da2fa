//! Transport-level errors.

use std::io;

use thiserror::Error;

use crate::http::error::ParseError;
use crate::net::pool::PoolError;

/// Why a session ended abnormally.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A read or write did not finish within its deadline.
    #[error("timed out waiting for the peer")]
    Timeout,

    /// The peer closed its side (EOF).
    #[error("connection closed by peer")]
    RemoteClosed,

    #[error("connection reset by peer")]
    ConnectionReset,

    #[error("request quota for this connection exhausted")]
    QuotaExceeded,

    #[error("I/O error: {0}")]
    Io(#[source] io::Error),

    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
}

impl SessionError {
    /// Sort an I/O failure into the session's taxonomy.
    pub fn classify(error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::TimedOut => SessionError::Timeout,
            io::ErrorKind::UnexpectedEof => SessionError::RemoteClosed,
            io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe => SessionError::ConnectionReset,
            _ => SessionError::Io(error),
        }
    }

    /// Stable label for logs and metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            SessionError::Timeout => "timeout",
            SessionError::RemoteClosed => "remote_closed",
            SessionError::ConnectionReset => "connection_reset",
            SessionError::QuotaExceeded => "quota_exceeded",
            SessionError::Io(_) => "io_error",
            SessionError::Parse(_) => "parse_error",
        }
    }
}

impl From<io::Error> for SessionError {
    fn from(error: io::Error) -> Self {
        SessionError::classify(error)
    }
}

/// Error type for binding and running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to resolve {host}:{port}: {source}")]
    Resolve {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Pool(#[from] PoolError),
}
