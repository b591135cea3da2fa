//! Parser error taxonomy.

use thiserror::Error;

/// Terminal outcome of a parse that did not produce a request.
///
/// [`ParseError::PartialMessage`] is the one non-fatal variant: it asks the
/// caller to supply more bytes and call the same parser again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("invalid or unknown request method")]
    BadMethod,

    #[error("invalid request target")]
    BadUri,

    #[error("invalid HTTP version")]
    BadVersion,

    /// Structurally invalid request (spacing, missing Host, ambiguous framing).
    #[error("malformed request")]
    BadRequest,

    #[error("invalid header field")]
    BadHeader,

    #[error("body does not match its framing")]
    BadBody,

    #[error("invalid Content-Length value")]
    BadContentLength,

    /// The parser already completed a transaction and cannot be reused.
    #[error("parser already completed a request")]
    StaleParser,

    #[error("incomplete message, more bytes required")]
    PartialMessage,

    /// Request head exceeded the configured size or header-count limit.
    #[error("request head too large")]
    SizeLimit,

    #[error("request body too large")]
    BodyLimit,

    #[error("receive buffer limit exceeded")]
    BufferOverflow,

    /// The caller broke the input contract (span shrank between calls).
    #[error("unparseable request")]
    GarbageRequest,
}

impl ParseError {
    /// Whether more input could turn this outcome into a request.
    pub fn is_partial(&self) -> bool {
        matches!(self, ParseError::PartialMessage)
    }

    /// Stable label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            ParseError::BadMethod => "bad_method",
            ParseError::BadUri => "bad_uri",
            ParseError::BadVersion => "bad_version",
            ParseError::BadRequest => "bad_request",
            ParseError::BadHeader => "bad_header",
            ParseError::BadBody => "bad_body",
            ParseError::BadContentLength => "bad_content_length",
            ParseError::StaleParser => "stale_parser",
            ParseError::PartialMessage => "partial_message",
            ParseError::SizeLimit => "size_limit",
            ParseError::BodyLimit => "body_limit",
            ParseError::BufferOverflow => "buffer_overflow",
            ParseError::GarbageRequest => "garbage_request",
        }
    }
}
