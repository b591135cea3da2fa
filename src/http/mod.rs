//! HTTP/1.1 protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! Session receive buffer
//!     → parser.rs (request line, headers, framing decision)
//!     → chunked.rs (chunked transfer-coding, when announced)
//!     → request.rs (completed Request handed out by value)
//!     → handler.rs (caller-supplied response bytes)
//!     → written back by the session
//! ```
//!
//! # Design Decisions
//! - The parser is hand-rolled over byte lookup tables (chars.rs)
//! - A parser instance serves exactly one transaction
//! - Ambiguous framing (CL + TE, repeated CL/TE/Host) is rejected outright

pub mod chars;
mod chunked;
pub mod error;
pub mod handler;
pub mod method;
pub mod parser;
pub mod request;
pub mod server;

pub use error::ParseError;
pub use handler::{Echo, Handler};
pub use method::Method;
pub use parser::{ParserLimits, ParserState, RequestParser};
pub use request::{Headers, Request};
pub use server::HttpServer;
