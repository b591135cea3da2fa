//! HTTP/1.1 server front end.
//!
//! An acceptor hands connections round-robin to a pool of worker threads,
//! each driving its own single-threaded reactor. Every connection runs a
//! session that incrementally parses requests and answers them through a
//! [`Handler`](http::Handler).

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;

pub use config::ServerConfig;
pub use http::{Echo, Handler, HttpServer, Request};
pub use lifecycle::Shutdown;
