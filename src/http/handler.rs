//! Request handler capability.
//!
//! The session hands every completed request to a [`Handler`] and writes
//! whatever bytes it returns. Response building and routing live outside
//! this crate; [`Echo`] exists so the binary answers something useful.

use std::fmt::Write as _;

use crate::http::request::Request;

/// Produces the raw response bytes for one request.
///
/// Returning `None` writes nothing; the connection then follows the
/// request's keep-alive semantics as usual.
pub trait Handler: Send + Sync + 'static {
    fn handle(&self, request: &Request) -> Option<Vec<u8>>;
}

impl<F> Handler for F
where
    F: Fn(&Request) -> Option<Vec<u8>> + Send + Sync + 'static,
{
    fn handle(&self, request: &Request) -> Option<Vec<u8>> {
        self(request)
    }
}

/// Answers `200 OK` with a plain-text summary of the request followed by
/// its body.
#[derive(Debug, Clone, Copy, Default)]
pub struct Echo;

impl Handler for Echo {
    fn handle(&self, request: &Request) -> Option<Vec<u8>> {
        let mut summary = String::new();
        // Writing into a String cannot fail.
        let _ = writeln!(summary, "{} {} {}", request.method(), request.path(), request.version());
        for (name, value) in request.headers().iter() {
            let _ = writeln!(summary, "{}: {}", name, value);
        }
        summary.push('\n');

        let mut payload = summary.into_bytes();
        payload.extend_from_slice(request.body());

        let connection = if request.keep_alive() { "keep-alive" } else { "close" };
        let mut response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: text/plain; charset=utf-8\r\nContent-Length: {}\r\nConnection: {}\r\n\r\n",
            payload.len(),
            connection
        )
        .into_bytes();
        response.extend_from_slice(&payload);
        Some(response)
    }
}
