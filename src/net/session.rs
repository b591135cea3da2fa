//! Per-connection read/parse/respond loop.
//!
//! # Responsibilities
//! - Read from the socket under a deadline into a growable buffer
//! - Feed the unconsumed buffer to a fresh parser per transaction
//! - Hand completed requests to the handler and write its output back
//! - Classify and log whatever ends the connection
//!
//! # Design Decisions
//! - The session is a task that owns its socket and buffer outright
//! - Bytes left over after a request are parsed before reading again
//! - A rejected request closes the connection without a response

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::http::error::ParseError;
use crate::http::handler::Handler;
use crate::http::parser::{identity_frame, ParserLimits, RequestParser};
use crate::http::request::Request;
use crate::net::connection::ConnectionGuard;
use crate::net::error::SessionError;
use crate::observability::metrics;

/// Bytes requested from the socket per read.
const READ_CHUNK: usize = 8 * 1024;

pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_REQUESTS: usize = 200;

/// Per-session knobs, shared by every connection of a server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    pub limits: ParserLimits,
    /// Requests served on one connection before it is closed.
    pub max_requests: usize,
}

impl SessionSettings {
    /// Receive buffer ceiling: one full head plus one full body.
    pub fn max_buffer(&self) -> usize {
        self.limits.max_head_size + self.limits.max_body_size
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            read_timeout: DEFAULT_READ_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            limits: ParserLimits::default(),
            max_requests: DEFAULT_MAX_REQUESTS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitingRequest,
    ParsingBody,
    RequestReady,
    Responding,
}

/// One accepted connection.
pub struct Session {
    stream: TcpStream,
    peer: SocketAddr,
    guard: ConnectionGuard,
    settings: SessionSettings,
    handler: Arc<dyn Handler>,
    buffer: Vec<u8>,
    parser: RequestParser,
    state: SessionState,
    requests: usize,
    bytes_read: usize,
    bytes_written: usize,
}

impl Session {
    pub fn new(
        stream: TcpStream,
        peer: SocketAddr,
        guard: ConnectionGuard,
        settings: SessionSettings,
        handler: Arc<dyn Handler>,
    ) -> Self {
        Self {
            stream,
            peer,
            guard,
            settings,
            handler,
            buffer: Vec::with_capacity(READ_CHUNK),
            parser: RequestParser::new(settings.limits),
            state: SessionState::AwaitingRequest,
            requests: 0,
            bytes_read: 0,
            bytes_written: 0,
        }
    }

    /// Serve the connection until it closes, then log why.
    pub async fn run(mut self) {
        tracing::debug!(
            connection_id = %self.guard.id(),
            peer = %self.peer,
            "Session started"
        );

        let outcome = self.serve().await;
        if let Err(error) = self.stream.shutdown().await {
            tracing::trace!(connection_id = %self.guard.id(), %error, "Socket shutdown failed");
        }

        let reason = match &outcome {
            Ok(()) => "complete",
            Err(error) => error.reason(),
        };
        metrics::record_session_closed(reason);
        self.log_close(outcome);
    }

    async fn serve(&mut self) -> Result<(), SessionError> {
        loop {
            if let Some(span) = self.ready_span() {
                match self.parser.parse(&self.buffer[..span]) {
                    Ok(request) => {
                        self.buffer.drain(..request.size());
                        self.parser = RequestParser::new(self.settings.limits);
                        self.requests += 1;
                        if self.requests > self.settings.max_requests {
                            return Err(SessionError::QuotaExceeded);
                        }
                        if !self.respond(request).await? {
                            return Ok(());
                        }
                        self.state = SessionState::AwaitingRequest;
                        continue;
                    }
                    Err(ParseError::PartialMessage) => {
                        if self.parser.state().is_body() {
                            self.state = SessionState::ParsingBody;
                        }
                    }
                    Err(error) => {
                        metrics::record_parse_error(error);
                        return Err(SessionError::Parse(error));
                    }
                }
            }

            if self.buffer.len() > self.settings.max_buffer() {
                metrics::record_parse_error(ParseError::BufferOverflow);
                return Err(SessionError::Parse(ParseError::BufferOverflow));
            }
            self.fill().await?;
        }
    }

    /// How much of the buffer to hand the parser, or `None` to read first.
    ///
    /// An identity body is only presented once it has fully arrived, and
    /// never together with the bytes of a following request.
    fn ready_span(&mut self) -> Option<usize> {
        if self.buffer.is_empty() {
            return None;
        }
        let Some(frame) = identity_frame(&self.buffer) else {
            return Some(self.buffer.len());
        };
        // The parser rejects an oversized declaration from the head alone.
        if frame.body_len > self.settings.limits.max_body_size as u64 {
            return Some(self.buffer.len());
        }
        match frame.total() {
            Some(len) if len <= self.buffer.len() => Some(len),
            Some(_) => {
                // A short body is all a sound head can fail on; anything else
                // goes to the real parser now instead of waiting.
                match RequestParser::new(self.settings.limits).parse(&self.buffer) {
                    Err(ParseError::BadBody) => {
                        self.state = SessionState::ParsingBody;
                        None
                    }
                    _ => Some(self.buffer.len()),
                }
            }
            None => Some(self.buffer.len()),
        }
    }

    /// Append one read's worth of bytes to the buffer.
    async fn fill(&mut self) -> Result<(), SessionError> {
        let mut chunk = [0u8; READ_CHUNK];
        let n = match timeout(self.settings.read_timeout, self.stream.read(&mut chunk)).await {
            Err(_) => return Err(SessionError::Timeout),
            Ok(result) => result?,
        };
        if n == 0 {
            return Err(SessionError::RemoteClosed);
        }
        self.buffer.extend_from_slice(&chunk[..n]);
        self.bytes_read += n;
        Ok(())
    }

    /// Run the handler and write its output. Returns whether to keep going.
    async fn respond(&mut self, request: Request) -> Result<bool, SessionError> {
        self.state = SessionState::RequestReady;
        metrics::record_request(request.method());
        tracing::debug!(
            connection_id = %self.guard.id(),
            method = %request.method(),
            path = request.path(),
            size = request.size(),
            "Request parsed"
        );

        let keep_alive = request.keep_alive();
        if let Some(output) = self.handler.handle(&request) {
            self.state = SessionState::Responding;
            match timeout(self.settings.write_timeout, self.stream.write_all(&output)).await {
                Err(_) => return Err(SessionError::Timeout),
                Ok(result) => result?,
            }
            self.bytes_written += output.len();
        }
        Ok(keep_alive)
    }

    fn log_close(&self, outcome: Result<(), SessionError>) {
        let id = self.guard.id();
        let peer = self.peer;
        let (requests, bytes_read, bytes_written) = (self.requests, self.bytes_read, self.bytes_written);

        match outcome {
            Ok(()) => tracing::debug!(
                connection_id = %id, peer = %peer, requests, bytes_read, bytes_written,
                "Session closed"
            ),
            Err(SessionError::RemoteClosed) => tracing::debug!(
                connection_id = %id, peer = %peer, requests, bytes_read, bytes_written,
                "Peer closed connection"
            ),
            Err(SessionError::Timeout) => tracing::warn!(
                connection_id = %id, peer = %peer, requests, bytes_read, state = ?self.state,
                "Session timed out"
            ),
            Err(SessionError::ConnectionReset) => tracing::warn!(
                connection_id = %id, peer = %peer, requests, bytes_read, bytes_written,
                "Connection reset by peer"
            ),
            Err(SessionError::QuotaExceeded) => tracing::info!(
                connection_id = %id, peer = %peer, requests = self.settings.max_requests,
                "Request quota reached, closing connection"
            ),
            Err(SessionError::Parse(error)) => tracing::warn!(
                connection_id = %id, peer = %peer, kind = error.as_str(), bytes_read, state = ?self.state,
                "Rejected request: {}", error
            ),
            Err(SessionError::Io(error)) => tracing::error!(
                connection_id = %id, peer = %peer, %error, bytes_read, bytes_written, state = ?self.state,
                "Session I/O failure"
            ),
        }
    }
}
