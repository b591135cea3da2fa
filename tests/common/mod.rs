//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use camille::config::ServerConfig;
use camille::http::{Handler, HttpServer};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

const IO_TIMEOUT: Duration = Duration::from_secs(5);

/// Loopback config on an ephemeral port.
pub fn test_config(workers: usize) -> ServerConfig {
    let mut config = ServerConfig::default();
    config.listener.host = "127.0.0.1".into();
    config.listener.port = 0;
    config.pool.workers = workers;
    config
}

/// Bind and run a server; it stops when dropped.
pub fn start_server<H: Handler>(config: ServerConfig, handler: H) -> HttpServer {
    let server = HttpServer::bind(config, handler).unwrap();
    server.run().unwrap();
    server
}

/// Raw TCP client that splits responses on `Content-Length`.
pub struct Client {
    stream: TcpStream,
    buffer: Vec<u8>,
}

/// One parsed response: status line + headers, and body.
#[derive(Debug)]
pub struct Response {
    pub head: String,
    pub body: Vec<u8>,
}

impl Response {
    pub fn status_line(&self) -> &str {
        self.head.lines().next().unwrap_or("")
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

impl Client {
    pub async fn connect(addr: SocketAddr) -> Self {
        let stream = timeout(IO_TIMEOUT, TcpStream::connect(addr))
            .await
            .unwrap()
            .unwrap();
        Self {
            stream,
            buffer: Vec::new(),
        }
    }

    pub async fn send(&mut self, bytes: &[u8]) {
        self.stream.write_all(bytes).await.unwrap();
    }

    /// Next response, or `None` if the server closed first.
    pub async fn response(&mut self) -> Option<Response> {
        loop {
            if let Some(end) = find(&self.buffer, b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&self.buffer[..end]).into_owned();
                let length = content_length(&head);
                let total = end + 4 + length;
                if self.buffer.len() >= total {
                    let body = self.buffer[end + 4..total].to_vec();
                    self.buffer.drain(..total);
                    return Some(Response { head, body });
                }
            }
            if self.read_more().await == 0 {
                return None;
            }
        }
    }

    /// Whether the server closes the connection without sending anything more.
    pub async fn closed(&mut self) -> bool {
        self.buffer.is_empty() && self.read_more().await == 0
    }

    async fn read_more(&mut self) -> usize {
        let mut chunk = [0u8; 4096];
        match timeout(IO_TIMEOUT, self.stream.read(&mut chunk)).await {
            Ok(Ok(n)) => {
                self.buffer.extend_from_slice(&chunk[..n]);
                n
            }
            Ok(Err(_)) => 0,
            Err(_) => panic!("no data from server within {:?}", IO_TIMEOUT),
        }
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn content_length(head: &str) -> usize {
    head.lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse().ok())
        .unwrap_or(0)
}

/// Poll `check` until it holds or the deadline passes.
pub async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    check()
}
