//! The request record built by the parser.
//!
//! # Responsibilities
//! - Hold the decoded request line, headers and body of one transaction
//! - Expose header lookup that refuses to pick between duplicates
//! - Derive host/port from the mandatory `Host` header
//!
//! # Design Decisions
//! - Fields are written by the parser only; consumers get read access
//! - Path is kept raw (no percent-decoding)
//! - A duplicated header name is ambiguous, so `get` answers `None`

use crate::http::method::Method;

/// Ordered header list. Duplicate names are stored as received.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn append(&mut self, name: String, value: String) {
        self.entries.push((name, value));
    }

    /// Value of a header that occurs exactly once (case-insensitive name).
    ///
    /// Returns `None` when the header is missing *or* repeated.
    pub fn get(&self, name: &str) -> Option<&str> {
        let mut found = None;
        for (key, value) in &self.entries {
            if key.eq_ignore_ascii_case(name) {
                if found.is_some() {
                    return None;
                }
                found = Some(value.as_str());
            }
        }
        found
    }

    /// Every value recorded for `name`, in arrival order.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.entries
            .iter()
            .filter(move |(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Number of occurrences of `name`.
    pub fn count(&self, name: &str) -> usize {
        self.get_all(name).count()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.count(name) > 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One HTTP/1.x request transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Request {
    method: Method,
    path: String,
    version: String,
    host: String,
    port: String,
    headers: Headers,
    body: Vec<u8>,
    content_length: u64,
    size: usize,
    is_partial: bool,
    has_auth: bool,
}

impl Request {
    pub(crate) fn new() -> Self {
        Self {
            is_partial: true,
            ..Self::default()
        }
    }

    pub fn method(&self) -> Method {
        self.method
    }

    /// Raw request target, always starting with `/`.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// `"HTTP/1.0"` or `"HTTP/1.1"`.
    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Port part of the `Host` header; empty when the header has none.
    pub fn port(&self) -> &str {
        &self.port
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Shorthand for `headers().get(name)`.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Declared (identity) or decoded (chunked) body length.
    pub fn content_length(&self) -> u64 {
        self.content_length
    }

    /// Bytes of input consumed by this transaction.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_partial(&self) -> bool {
        self.is_partial
    }

    pub fn has_auth(&self) -> bool {
        self.has_auth
    }

    /// Set by authentication layers; the parser never touches it.
    pub fn set_has_auth(&mut self, has_auth: bool) {
        self.has_auth = has_auth;
    }

    /// Whether the connection may carry another request after this one.
    pub fn keep_alive(&self) -> bool {
        let connection = self.headers.get("connection");
        let has_token = |token: &str| {
            connection
                .map(|v| v.split(',').any(|t| t.trim().eq_ignore_ascii_case(token)))
                .unwrap_or(false)
        };
        if self.version == "HTTP/1.0" {
            has_token("keep-alive")
        } else {
            !has_token("close")
        }
    }

    pub(crate) fn set_method(&mut self, method: Method) {
        self.method = method;
    }

    pub(crate) fn set_path(&mut self, path: String) {
        self.path = path;
    }

    pub(crate) fn set_version(&mut self, version: String) {
        self.version = version;
    }

    /// Record a header; `Host` is split into host and port on the way in.
    pub(crate) fn add_header(&mut self, name: String, value: String) {
        if name.eq_ignore_ascii_case("host") {
            match value.split_once(':') {
                Some((host, port)) => {
                    self.host = host.to_string();
                    self.port = port.to_string();
                }
                None => {
                    self.host = value.clone();
                    self.port = String::new();
                }
            }
        }
        self.headers.append(name, value);
    }

    pub(crate) fn extend_body(&mut self, bytes: &[u8]) {
        self.body.extend_from_slice(bytes);
    }

    pub(crate) fn set_content_length(&mut self, len: u64) {
        self.content_length = len;
    }

    pub(crate) fn finish(&mut self, size: usize) {
        self.size = size;
        self.is_partial = false;
    }
}
