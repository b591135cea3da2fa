//! Incremental HTTP/1.1 request parser.
//!
//! # Responsibilities
//! - Validate the request line, headers and body framing byte by byte
//! - Resume across calls when a request arrives in several reads
//! - Reject ambiguous framing (Content-Length together with Transfer-Encoding)
//!
//! # Design Decisions
//! - One parser per transaction; a completed parser answers `StaleParser`
//! - The caller passes the whole unconsumed span on every call; the parser
//!   keeps only an index into it, never a borrowed slice
//! - A token cut off by the end of the span is rescanned from its start on
//!   the next call
//! - Identity bodies must be fully buffered: the bytes after the head must
//!   match Content-Length exactly

use std::mem;

use crate::http::chars;
use crate::http::chunked::ChunkedDecoder;
use crate::http::error::ParseError;
use crate::http::method::Method;
use crate::http::request::Request;

/// Default cap on the decoded body.
pub const DEFAULT_MAX_BODY_SIZE: usize = 64 * 1024;
/// Default cap on request line plus headers.
pub const DEFAULT_MAX_HEAD_SIZE: usize = 8 * 1024;
/// Default cap on the number of header lines.
pub const DEFAULT_MAX_HEADERS: usize = 128;

/// Upper bound on Content-Length digits; 19 decimal digits always fit a u64.
const MAX_CONTENT_LENGTH_DIGITS: usize = 19;

type Step = Result<(), ParseError>;

/// Size limits applied while parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserLimits {
    pub max_body_size: usize,
    pub max_head_size: usize,
    pub max_headers: usize,
}

impl Default for ParserLimits {
    fn default() -> Self {
        Self {
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            max_head_size: DEFAULT_MAX_HEAD_SIZE,
            max_headers: DEFAULT_MAX_HEADERS,
        }
    }
}

/// Position of the parser in the request grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserState {
    Ready,
    Method,
    WaitUri,
    UriStart,
    Uri,
    WaitVersion,
    Version,
    HeadersWait,
    Headers,
    BodyIdentity,
    BodyChunked,
    Complete,
    Garbage,
}

impl ParserState {
    /// No further input can change the outcome.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ParserState::Complete | ParserState::Garbage)
    }

    pub fn is_body(&self) -> bool {
        matches!(self, ParserState::BodyIdentity | ParserState::BodyChunked)
    }
}

/// Single-use request parser.
#[derive(Debug)]
pub struct RequestParser {
    limits: ParserLimits,
    state: ParserState,
    cursor: usize,
    error: Option<ParseError>,
    request: Request,
    chunked: ChunkedDecoder,
}

impl Default for RequestParser {
    fn default() -> Self {
        Self::new(ParserLimits::default())
    }
}

impl RequestParser {
    pub fn new(limits: ParserLimits) -> Self {
        Self {
            limits,
            state: ParserState::Ready,
            cursor: 0,
            error: None,
            request: Request::new(),
            chunked: ChunkedDecoder::new(),
        }
    }

    pub fn state(&self) -> ParserState {
        self.state
    }

    pub fn limits(&self) -> &ParserLimits {
        &self.limits
    }

    /// A request was produced; every further call fails with `StaleParser`.
    pub fn is_used(&self) -> bool {
        self.state == ParserState::Complete
    }

    /// Bytes of the current span already accepted.
    pub fn consumed(&self) -> usize {
        self.cursor
    }

    /// Error recorded when the parser entered `Garbage`.
    pub fn error(&self) -> Option<ParseError> {
        self.error
    }

    /// The request assembled so far. Marked partial until completion.
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Parse the unconsumed span of one transaction.
    ///
    /// `input` must start at the first byte of the transaction and contain
    /// every byte passed on earlier calls. `Err(PartialMessage)` asks for the
    /// same span extended with more bytes; any other error is final.
    pub fn parse(&mut self, input: &[u8]) -> Result<Request, ParseError> {
        match self.state {
            ParserState::Complete => return Err(ParseError::StaleParser),
            ParserState::Garbage => {
                return Err(self.error.unwrap_or(ParseError::GarbageRequest));
            }
            _ => {}
        }
        if input.len() < self.cursor {
            return Err(self.fail(ParseError::GarbageRequest));
        }

        loop {
            let step = match self.state {
                ParserState::Ready => self.ready(input),
                ParserState::Method => self.method(input),
                ParserState::WaitUri => self.wait_uri(input),
                ParserState::UriStart => self.uri_start(input),
                ParserState::Uri => self.uri(input),
                ParserState::WaitVersion => self.wait_version(input),
                ParserState::Version => self.version(input),
                ParserState::HeadersWait => self.headers_wait(input),
                ParserState::Headers => self.headers(input),
                ParserState::BodyIdentity => self.body_identity(input),
                ParserState::BodyChunked => self.body_chunked(input),
                ParserState::Complete => return Ok(self.complete()),
                ParserState::Garbage => {
                    return Err(self.error.unwrap_or(ParseError::GarbageRequest));
                }
            };

            match step {
                Ok(()) => {}
                Err(ParseError::PartialMessage) => {
                    if self.in_head() && input.len() > self.limits.max_head_size {
                        return Err(self.fail(ParseError::SizeLimit));
                    }
                    return Err(ParseError::PartialMessage);
                }
                Err(err) => return Err(self.fail(err)),
            }
        }
    }

    fn in_head(&self) -> bool {
        !self.state.is_body() && !self.state.is_terminal()
    }

    fn fail(&mut self, err: ParseError) -> ParseError {
        self.state = ParserState::Garbage;
        self.error = Some(err);
        err
    }

    fn complete(&mut self) -> Request {
        self.request.finish(self.cursor);
        mem::take(&mut self.request)
    }

    /// Skip empty lines some clients send between pipelined requests.
    fn ready(&mut self, input: &[u8]) -> Step {
        loop {
            match &input[self.cursor..] {
                [] | [b'\r'] => return Err(ParseError::PartialMessage),
                [b'\r', b'\n', ..] => self.cursor += 2,
                _ => break,
            }
        }
        self.state = ParserState::Method;
        Ok(())
    }

    fn method(&mut self, input: &[u8]) -> Step {
        let start = self.cursor;
        let mut pos = start;
        while pos < input.len() {
            let b = input[pos];
            if b == b' ' {
                let method =
                    Method::from_bytes(&input[start..pos]).ok_or(ParseError::BadMethod)?;
                self.request.set_method(method);
                self.cursor = pos;
                self.state = ParserState::WaitUri;
                return Ok(());
            }
            if chars::is_control(b) || !chars::is_token(b) || pos - start >= Method::MAX_LEN {
                return Err(ParseError::BadMethod);
            }
            pos += 1;
        }
        Err(ParseError::PartialMessage)
    }

    fn wait_uri(&mut self, input: &[u8]) -> Step {
        self.single_space(input)?;
        self.state = ParserState::UriStart;
        Ok(())
    }

    fn uri_start(&mut self, input: &[u8]) -> Step {
        match input.get(self.cursor) {
            None => Err(ParseError::PartialMessage),
            Some(&b) if chars::is_slash(b) => {
                self.state = ParserState::Uri;
                Ok(())
            }
            Some(_) => Err(ParseError::BadUri),
        }
    }

    fn uri(&mut self, input: &[u8]) -> Step {
        let start = self.cursor;
        let mut pos = start;
        while pos < input.len() {
            let b = input[pos];
            match b {
                b' ' => {
                    self.request.set_path(ascii_string(&input[start..pos]));
                    self.cursor = pos;
                    self.state = ParserState::WaitVersion;
                    return Ok(());
                }
                b'%' => {
                    for offset in 1..=2 {
                        match input.get(pos + offset) {
                            None => return Err(ParseError::PartialMessage),
                            Some(&h) if chars::is_hex_digit(h) => {}
                            Some(_) => return Err(ParseError::BadUri),
                        }
                    }
                    pos += 3;
                }
                _ if chars::is_control(b) || !chars::is_uri_char(b) => {
                    return Err(ParseError::BadUri);
                }
                _ => pos += 1,
            }
        }
        Err(ParseError::PartialMessage)
    }

    fn wait_version(&mut self, input: &[u8]) -> Step {
        self.single_space(input)?;
        self.state = ParserState::Version;
        Ok(())
    }

    fn version(&mut self, input: &[u8]) -> Step {
        const PREFIX: &[u8] = b"HTTP/";
        const MAX_NUMBER_LEN: usize = 8;

        let start = self.cursor;
        for (offset, &expected) in PREFIX.iter().enumerate() {
            match input.get(start + offset) {
                None => return Err(ParseError::PartialMessage),
                Some(&b) if b == expected => {}
                Some(_) => return Err(ParseError::BadVersion),
            }
        }

        let number_start = start + PREFIX.len();
        let mut pos = number_start;
        loop {
            let b = *input.get(pos).ok_or(ParseError::PartialMessage)?;
            if chars::is_cr(b) {
                break;
            }
            if chars::is_control(b) || !(chars::is_digit(b) || b == b'.') {
                return Err(ParseError::BadVersion);
            }
            if pos - number_start >= MAX_NUMBER_LEN {
                return Err(ParseError::BadVersion);
            }
            pos += 1;
        }

        match &input[number_start..pos] {
            [b'1', b'.', minor] if chars::is_digit(*minor) => {}
            _ => return Err(ParseError::BadVersion),
        }

        self.request.set_version(ascii_string(&input[start..pos]));
        self.cursor = pos;
        self.state = ParserState::HeadersWait;
        Ok(())
    }

    fn headers_wait(&mut self, input: &[u8]) -> Step {
        match input.get(self.cursor + 1) {
            None => Err(ParseError::PartialMessage),
            Some(&b) if chars::is_lf(b) => {
                self.cursor += 2;
                self.state = ParserState::Headers;
                Ok(())
            }
            Some(_) => Err(ParseError::BadRequest),
        }
    }

    fn headers(&mut self, input: &[u8]) -> Step {
        loop {
            match &input[self.cursor..] {
                [] | [b'\r'] => return Err(ParseError::PartialMessage),
                [b'\r', b'\n', ..] => {
                    self.cursor += 2;
                    return self.end_of_head();
                }
                [b'\r', ..] => return Err(ParseError::BadHeader),
                _ => {}
            }

            let (name, value, next) = header_line(input, self.cursor)?;
            if self.request.headers().len() >= self.limits.max_headers {
                return Err(ParseError::SizeLimit);
            }
            self.request.add_header(name, value);
            self.cursor = next;
        }
    }

    /// Host and framing checks once the empty line has been seen.
    fn end_of_head(&mut self) -> Step {
        if self.cursor > self.limits.max_head_size {
            return Err(ParseError::SizeLimit);
        }

        let headers = self.request.headers();
        if headers.count("host") != 1 {
            return Err(ParseError::BadRequest);
        }

        let content_lengths = headers.count("content-length");
        let transfer_encodings = headers.count("transfer-encoding");
        if content_lengths > 0 && transfer_encodings > 0 {
            return Err(ParseError::BadRequest);
        }
        if content_lengths > 1 || transfer_encodings > 1 {
            return Err(ParseError::BadRequest);
        }

        if let Some(value) = headers.get("content-length") {
            let len = parse_content_length(value)?;
            if len > self.limits.max_body_size as u64 {
                return Err(ParseError::BadBody);
            }
            self.request.set_content_length(len);
            self.state = ParserState::BodyIdentity;
        } else if let Some(value) = headers.get("transfer-encoding") {
            if !value.trim().eq_ignore_ascii_case("chunked") {
                return Err(ParseError::BadRequest);
            }
            self.state = ParserState::BodyChunked;
        } else {
            self.state = ParserState::Complete;
        }
        Ok(())
    }

    fn body_identity(&mut self, input: &[u8]) -> Step {
        let available = input.len() - self.cursor;
        if available as u64 != self.request.content_length() {
            return Err(ParseError::BadBody);
        }
        self.request.extend_body(&input[self.cursor..]);
        self.cursor = input.len();
        self.state = ParserState::Complete;
        Ok(())
    }

    fn body_chunked(&mut self, input: &[u8]) -> Step {
        self.chunked
            .decode(input, &mut self.cursor, &mut self.request, &self.limits)?;
        self.request.set_content_length(self.chunked.decoded() as u64);
        self.state = ParserState::Complete;
        Ok(())
    }

    /// Exactly one SP at the cursor, not followed by another.
    fn single_space(&mut self, input: &[u8]) -> Step {
        match input.get(self.cursor) {
            None => return Err(ParseError::PartialMessage),
            Some(b' ') => {}
            Some(_) => return Err(ParseError::BadRequest),
        }
        match input.get(self.cursor + 1) {
            None => Err(ParseError::PartialMessage),
            Some(b' ') => Err(ParseError::BadRequest),
            Some(_) => {
                self.cursor += 1;
                Ok(())
            }
        }
    }
}

/// Parse one `name ":" [SP] value CRLF` line starting at `start`.
///
/// Returns the name, the value with trailing whitespace trimmed, and the
/// index just past the line's LF.
pub(crate) fn header_line(
    input: &[u8],
    start: usize,
) -> Result<(String, String, usize), ParseError> {
    let mut pos = start;
    loop {
        let b = *input.get(pos).ok_or(ParseError::PartialMessage)?;
        if b == b':' {
            break;
        }
        // Whitespace before the colon is rejected, never trimmed.
        if !chars::is_token(b) {
            return Err(ParseError::BadHeader);
        }
        pos += 1;
    }
    if pos == start {
        return Err(ParseError::BadHeader);
    }
    let name = ascii_string(&input[start..pos]);

    pos += 1;
    match input.get(pos) {
        None => return Err(ParseError::PartialMessage),
        Some(b' ') => pos += 1,
        Some(_) => {}
    }

    let value_start = pos;
    loop {
        let b = *input.get(pos).ok_or(ParseError::PartialMessage)?;
        if chars::is_cr(b) {
            break;
        }
        if !chars::is_header_value(b) {
            return Err(ParseError::BadHeader);
        }
        pos += 1;
    }

    let mut value_end = pos;
    while value_end > value_start && chars::is_space(input[value_end - 1]) {
        value_end -= 1;
    }
    let value = ascii_string(&input[value_start..value_end]);

    match input.get(pos + 1) {
        None => Err(ParseError::PartialMessage),
        Some(&b) if chars::is_lf(b) => Ok((name, value, pos + 2)),
        Some(_) => Err(ParseError::BadHeader),
    }
}

/// Framing of a transaction whose complete head declares a `Content-Length`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentityFrame {
    /// Leading empty lines, request line and headers, terminator included.
    pub head_len: usize,
    /// The declared body length.
    pub body_len: u64,
}

impl IdentityFrame {
    /// Head plus body, when it fits in memory.
    pub fn total(&self) -> Option<usize> {
        usize::try_from(self.body_len)
            .ok()?
            .checked_add(self.head_len)
    }
}

/// Locate the identity body of the transaction at the start of `input`.
///
/// Identity bodies are matched exactly against the span given to
/// [`RequestParser::parse`]. A caller holding pipelined or still-arriving
/// bytes uses this to cut the span where the body ends. Header lines are read
/// with the same rules as the parser, so a value the parser would reject
/// yields `None`.
pub fn identity_frame(input: &[u8]) -> Option<IdentityFrame> {
    let mut pos = 0;
    while input[pos..].starts_with(b"\r\n") {
        pos += 2;
    }
    pos += input[pos..].windows(2).position(|w| w == b"\r\n")? + 2;

    let mut declared = None;
    while !input[pos..].starts_with(b"\r\n") {
        let (name, value, next) = header_line(input, pos).ok()?;
        if declared.is_none() && name.eq_ignore_ascii_case("content-length") {
            declared = Some(value);
        }
        pos = next;
    }
    let body_len = parse_content_length(&declared?).ok()?;

    Some(IdentityFrame {
        head_len: pos + 2,
        body_len,
    })
}

/// Decimal Content-Length with an explicit overflow bound.
fn parse_content_length(value: &str) -> Result<u64, ParseError> {
    let digits = value.as_bytes();
    if digits.is_empty() || digits.len() > MAX_CONTENT_LENGTH_DIGITS {
        return Err(ParseError::BadContentLength);
    }
    let mut len: u64 = 0;
    for &b in digits {
        if !chars::is_digit(b) {
            return Err(ParseError::BadContentLength);
        }
        len = len
            .checked_mul(10)
            .and_then(|v| v.checked_add(u64::from(b - b'0')))
            .ok_or(ParseError::BadContentLength)?;
    }
    Ok(len)
}

/// Bytes already validated as ASCII by the character tables.
fn ascii_string(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> Result<Request, ParseError> {
        RequestParser::default().parse(input.as_bytes())
    }

    #[test]
    fn simple_get() {
        let req = parse("GET / HTTP/1.1\r\nHost: localhost:8085\r\n\r\n").unwrap();
        assert_eq!(req.method(), Method::Get);
        assert_eq!(req.path(), "/");
        assert_eq!(req.version(), "HTTP/1.1");
        assert_eq!(req.host(), "localhost");
        assert_eq!(req.port(), "8085");
        assert!(req.body().is_empty());
        assert!(!req.is_partial());
        assert_eq!(req.size(), 40);
    }

    #[test]
    fn post_with_content_length() {
        let req = parse("POST /x HTTP/1.1\r\nHost: a\r\nContent-Length: 5\r\n\r\nhello").unwrap();
        assert_eq!(req.method(), Method::Post);
        assert_eq!(req.body(), b"hello");
        assert_eq!(req.content_length(), 5);
    }

    #[test]
    fn both_framing_headers_rejected() {
        let err = parse(
            "POST /x HTTP/1.1\r\nHost: a\r\nContent-Length: 5\r\nTransfer-Encoding: chunked\r\n\r\n",
        )
        .unwrap_err();
        assert_eq!(err, ParseError::BadRequest);

        let err = parse(
            "POST /x HTTP/1.1\r\nTransfer-Encoding: chunked\r\nHost: a\r\nContent-Length: 0\r\n\r\n",
        )
        .unwrap_err();
        assert_eq!(err, ParseError::BadRequest);
    }

    #[test]
    fn duplicate_framing_headers_rejected() {
        let err = parse(
            "POST /x HTTP/1.1\r\nHost: a\r\nContent-Length: 5\r\nContent-Length: 5\r\n\r\nhello",
        )
        .unwrap_err();
        assert_eq!(err, ParseError::BadRequest);
    }

    #[test]
    fn unknown_transfer_encoding_rejected() {
        let err = parse("POST /x HTTP/1.1\r\nHost: a\r\nTransfer-Encoding: identity\r\n\r\n")
            .unwrap_err();
        assert_eq!(err, ParseError::BadRequest);
    }

    #[test]
    fn truncated_percent_escape_is_bad_uri() {
        assert_eq!(
            parse("GET /a%2 HTTP/1.1\r\nHost: a\r\n\r\n").unwrap_err(),
            ParseError::BadUri
        );
        assert_eq!(
            parse("GET /a%zz HTTP/1.1\r\nHost: a\r\n\r\n").unwrap_err(),
            ParseError::BadUri
        );
        assert_eq!(
            parse("GET /a% HTTP/1.1\r\nHost: a\r\n\r\n").unwrap_err(),
            ParseError::BadUri
        );
        let req = parse("GET /a%2F?q=1&b=%41 HTTP/1.1\r\nHost: a\r\n\r\n").unwrap();
        assert_eq!(req.path(), "/a%2F?q=1&b=%41");
    }

    #[test]
    fn partial_then_complete() {
        let mut parser = RequestParser::default();
        let mut buf = b"GET / HTTP/1.1\r\nHost: a\r\n".to_vec();
        assert_eq!(parser.parse(&buf).unwrap_err(), ParseError::PartialMessage);
        assert_eq!(parser.state(), ParserState::Headers);
        assert!(parser.request().is_partial());

        buf.extend_from_slice(b"\r\n");
        let req = parser.parse(&buf).unwrap();
        assert_eq!(req.path(), "/");
        assert_eq!(req.host(), "a");
    }

    #[test]
    fn every_split_point_converges() {
        let whole = b"GET /p?x=%20 HTTP/1.1\r\nHost: h:1\r\nAccept: */*\r\n\r\n";
        let expected = RequestParser::default().parse(whole).unwrap();

        for split in 1..whole.len() {
            let mut parser = RequestParser::default();
            assert_eq!(
                parser.parse(&whole[..split]).unwrap_err(),
                ParseError::PartialMessage,
                "split at {split}"
            );
            let req = parser.parse(whole).unwrap();
            assert_eq!(req, expected, "split at {split}");
        }
    }

    #[test]
    fn completed_parser_is_stale() {
        let mut parser = RequestParser::default();
        let input = b"GET / HTTP/1.1\r\nHost: a\r\n\r\n";
        parser.parse(input).unwrap();
        assert!(parser.is_used());
        assert_eq!(parser.parse(input).unwrap_err(), ParseError::StaleParser);
        assert_eq!(parser.parse(b"").unwrap_err(), ParseError::StaleParser);
    }

    #[test]
    fn garbage_is_sticky() {
        let mut parser = RequestParser::default();
        assert_eq!(parser.parse(b"BREW / HTTP/1.1\r\n").unwrap_err(), ParseError::BadMethod);
        assert_eq!(parser.state(), ParserState::Garbage);
        assert_eq!(parser.parse(b"GET / HTTP/1.1\r\n").unwrap_err(), ParseError::BadMethod);
    }

    #[test]
    fn missing_host_rejected() {
        for method in ["GET", "HEAD", "POST", "DELETE", "OPTIONS"] {
            let input = format!("{method} /a HTTP/1.1\r\n\r\n");
            assert_eq!(parse(&input).unwrap_err(), ParseError::BadRequest);
        }
        assert_eq!(
            parse("GET / HTTP/1.1\r\nAccept: x\r\n\r\n").unwrap_err(),
            ParseError::BadRequest
        );
        assert_eq!(
            parse("GET / HTTP/1.1\r\nHost: a\r\nHost: b\r\n\r\n").unwrap_err(),
            ParseError::BadRequest
        );
    }

    #[test]
    fn body_must_match_content_length() {
        let head = "POST /x HTTP/1.1\r\nHost: a\r\nContent-Length: 5\r\n\r\n";
        assert!(parse(&format!("{head}hello")).is_ok());
        assert_eq!(parse(&format!("{head}hell")).unwrap_err(), ParseError::BadBody);
        assert_eq!(parse(&format!("{head}hello!")).unwrap_err(), ParseError::BadBody);
    }

    #[test]
    fn content_length_validation() {
        let make = |len: &str| format!("POST / HTTP/1.1\r\nHost: a\r\nContent-Length: {len}\r\n\r\n");
        assert_eq!(parse(&make("5a")).unwrap_err(), ParseError::BadContentLength);
        assert_eq!(parse(&make("-1")).unwrap_err(), ParseError::BadContentLength);
        assert_eq!(
            parse(&make("99999999999999999999999")).unwrap_err(),
            ParseError::BadContentLength
        );
        assert_eq!(parse(&make("70000")).unwrap_err(), ParseError::BadBody);
        let req = parse(&make("0")).unwrap();
        assert!(req.body().is_empty());
    }

    #[test]
    fn method_validation() {
        assert_eq!(parse("get / HTTP/1.1\r\nHost: a\r\n\r\n").unwrap_err(), ParseError::BadMethod);
        assert_eq!(parse("GETTING / HTTP/1.1\r\n").unwrap_err(), ParseError::BadMethod);
        assert_eq!(parse("G\x01T / HTTP/1.1\r\n").unwrap_err(), ParseError::BadMethod);
        assert_eq!(parse(" / HTTP/1.1\r\n").unwrap_err(), ParseError::BadMethod);
        assert_eq!(parse("GE").unwrap_err(), ParseError::PartialMessage);
    }

    #[test]
    fn request_line_spacing() {
        assert_eq!(parse("GET  / HTTP/1.1\r\n").unwrap_err(), ParseError::BadRequest);
        assert_eq!(parse("GET /  HTTP/1.1\r\n").unwrap_err(), ParseError::BadRequest);
        assert_eq!(parse("GET x HTTP/1.1\r\n").unwrap_err(), ParseError::BadUri);
        assert_eq!(parse("GET /a\"b HTTP/1.1\r\n").unwrap_err(), ParseError::BadUri);
    }

    #[test]
    fn version_validation() {
        assert_eq!(parse("GET / HTTP/2.0\r\n").unwrap_err(), ParseError::BadVersion);
        assert_eq!(parse("GET / HTTX/1.1\r\n").unwrap_err(), ParseError::BadVersion);
        assert_eq!(parse("GET / HTTP/1.x\r\n").unwrap_err(), ParseError::BadVersion);
        assert_eq!(parse("GET / HTTP/\r\n").unwrap_err(), ParseError::BadVersion);
        assert_eq!(parse("GET / HTTP/1.1\rX").unwrap_err(), ParseError::BadRequest);
        let req = parse("GET / HTTP/1.0\r\nHost: a\r\n\r\n").unwrap();
        assert_eq!(req.version(), "HTTP/1.0");
    }

    #[test]
    fn whitespace_before_colon_rejected() {
        assert_eq!(
            parse("GET / HTTP/1.1\r\nHost : a\r\n\r\n").unwrap_err(),
            ParseError::BadHeader
        );
        assert_eq!(
            parse("GET / HTTP/1.1\r\nHost: a\r\nContent-Length\t: 0\r\n\r\n").unwrap_err(),
            ParseError::BadHeader
        );
        assert_eq!(
            parse("GET / HTTP/1.1\r\nHost: a\r\n folded\r\n\r\n").unwrap_err(),
            ParseError::BadHeader
        );
    }

    #[test]
    fn header_value_rules() {
        let req = parse("GET / HTTP/1.1\r\nHost: a\r\nX-A: \tv  x \t \r\nX-B:raw\r\n\r\n").unwrap();
        assert_eq!(req.header("x-a"), Some("\tv  x"));
        assert_eq!(req.header("X-B"), Some("raw"));

        assert_eq!(
            parse("GET / HTTP/1.1\r\nHost: a\r\nX-A: bad\x01\r\n\r\n").unwrap_err(),
            ParseError::BadHeader
        );
        assert_eq!(
            parse("GET / HTTP/1.1\r\nHost: a\r\nX-A: v\rX\r\n\r\n").unwrap_err(),
            ParseError::BadHeader
        );
        assert_eq!(
            parse("GET / HTTP/1.1\r\nHost: a\r\nX-A: caf\u{e9}\r\n\r\n").unwrap_err(),
            ParseError::BadHeader
        );
    }

    #[test]
    fn header_order_preserved() {
        let req = parse("GET / HTTP/1.1\r\nHost: a\r\nB: 2\r\nA: 1\r\nB: 3\r\n\r\n").unwrap();
        let names: Vec<_> = req.headers().iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["Host", "B", "A", "B"]);
        assert_eq!(req.header("b"), None);
    }

    #[test]
    fn head_size_limit() {
        let limits = ParserLimits {
            max_head_size: 64,
            ..ParserLimits::default()
        };
        let mut parser = RequestParser::new(limits);
        let long = format!("GET /{} HTTP/1.1\r\n", "a".repeat(100));
        assert_eq!(parser.parse(long.as_bytes()).unwrap_err(), ParseError::SizeLimit);
    }

    #[test]
    fn header_count_limit() {
        let limits = ParserLimits {
            max_headers: 2,
            ..ParserLimits::default()
        };
        let mut parser = RequestParser::new(limits);
        let input = b"GET / HTTP/1.1\r\nHost: a\r\nA: 1\r\nB: 2\r\n\r\n";
        assert_eq!(parser.parse(input).unwrap_err(), ParseError::SizeLimit);
    }

    #[test]
    fn pipelined_bytes_left_unconsumed() {
        let first = b"GET /1 HTTP/1.1\r\nHost: a\r\n\r\n";
        let mut input = first.to_vec();
        input.extend_from_slice(b"GET /2 HTTP/1.1\r\nHost: a\r\n\r\n");

        let req = RequestParser::default().parse(&input).unwrap();
        assert_eq!(req.path(), "/1");
        assert_eq!(req.size(), first.len());

        let req = RequestParser::default().parse(&input[first.len()..]).unwrap();
        assert_eq!(req.path(), "/2");
    }

    #[test]
    fn leading_empty_lines_skipped() {
        let req = parse("\r\n\r\nGET / HTTP/1.1\r\nHost: a\r\n\r\n").unwrap();
        assert_eq!(req.method(), Method::Get);
    }

    #[test]
    fn shrinking_span_is_garbage() {
        let mut parser = RequestParser::default();
        let buf = b"GET / HTTP/1.1\r\nHost: a\r\n";
        assert_eq!(parser.parse(buf).unwrap_err(), ParseError::PartialMessage);
        assert_eq!(parser.parse(b"\r\n").unwrap_err(), ParseError::GarbageRequest);
    }

    #[test]
    fn chunked_body() {
        let req = parse(
            "POST /c HTTP/1.1\r\nHost: a\r\nTransfer-Encoding: chunked\r\n\r\n\
             5\r\nhello\r\n6;ext=1\r\n world\r\n0\r\n\r\n",
        )
        .unwrap();
        assert_eq!(req.body(), b"hello world");
        assert_eq!(req.content_length(), 11);
    }

    #[test]
    fn identity_frame_cuts_pipelined_span() {
        let first = b"POST /p HTTP/1.1\r\nHost: a\r\ncontent-length: 3\r\n\r\nabc";
        let mut input = first.to_vec();
        input.extend_from_slice(b"GET /next HTTP/1.1\r\nHost: a\r\n\r\n");

        let span = identity_frame(&input).unwrap().total().unwrap();
        assert_eq!(span, first.len());
        let req = RequestParser::default().parse(&input[..span]).unwrap();
        assert_eq!(req.body(), b"abc");
        assert_eq!(req.size(), span);
    }

    #[test]
    fn identity_frame_needs_complete_head_and_length() {
        assert_eq!(identity_frame(b"POST / HTTP/1.1\r\nContent-Length: 3\r\n"), None);
        assert_eq!(identity_frame(b"GET / HTTP/1.1\r\nHost: a\r\n\r\n"), None);
        assert_eq!(identity_frame(b"POST / HTTP/1.1\r\nContent-Length: x\r\n\r\n"), None);
        assert_eq!(
            identity_frame(b"\r\nPOST / HTTP/1.1\r\nContent-Length: 10\r\n\r\n"),
            Some(IdentityFrame {
                head_len: 2 + 39,
                body_len: 10
            })
        );
    }

    #[test]
    fn identity_frame_reads_values_like_the_parser() {
        let padded = b"POST / HTTP/1.1\r\nHost: a\r\nContent-Length: 2 \t\r\n\r\nhi";
        assert_eq!(identity_frame(padded).unwrap().body_len, 2);
        assert_eq!(RequestParser::default().parse(padded).unwrap().body(), b"hi");

        let indented = b"POST / HTTP/1.1\r\nHost: a\r\nContent-Length:  2\r\n\r\nhi";
        assert_eq!(identity_frame(indented), None);
        assert_eq!(
            RequestParser::default().parse(indented).unwrap_err(),
            ParseError::BadContentLength
        );
    }

    #[test]
    fn identity_frame_reports_oversized_declaration() {
        let frame = identity_frame(b"POST / HTTP/1.1\r\nHost: a\r\nContent-Length: 70000\r\n\r\n")
            .unwrap();
        assert_eq!(frame.body_len, 70000);
        assert_eq!(frame.head_len, 51);
    }
}
