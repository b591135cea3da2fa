//! Chunked transfer-coding decoder (RFC 7230 §4.1).
//!
//! Works on the same accumulated span as the request parser. Each unit (a
//! size line, a chunk's data with its CRLF, a trailer line) is consumed
//! whole or not at all, so an incomplete unit is rescanned on the next call.

use crate::http::chars;
use crate::http::error::ParseError;
use crate::http::parser::{header_line, ParserLimits};
use crate::http::request::Request;

/// Sixteen hex digits already exceed any sane body limit.
const MAX_CHUNK_SIZE_DIGITS: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChunkState {
    /// At the start of a `chunk-size [; ext] CRLF` line.
    Size,
    /// At the start of `size` data bytes followed by CRLF.
    Data { size: usize },
    /// After the last chunk, reading trailer fields until the empty line.
    Trailers,
}

#[derive(Debug)]
pub(crate) struct ChunkedDecoder {
    state: ChunkState,
    decoded: usize,
    trailers: usize,
}

impl ChunkedDecoder {
    pub(crate) fn new() -> Self {
        Self {
            state: ChunkState::Size,
            decoded: 0,
            trailers: 0,
        }
    }

    /// Total body bytes decoded so far.
    pub(crate) fn decoded(&self) -> usize {
        self.decoded
    }

    /// Decode from `*cursor`, appending chunk data to the request body.
    ///
    /// Returns `Ok(())` once the terminating empty line has been consumed.
    pub(crate) fn decode(
        &mut self,
        input: &[u8],
        cursor: &mut usize,
        request: &mut Request,
        limits: &ParserLimits,
    ) -> Result<(), ParseError> {
        loop {
            match self.state {
                ChunkState::Size => {
                    let (size, next) = size_line(input, *cursor)?;
                    if size > (limits.max_body_size - self.decoded) as u64 {
                        return Err(ParseError::BodyLimit);
                    }
                    *cursor = next;
                    self.state = if size == 0 {
                        ChunkState::Trailers
                    } else {
                        ChunkState::Data {
                            size: size as usize,
                        }
                    };
                }
                ChunkState::Data { size } => {
                    let end = *cursor + size;
                    if input.len() < end + 2 {
                        return Err(ParseError::PartialMessage);
                    }
                    if &input[end..end + 2] != b"\r\n" {
                        return Err(ParseError::BadBody);
                    }
                    request.extend_body(&input[*cursor..end]);
                    self.decoded += size;
                    *cursor = end + 2;
                    self.state = ChunkState::Size;
                }
                ChunkState::Trailers => match &input[*cursor..] {
                    [] | [b'\r'] => return Err(ParseError::PartialMessage),
                    [b'\r', b'\n', ..] => {
                        *cursor += 2;
                        return Ok(());
                    }
                    _ => {
                        // Trailer fields are validated, then dropped.
                        let (_, _, next) = header_line(input, *cursor).map_err(|err| match err {
                            ParseError::PartialMessage => err,
                            _ => ParseError::BadBody,
                        })?;
                        self.trailers += 1;
                        if self.trailers > limits.max_headers {
                            return Err(ParseError::SizeLimit);
                        }
                        *cursor = next;
                    }
                },
            }
        }
    }
}

/// Parse a chunk-size line at `start`, ignoring any extensions.
fn size_line(input: &[u8], start: usize) -> Result<(u64, usize), ParseError> {
    let mut pos = start;
    let mut size: u64 = 0;
    while let Some(digit) = input.get(pos).and_then(|&b| chars::hex_value(b)) {
        if pos - start >= MAX_CHUNK_SIZE_DIGITS {
            return Err(ParseError::BodyLimit);
        }
        size = (size << 4) | u64::from(digit);
        pos += 1;
    }
    if pos == input.len() {
        return Err(ParseError::PartialMessage);
    }
    if pos == start {
        return Err(ParseError::BadBody);
    }

    // Only an extension (`;name[=value]`) or whitespace may follow the size.
    if !matches!(input[pos], b'\r' | b';' | b' ' | b'\t') {
        return Err(ParseError::BadBody);
    }
    loop {
        let b = *input.get(pos).ok_or(ParseError::PartialMessage)?;
        if chars::is_cr(b) {
            break;
        }
        if chars::is_control(b) && b != b'\t' {
            return Err(ParseError::BadBody);
        }
        pos += 1;
    }

    match input.get(pos + 1) {
        None => Err(ParseError::PartialMessage),
        Some(&b) if chars::is_lf(b) => Ok((size, pos + 2)),
        Some(_) => Err(ParseError::BadBody),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(body: &[u8], limits: &ParserLimits) -> Result<(Vec<u8>, usize), ParseError> {
        let mut decoder = ChunkedDecoder::new();
        let mut request = Request::new();
        let mut cursor = 0;
        decoder.decode(body, &mut cursor, &mut request, limits)?;
        Ok((request.body().to_vec(), cursor))
    }

    #[test]
    fn decodes_chunks_and_extensions() {
        let body = b"4\r\nWiki\r\n5;name=val\r\npedia\r\nE\r\n in\r\n\r\nchunks.\r\n0\r\n\r\n";
        let (decoded, used) = decode_all(body, &ParserLimits::default()).unwrap();
        assert_eq!(decoded, b"Wikipedia in\r\n\r\nchunks.");
        assert_eq!(used, body.len());
    }

    #[test]
    fn trailers_are_discarded() {
        let body = b"3\r\nabc\r\n0\r\nExpires: never\r\nX-Sum: 1\r\n\r\n";
        let (decoded, used) = decode_all(body, &ParserLimits::default()).unwrap();
        assert_eq!(decoded, b"abc");
        assert_eq!(used, body.len());
    }

    #[test]
    fn stops_at_terminator() {
        let body = b"1\r\na\r\n0\r\n\r\nGET / HTTP/1.1\r\n";
        let (_, used) = decode_all(body, &ParserLimits::default()).unwrap();
        assert_eq!(used, 11);
    }

    #[test]
    fn resumes_after_partial_chunk() {
        let limits = ParserLimits::default();
        let full = b"5\r\nhello\r\n3\r\nabc\r\n0\r\n\r\n";
        let mut decoder = ChunkedDecoder::new();
        let mut request = Request::new();
        let mut cursor = 0;

        let err = decoder
            .decode(&full[..12], &mut cursor, &mut request, &limits)
            .unwrap_err();
        assert_eq!(err, ParseError::PartialMessage);
        assert_eq!(request.body(), b"hello");

        decoder.decode(full, &mut cursor, &mut request, &limits).unwrap();
        assert_eq!(request.body(), b"helloabc");
        assert_eq!(decoder.decoded(), 8);
    }

    #[test]
    fn aggregate_limit_enforced() {
        let limits = ParserLimits {
            max_body_size: 8,
            ..ParserLimits::default()
        };
        let body = b"5\r\nhello\r\n5\r\nworld\r\n0\r\n\r\n";
        assert_eq!(decode_all(body, &limits).unwrap_err(), ParseError::BodyLimit);
        assert_eq!(
            decode_all(b"fffffffffffffffff\r\n", &limits).unwrap_err(),
            ParseError::BodyLimit
        );
    }

    #[test]
    fn malformed_framing() {
        let limits = ParserLimits::default();
        assert_eq!(decode_all(b"x\r\n", &limits).unwrap_err(), ParseError::BadBody);
        assert_eq!(decode_all(b"3\r\nabcX\r\n", &limits).unwrap_err(), ParseError::BadBody);
        assert_eq!(decode_all(b"3z\r\nabc\r\n", &limits).unwrap_err(), ParseError::BadBody);
        assert_eq!(
            decode_all(b"0\r\nBad Trailer: x\r\n\r\n", &limits).unwrap_err(),
            ParseError::BadBody
        );
    }
}
