//! Byte classification tables for the request parser.
//!
//! Every predicate is a single lookup into a 256-entry table built at compile
//! time. The tables are plain `const` data, so concurrent readers never need
//! synchronization.

/// ASCII 0-31 and 127.
const CONTROL: u8 = 1 << 0;
/// Method and header-name characters (RFC 7230 `tchar`).
const TOKEN: u8 = 1 << 1;
/// Characters allowed verbatim in a request path.
const URI: u8 = 1 << 2;
/// Visible ASCII plus horizontal tab.
const HEADER_VALUE: u8 = 1 << 3;
const DIGIT: u8 = 1 << 4;
const HEX: u8 = 1 << 5;
const UPPER: u8 = 1 << 6;
const SPACE: u8 = 1 << 7;

const TOKEN_SYMBOLS: &[u8] = b"!#$%&'*+-.^_`|~";
const URI_RESERVED: &[u8] = b"?#&=";
const URI_UNRESERVED: &[u8] = b"-._~";
const URI_GENERIC: &[u8] = b"!$'()*+,;:@";

const fn mark(table: &mut [u8; 256], symbols: &[u8], class: u8) {
    let mut i = 0;
    while i < symbols.len() {
        table[symbols[i] as usize] |= class;
        i += 1;
    }
}

const fn build() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut b = 0usize;
    while b < 256 {
        let c = b as u8;
        if c <= 31 || c == 127 {
            table[b] |= CONTROL;
        }
        if c.is_ascii_alphanumeric() {
            table[b] |= TOKEN | URI;
        }
        if c.is_ascii_digit() {
            table[b] |= DIGIT;
        }
        if c.is_ascii_hexdigit() {
            table[b] |= HEX;
        }
        if c.is_ascii_uppercase() {
            table[b] |= UPPER;
        }
        if (c >= 32 && c <= 126) || c == b'\t' {
            table[b] |= HEADER_VALUE;
        }
        if c == b' ' || c == b'\t' {
            table[b] |= SPACE;
        }
        b += 1;
    }
    mark(&mut table, TOKEN_SYMBOLS, TOKEN);
    mark(&mut table, URI_RESERVED, URI);
    mark(&mut table, URI_UNRESERVED, URI);
    mark(&mut table, URI_GENERIC, URI);
    mark(&mut table, b"/", URI);
    table
}

static TABLE: [u8; 256] = build();

#[inline]
fn has(byte: u8, class: u8) -> bool {
    TABLE[byte as usize] & class != 0
}

#[inline]
pub fn is_control(byte: u8) -> bool {
    has(byte, CONTROL)
}

/// Space or horizontal tab.
#[inline]
pub fn is_space(byte: u8) -> bool {
    has(byte, SPACE)
}

#[inline]
pub fn is_digit(byte: u8) -> bool {
    has(byte, DIGIT)
}

#[inline]
pub fn is_hex_digit(byte: u8) -> bool {
    has(byte, HEX)
}

#[inline]
pub fn is_upper(byte: u8) -> bool {
    has(byte, UPPER)
}

#[inline]
pub fn is_slash(byte: u8) -> bool {
    byte == b'/'
}

#[inline]
pub fn is_cr(byte: u8) -> bool {
    byte == b'\r'
}

#[inline]
pub fn is_lf(byte: u8) -> bool {
    byte == b'\n'
}

/// Valid in a method name or a header field name.
#[inline]
pub fn is_token(byte: u8) -> bool {
    has(byte, TOKEN)
}

/// Valid verbatim in a path. `%` is not included: escapes are checked by the
/// parser as whole triplets.
#[inline]
pub fn is_uri_char(byte: u8) -> bool {
    has(byte, URI)
}

#[inline]
pub fn is_header_value(byte: u8) -> bool {
    has(byte, HEADER_VALUE)
}

/// Value of a hex digit, `None` for anything else.
#[inline]
pub fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}
