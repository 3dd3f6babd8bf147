use std::fmt;

use crate::http::request::RequestLine;

/// Longest request line accepted, terminator included.
pub const MAX_REQUEST_LINE: usize = 8 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The peer closed the connection or sent an empty line.
    Empty,
    /// Fewer than two space separated tokens.
    TooFewTokens(String),
    /// No line terminator within `MAX_REQUEST_LINE` bytes.
    TooLong,
    InvalidUtf8,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Empty => write!(f, "empty request"),
            ParseError::TooFewTokens(line) => write!(f, "invalid request: {line}"),
            ParseError::TooLong => write!(f, "request line exceeds {MAX_REQUEST_LINE} bytes"),
            ParseError::InvalidUtf8 => write!(f, "request line is not valid UTF-8"),
        }
    }
}

impl std::error::Error for ParseError {}

/// Splits a request line on single spaces.
///
/// Runs of spaces produce empty tokens (so `"GET  /"` has an empty path),
/// while trailing empty tokens are dropped before counting.
pub fn parse_request_line(line: &str) -> Result<RequestLine, ParseError> {
    if line.is_empty() {
        return Err(ParseError::Empty);
    }

    let mut parts: Vec<&str> = line.split(' ').collect();
    while parts.last().is_some_and(|p| p.is_empty()) {
        parts.pop();
    }

    if parts.len() < 2 {
        return Err(ParseError::TooFewTokens(line.to_string()));
    }

    Ok(RequestLine::new(
        parts[0],
        parts[1],
        parts.get(2).copied().unwrap_or_default(),
    ))
}

/// Returns the index of the first `\n` in `buf`, if any.
pub fn find_line_end(buf: &[u8]) -> Option<usize> {
    buf.iter().position(|&b| b == b'\n')
}

/// Decodes a raw line, dropping a trailing `\r`.
pub fn decode_line(raw: &[u8]) -> Result<&str, ParseError> {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    std::str::from_utf8(raw).map_err(|_| ParseError::InvalidUtf8)
}
