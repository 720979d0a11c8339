//! Request head parsing.
//!
//! Pure functions over byte buffers: [`find_head_end`] locates the blank line
//! closing the header block in a growing buffer, [`check_request_line`] vets
//! the first line early, [`parse_head`] turns the block into a [`Request`].
//! None of them touch the socket, so the connection can call them on whatever
//! the transport has delivered so far.

use std::collections::HashMap;

use crate::request::Request;

const TERMINATOR: &[u8] = b"\r\n\r\n";

/// Why a header block could not be turned into a [`Request`].
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("request head is not valid UTF-8")]
    NotUtf8,

    #[error("malformed request line")]
    MalformedRequestLine,

    #[error("invalid Content-Length: {0:?}")]
    InvalidContentLength(String),
}

/// Returns the offset just past the first `\r\n\r\n` in `buf`, scanning from
/// `from`. Callers pass back how far they already looked so a slow client does
/// not cost a rescan of the whole buffer on every read.
pub fn find_head_end(buf: &[u8], from: usize) -> Option<usize> {
    let start = from.min(buf.len());
    buf[start..]
        .windows(TERMINATOR.len())
        .position(|w| w == TERMINATOR)
        .map(|pos| start + pos + TERMINATOR.len())
}

/// Parses a complete header block, terminator included or not.
///
/// The request line must read `METHOD SP TARGET SP HTTP/VERSION` with all
/// three parts non-empty. Header lines follow as `NAME: VALUE`; the first line
/// that is not of that shape ends the block and everything after it is
/// ignored. Names are kept exactly as sent and a repeated name keeps its last
/// value. A `Content-Length` header (matched ASCII case-insensitively) must
/// hold an unsigned integer.
pub fn parse_head(head: &[u8]) -> Result<Request, ParseError> {
    let text = std::str::from_utf8(head).map_err(|_| ParseError::NotUtf8)?;
    let mut lines = text.split('\n').map(|line| line.strip_suffix('\r').unwrap_or(line));

    let (method, path, version) = lines
        .next()
        .and_then(request_line)
        .ok_or(ParseError::MalformedRequestLine)?;

    let mut headers = HashMap::new();
    for line in lines {
        let Some((name, value)) = line.split_once(':') else { break };
        let value = value.strip_prefix(' ').unwrap_or(value);
        headers.insert(name.to_owned(), value.to_owned());
    }

    let mut request = Request {
        method: method.to_owned(),
        path: path.to_owned(),
        version: version.to_owned(),
        headers,
        ..Request::default()
    };

    if let Some(raw) = request.header("Content-Length") {
        let length = raw
            .trim()
            .parse::<usize>()
            .map_err(|_| ParseError::InvalidContentLength(raw.to_owned()))?;
        request.content_length = Some(length);
    }

    Ok(request)
}

/// Validates the request line as soon as it is complete, before the rest of
/// the head has arrived. Returns `None` while `buf` holds no line feed yet.
pub fn check_request_line(buf: &[u8]) -> Option<Result<(), ParseError>> {
    let end = buf.iter().position(|&b| b == b'\n')?;
    let line = &buf[..end];
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    let checked = std::str::from_utf8(line)
        .map_err(|_| ParseError::NotUtf8)
        .and_then(|line| request_line(line).map(|_| ()).ok_or(ParseError::MalformedRequestLine));
    Some(checked)
}

/// Length of the empty lines (`\r\n` or bare `\n`) at the start of `buf`.
/// Stray line breaks between requests are skipped, not parsed.
pub fn leading_blank_lines(buf: &[u8]) -> usize {
    let mut at = 0;
    loop {
        match &buf[at..] {
            [b'\r', b'\n', ..] => at += 2,
            [b'\n', ..] => at += 1,
            _ => return at,
        }
    }
}

fn request_line(line: &str) -> Option<(&str, &str, &str)> {
    let mut parts = line.split(' ');
    let method = parts.next()?;
    let path = parts.next()?;
    let version = parts.next()?.strip_prefix("HTTP/")?;
    if parts.next().is_some() || method.is_empty() || path.is_empty() || version.is_empty() {
        return None;
    }
    Some((method, path, version))
}
