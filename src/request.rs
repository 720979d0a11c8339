//! Incoming HTTP request type.

use std::collections::HashMap;

use bytes::Bytes;

/// One HTTP request, parsed from the raw byte stream.
///
/// Built fresh for every request by [`parse_head`](crate::parse::parse_head),
/// completed with its body and path captures by the connection, handed to
/// exactly one handler and dropped once the response is on the wire.
#[derive(Debug, Default)]
pub struct Request {
    pub(crate) method: String,
    pub(crate) path: String,
    pub(crate) version: String,
    pub(crate) headers: HashMap<String, String>,
    pub(crate) content_length: Option<usize>,
    pub(crate) body: Option<Bytes>,
    pub(crate) captures: Vec<String>,
    pub(crate) params: HashMap<String, String>,
}

impl Request {
    pub fn method(&self) -> &str { &self.method }

    /// The raw request target, query string included.
    pub fn path(&self) -> &str { &self.path }

    /// The version after `HTTP/`, e.g. `"1.1"`.
    pub fn version(&self) -> &str { &self.version }

    /// All headers, names exactly as received. A repeated name keeps its last value.
    pub fn headers(&self) -> &HashMap<String, String> { &self.headers }

    /// Header lookup. Tries the exact name first, then falls back to an ASCII
    /// case-insensitive scan.
    pub fn header(&self, name: &str) -> Option<&str> {
        if let Some(value) = self.headers.get(name) {
            return Some(value);
        }
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The declared `Content-Length`, if any.
    pub fn content_length(&self) -> Option<usize> { self.content_length }

    /// The body bytes; empty for a bodyless request.
    pub fn body(&self) -> &[u8] {
        self.body.as_deref().unwrap_or_default()
    }

    /// The body as a shared buffer, `None` when the request declared no length.
    pub fn body_bytes(&self) -> Option<&Bytes> { self.body.as_ref() }

    /// Everything after the first `?` of the target.
    pub fn query(&self) -> Option<&str> {
        self.path.split_once('?').map(|(_, q)| q)
    }

    /// Positional captures of the matched route pattern: group 1 is at index 0.
    /// A group that did not take part in the match is an empty string.
    pub fn captures(&self) -> &[String] { &self.captures }

    pub fn capture(&self, index: usize) -> Option<&str> {
        self.captures.get(index).map(String::as_str)
    }

    /// Returns a named capture.
    ///
    /// For a route `^/users/(?P<id>\d+)$`, `req.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}
