//! The response sink handed to handlers, plus typed helpers for filling it.
//!
//! A handler owns the bytes that go back on the wire. It may write them raw
//! through [`std::io::Write`], or build a [`Response`] and [`send`] it, which
//! encodes the status line, `content-length`, headers and body for it.
//!
//! [`send`]: ResponseWriter::send

use std::io;

use crate::status::Status;

/// Body media types for [`ResponseBuilder::bytes`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContentType {
    Csv,
    EventStream,
    FormData,
    Html,
    Json,
    OctetStream,
    Text,
    Xml,
}

impl ContentType {
    pub const fn mime(self) -> &'static str {
        match self {
            Self::Csv => "text/csv",
            Self::EventStream => "text/event-stream",
            Self::FormData => "application/x-www-form-urlencoded",
            Self::Html => "text/html; charset=utf-8",
            Self::Json => "application/json",
            Self::OctetStream => "application/octet-stream",
            Self::Text => "text/plain; charset=utf-8",
            Self::Xml => "application/xml",
        }
    }
}

/// Accumulates the bytes of one response.
///
/// The connection writes out exactly what the handler put here, nothing more.
/// Writing into the in-memory buffer cannot fail.
///
/// ```rust
/// use std::io::Write;
/// use wicket::{Request, Response, ResponseWriter};
///
/// fn raw(out: &mut ResponseWriter, _req: &Request) {
///     let _ = out.write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 2\r\n\r\nok");
/// }
///
/// fn typed(out: &mut ResponseWriter, _req: &Request) {
///     out.send(Response::text("ok"));
/// }
/// ```
#[derive(Debug, Default)]
pub struct ResponseWriter {
    buf: Vec<u8>,
}

impl ResponseWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encodes a complete response and appends it.
    pub fn send(&mut self, response: impl IntoResponse) {
        response.into_response().encode(&mut self.buf);
    }

    /// Appends raw bytes.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub(crate) fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

impl io::Write for ResponseWriter {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(bytes);
        Ok(bytes.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A status, optional typed body and extra headers, encoded on [`send`].
///
/// ```rust
/// use wicket::{ContentType, Response, Status};
///
/// Response::json(br#"{"id":1}"#.to_vec());
/// Response::text("hello");
/// Response::status(Status::NoContent);
///
/// Response::builder()
///     .status(Status::Created)
///     .header("location", "/users/42")
///     .json(br#"{"id":42}"#.to_vec());
///
/// Response::builder().bytes(ContentType::Xml, b"<ok/>".to_vec());
/// ```
///
/// [`send`]: ResponseWriter::send
#[derive(Debug)]
pub struct Response {
    status: Status,
    content_type: Option<ContentType>,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl Response {
    /// `200 OK` with an `application/json` body.
    pub fn json(body: Vec<u8>) -> Self {
        Self::builder().json(body)
    }

    /// `200 OK` with a `text/plain` body.
    pub fn text(body: impl Into<String>) -> Self {
        Self::builder().text(body)
    }

    pub fn status(code: Status) -> Self {
        Self::builder().status(code).no_body()
    }

    pub fn builder() -> ResponseBuilder {
        ResponseBuilder {
            inner: Self { status: Status::Ok, content_type: None, headers: Vec::new(), body: Vec::new() },
        }
    }

    pub fn status_code(&self) -> Status {
        self.status
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Appends the wire form: status line, `content-length`, `content-type`
    /// when there is a typed body, extra headers in insertion order, body.
    pub(crate) fn encode(&self, out: &mut Vec<u8>) {
        use io::Write as _;

        out.reserve(self.body.len() + 128);
        // Writes into a Vec are infallible.
        let _ = write!(
            out,
            "HTTP/1.1 {} {}\r\ncontent-length: {}\r\n",
            self.status.code(),
            self.status.reason(),
            self.body.len(),
        );
        if let Some(content_type) = self.content_type {
            let _ = write!(out, "content-type: {}\r\n", content_type.mime());
        }
        for (name, value) in &self.headers {
            let _ = write!(out, "{name}: {value}\r\n");
        }
        out.extend_from_slice(b"\r\n");
        out.extend_from_slice(&self.body);
    }
}

/// Chained construction of a [`Response`]; starts at `200 OK` and ends with
/// one of the body methods.
pub struct ResponseBuilder {
    inner: Response,
}

impl ResponseBuilder {
    pub fn status(mut self, code: Status) -> Self {
        self.inner.status = code;
        self
    }

    /// Adds a header line. `content-length` is always computed; do not set it here.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.inner.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    pub fn json(self, body: Vec<u8>) -> Response {
        self.bytes(ContentType::Json, body)
    }

    pub fn text(self, body: impl Into<String>) -> Response {
        self.bytes(ContentType::Text, body.into().into_bytes())
    }

    pub fn bytes(mut self, content_type: ContentType, body: Vec<u8>) -> Response {
        self.inner.content_type = Some(content_type);
        self.inner.body = body;
        self.inner
    }

    /// Ends with an empty body and no `content-type`.
    pub fn no_body(self) -> Response {
        self.inner
    }
}

/// Anything [`ResponseWriter::send`] accepts.
pub trait IntoResponse {
    fn into_response(self) -> Response;
}

impl IntoResponse for Response {
    fn into_response(self) -> Response {
        self
    }
}

impl IntoResponse for &'static str {
    fn into_response(self) -> Response {
        Response::text(self)
    }
}

impl IntoResponse for String {
    fn into_response(self) -> Response {
        Response::text(self)
    }
}

impl IntoResponse for Status {
    fn into_response(self) -> Response {
        Response::status(self)
    }
}
