//! Per-connection request pipeline.
//!
//! Each accepted socket runs one [`Connection`], a small state machine:
//!
//! ```text
//! AwaitingHeaders ─▶ HeadersReceived ─┬─▶ AwaitingBody ─┐
//!        ▲                            └────────────────┴─▶ Ready ─▶ Responding ─┐
//!        └──────────────────────────── keep-alive ─────────────────────────────┘
//!                       any I/O error, peer close, or fatal reply ─▶ Closed
//! ```
//!
//! Only one request is in flight at a time: the next head is not read until
//! the previous response is fully written. Bytes that arrive ahead of time
//! (the start of a body, or of the next request) stay in the read buffer and
//! are consumed by the state that owns them.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::watch;
use tracing::{debug, trace, warn};

use crate::config::Limits;
use crate::parse::{self, ParseError};
use crate::request::Request;
use crate::response::{Response, ResponseWriter};
use crate::router::{Lookup, RouteTable};
use crate::status::Status;

const READ_CHUNK: usize = 4096;

#[derive(Debug)]
pub(crate) enum State {
    AwaitingHeaders,
    /// A complete head occupies the first `head_len` bytes of the buffer.
    HeadersReceived { head_len: usize },
    AwaitingBody { request: Request, content_length: usize },
    /// Fully assembled; the next step matches and invokes a handler.
    Ready(Request),
    Responding { bytes: Vec<u8>, keep_alive: bool },
    Closed,
}

impl State {
    fn name(&self) -> &'static str {
        match self {
            Self::AwaitingHeaders => "awaiting_headers",
            Self::HeadersReceived { .. } => "headers_received",
            Self::AwaitingBody { .. } => "awaiting_body",
            Self::Ready(_) => "ready",
            Self::Responding { .. } => "responding",
            Self::Closed => "closed",
        }
    }
}

pub(crate) struct Connection<S> {
    stream: S,
    buf: BytesMut,
    /// How far `buf` has been searched for the head terminator.
    scanned: usize,
    line_checked: bool,
    routes: Arc<RouteTable>,
    limits: Limits,
    shutdown: watch::Receiver<bool>,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub(crate) fn new(
        stream: S,
        routes: Arc<RouteTable>,
        limits: Limits,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            stream,
            buf: BytesMut::with_capacity(READ_CHUNK),
            scanned: 0,
            line_checked: false,
            routes,
            limits,
            shutdown,
        }
    }

    /// Drives the pipeline until the connection closes.
    pub(crate) async fn run(mut self) {
        let mut state = State::AwaitingHeaders;
        while !matches!(state, State::Closed) {
            state = self.step(state).await;
            trace!(state = state.name(), "pipeline transition");
        }
    }

    pub(crate) async fn step(&mut self, state: State) -> State {
        match state {
            State::AwaitingHeaders => self.await_headers().await,
            State::HeadersReceived { head_len } => self.parse_head(head_len),
            State::AwaitingBody { request, content_length } => {
                self.await_body(request, content_length).await
            }
            State::Ready(request) => self.dispatch(request),
            State::Responding { bytes, keep_alive } => self.respond(bytes, keep_alive).await,
            State::Closed => State::Closed,
        }
    }

    async fn await_headers(&mut self) -> State {
        loop {
            if !self.line_checked {
                let blank = parse::leading_blank_lines(&self.buf);
                if blank > 0 {
                    self.buf.advance(blank);
                    self.scanned = 0;
                }
            }
            if let Some(head_len) = parse::find_head_end(&self.buf, self.scanned) {
                self.scanned = 0;
                self.line_checked = false;
                if head_len > self.limits.max_header_bytes {
                    return reject(Status::RequestHeaderFieldsTooLarge);
                }
                return State::HeadersReceived { head_len };
            }
            if self.buf.len() > self.limits.max_header_bytes {
                debug!(buffered = self.buf.len(), "header block too large");
                return reject(Status::RequestHeaderFieldsTooLarge);
            }
            if !self.line_checked {
                match parse::check_request_line(&self.buf) {
                    Some(Ok(())) => self.line_checked = true,
                    Some(Err(e)) => return malformed(&e),
                    None => {}
                }
            }
            self.scanned = self.buf.len().saturating_sub(3);

            let read = if self.buf.is_empty() {
                // Idle between requests: the only point where shutdown may cut in.
                let stopping = *self.shutdown.borrow();
                if stopping {
                    return State::Closed;
                }
                tokio::select! {
                    res = read_more(&mut self.stream, &mut self.buf, self.limits.read_timeout) => res,
                    _ = self.shutdown.changed() => return State::Closed,
                }
            } else {
                read_more(&mut self.stream, &mut self.buf, self.limits.read_timeout).await
            };

            match read {
                Ok(0) => {
                    debug!(buffered = self.buf.len(), "peer closed");
                    return State::Closed;
                }
                Ok(_) => {}
                Err(e) => {
                    debug!(error = %e, "read failed");
                    return State::Closed;
                }
            }
        }
    }

    fn parse_head(&mut self, head_len: usize) -> State {
        let head = self.buf.split_to(head_len);
        match parse::parse_head(&head) {
            Ok(request) => match request.content_length {
                Some(len) if len > self.limits.max_body_bytes => {
                    debug!(content_length = len, "declared body too large");
                    reject(Status::ContentTooLarge)
                }
                Some(len) => State::AwaitingBody { request, content_length: len },
                None => State::Ready(request),
            },
            Err(e) => malformed(&e),
        }
    }

    async fn await_body(&mut self, mut request: Request, content_length: usize) -> State {
        // Lookahead from the head read already counts toward the body.
        if self.buf.len() < content_length {
            self.buf.reserve(content_length - self.buf.len());
        }
        while self.buf.len() < content_length {
            match read_more(&mut self.stream, &mut self.buf, self.limits.read_timeout).await {
                Ok(0) => {
                    debug!(expected = content_length, got = self.buf.len(), "peer closed mid-body");
                    return State::Closed;
                }
                Ok(_) => {}
                Err(e) => {
                    debug!(error = %e, "body read failed");
                    return State::Closed;
                }
            }
        }
        request.body = Some(self.buf.split_to(content_length).freeze());
        State::Ready(request)
    }

    fn dispatch(&self, mut request: Request) -> State {
        match self.routes.lookup(&request.method, &request.path) {
            Lookup::Found { handler, captures, params } => {
                request.captures = captures;
                request.params = params;
                let mut out = ResponseWriter::new();
                handler.call(&mut out, &request);
                if out.is_empty() {
                    warn!(method = %request.method, path = %request.path, "handler wrote no response");
                }
                State::Responding { bytes: out.into_bytes(), keep_alive: true }
            }
            Lookup::MethodNotAllowed { allowed } => {
                debug!(method = %request.method, path = %request.path, "method not allowed");
                let response = Response::builder()
                    .status(Status::MethodNotAllowed)
                    .header("allow", &allowed.join(", "))
                    .no_body();
                State::Responding { bytes: encode(&response), keep_alive: true }
            }
            Lookup::NotFound => {
                debug!(method = %request.method, path = %request.path, "no route");
                State::Responding { bytes: encode(&Response::status(Status::NotFound)), keep_alive: true }
            }
        }
    }

    async fn respond(&mut self, bytes: Vec<u8>, keep_alive: bool) -> State {
        if !bytes.is_empty() {
            if let Err(e) = write_out(&mut self.stream, &bytes).await {
                debug!(error = %e, "write failed");
                return State::Closed;
            }
        }
        if keep_alive {
            State::AwaitingHeaders
        } else {
            let _ = self.stream.shutdown().await;
            State::Closed
        }
    }
}

async fn read_more<S>(stream: &mut S, buf: &mut BytesMut, timeout: Option<Duration>) -> io::Result<usize>
where
    S: AsyncRead + Unpin,
{
    if buf.capacity() - buf.len() < READ_CHUNK {
        buf.reserve(READ_CHUNK);
    }
    match timeout {
        Some(limit) => tokio::time::timeout(limit, stream.read_buf(buf))
            .await
            .map_err(|_| io::Error::from(io::ErrorKind::TimedOut))?,
        None => stream.read_buf(buf).await,
    }
}

async fn write_out<S>(stream: &mut S, bytes: &[u8]) -> io::Result<()>
where
    S: AsyncWrite + Unpin,
{
    stream.write_all(bytes).await?;
    stream.flush().await
}

fn encode(response: &Response) -> Vec<u8> {
    let mut out = Vec::new();
    response.encode(&mut out);
    out
}

fn malformed(e: &ParseError) -> State {
    debug!(error = %e, "malformed request");
    reject(Status::BadRequest)
}

/// A terminal error reply: the connection closes once it is written.
fn reject(status: Status) -> State {
    let response = Response::builder().status(status).header("connection", "close").no_body();
    State::Responding { bytes: encode(&response), keep_alive: false }
}
