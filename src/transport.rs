//! Plaintext and TLS transports behind one capability.
//!
//! The connection pipeline only needs a byte stream it can read from and
//! write to. An [`Acceptor`] turns a freshly accepted TCP socket into such a
//! stream, running whatever handshake the transport requires first. A failed
//! handshake discards the socket before the pipeline ever sees it.

use std::future::Future;
use std::io;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

/// Upgrades accepted sockets into the stream the pipeline runs over.
pub trait Acceptor: Clone + Send + Sync + 'static {
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    /// URL scheme served by this transport, for logs.
    const SCHEME: &'static str;

    fn accept(&self, tcp: TcpStream) -> impl Future<Output = io::Result<Self::Stream>> + Send;
}

/// Raw TCP, no handshake.
#[derive(Clone, Copy, Debug, Default)]
pub struct PlainAcceptor;

impl Acceptor for PlainAcceptor {
    type Stream = TcpStream;

    const SCHEME: &'static str = "http";

    async fn accept(&self, tcp: TcpStream) -> io::Result<TcpStream> {
        Ok(tcp)
    }
}

/// TLS over TCP. The server-side handshake completes inside [`accept`](Acceptor::accept).
#[derive(Clone)]
pub struct TlsAcceptor {
    inner: tokio_rustls::TlsAcceptor,
}

impl TlsAcceptor {
    pub fn new(config: rustls::ServerConfig) -> Self {
        Self { inner: tokio_rustls::TlsAcceptor::from(Arc::new(config)) }
    }
}

impl Acceptor for TlsAcceptor {
    type Stream = tokio_rustls::server::TlsStream<TcpStream>;

    const SCHEME: &'static str = "https";

    async fn accept(&self, tcp: TcpStream) -> io::Result<Self::Stream> {
        self.inner.accept(tcp).await
    }
}
