#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use rustls::pki_types::ServerName;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use wicket::{Router, Server, ServerConfig};

/// A server on an ephemeral loopback port, stopped on [`TestServer::stop`].
pub struct TestServer {
    pub addr: SocketAddr,
    stop: Option<oneshot::Sender<()>>,
    task: JoinHandle<Result<(), wicket::Error>>,
}

impl TestServer {
    pub async fn start(router: Router) -> Self {
        Self::start_with(ServerConfig::bind("127.0.0.1:0").unwrap(), router).await
    }

    pub async fn start_with(config: ServerConfig, router: Router) -> Self {
        let listening = Server::new(config).listen(router).await.unwrap();
        let addr = listening.local_addr().unwrap();
        let (stop, stopped) = oneshot::channel::<()>();
        let task = tokio::spawn(listening.serve_until(async move {
            let _ = stopped.await;
        }));
        Self { addr, stop: Some(stop), task }
    }

    pub async fn connect(&self) -> Client {
        Client::new(TcpStream::connect(self.addr).await.unwrap())
    }

    pub async fn connect_tls(&self) -> Client<tokio_rustls::client::TlsStream<TcpStream>> {
        let tcp = TcpStream::connect(self.addr).await.unwrap();
        let name = ServerName::try_from("localhost").unwrap();
        Client::new(tls_connector().connect(name, tcp).await.unwrap())
    }

    pub async fn stop(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        self.task.await.unwrap().unwrap();
    }
}

pub fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

/// A config serving `tests/fixtures/server.pem`, issued for `localhost` by
/// `tests/fixtures/ca.pem`.
pub fn tls_config() -> ServerConfig {
    ServerConfig::bind("127.0.0.1:0")
        .unwrap()
        .with_tls(fixture("server.pem"), fixture("server.key"))
}

/// A client connector trusting only the fixture CA.
pub fn tls_connector() -> tokio_rustls::TlsConnector {
    let pem = std::fs::read(fixture("ca.pem")).unwrap();
    let mut roots = rustls::RootCertStore::empty();
    for cert in rustls_pemfile::certs(&mut pem.as_slice()) {
        roots.add(cert.unwrap()).unwrap();
    }
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let config = rustls::ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .unwrap()
        .with_root_certificates(roots)
        .with_no_client_auth();
    tokio_rustls::TlsConnector::from(Arc::new(config))
}

/// A raw HTTP/1.1 client that understands just enough framing to split
/// `content-length` delimited responses.
pub struct Client<S = TcpStream> {
    io: S,
    pending: Vec<u8>,
}

pub struct Reply {
    pub status: u16,
    pub head: String,
    pub body: Vec<u8>,
}

impl Reply {
    pub fn body_text(&self) -> &str {
        std::str::from_utf8(&self.body).unwrap()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.head.lines().skip(1).find_map(|line| {
            let (k, v) = line.split_once(':')?;
            k.eq_ignore_ascii_case(name).then(|| v.trim())
        })
    }
}

impl<S> Client<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(io: S) -> Self {
        Self { io, pending: Vec::new() }
    }

    pub async fn send(&mut self, bytes: &[u8]) {
        self.io.write_all(bytes).await.unwrap();
    }

    pub async fn reply(&mut self) -> Reply {
        let mut chunk = [0u8; 4096];
        loop {
            if let Some(end) = find(&self.pending, b"\r\n\r\n") {
                let head = String::from_utf8(self.pending[..end].to_vec()).unwrap();
                let status = head.split(' ').nth(1).unwrap().parse().unwrap();
                let length = head
                    .lines()
                    .find_map(|l| {
                        let (k, v) = l.split_once(':')?;
                        k.eq_ignore_ascii_case("content-length").then(|| v.trim().parse::<usize>().unwrap())
                    })
                    .unwrap_or(0);
                let total = end + 4 + length;
                if self.pending.len() >= total {
                    let rest = self.pending.split_off(total);
                    let raw = std::mem::replace(&mut self.pending, rest);
                    return Reply { status, head, body: raw[end + 4..].to_vec() };
                }
            }
            let n = self.io.read(&mut chunk).await.unwrap();
            assert!(n > 0, "server closed before a full response arrived");
            self.pending.extend_from_slice(&chunk[..n]);
        }
    }

    pub async fn request(&mut self, bytes: &[u8]) -> Reply {
        self.send(bytes).await;
        self.reply().await
    }

    /// True once the server has closed its side (EOF or reset).
    pub async fn is_closed(&mut self) -> bool {
        let mut chunk = [0u8; 64];
        match self.io.read(&mut chunk).await {
            Ok(0) | Err(_) => true,
            Ok(_) => false,
        }
    }

    /// Reads until the server closes, returning everything it sent. A reset
    /// counts as a close.
    pub async fn read_to_close(&mut self) -> Vec<u8> {
        let mut chunk = [0u8; 1024];
        loop {
            match self.io.read(&mut chunk).await {
                Ok(0) | Err(_) => return std::mem::take(&mut self.pending),
                Ok(n) => self.pending.extend_from_slice(&chunk[..n]),
            }
        }
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
