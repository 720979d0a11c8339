//! Server configuration.
//!
//! Built in code with chained setters, or from the environment with
//! [`ServerConfig::from_env`]:
//!
//! | variable | meaning | default |
//! |---|---|---|
//! | `WICKET_ADDR` | listen address, `host:port` | `0.0.0.0:8080` |
//! | `WICKET_WORKERS` | worker threads | `1` |
//! | `WICKET_TLS_CERT` / `WICKET_TLS_KEY` | PEM certificate chain and private key; both or neither | plaintext |
//! | `WICKET_MAX_HEADER_BYTES` | largest accepted header block | `16384` |
//! | `WICKET_MAX_BODY_BYTES` | largest accepted `Content-Length` | `8388608` |
//! | `WICKET_READ_TIMEOUT_SECS` | bound on every socket read and the TLS handshake | none |
//! | `WICKET_SHUTDOWN_GRACE_SECS` | how long shutdown waits for busy connections before dropping them | `5` |
//!
//! ```rust
//! use std::time::Duration;
//! use wicket::ServerConfig;
//!
//! let config = ServerConfig::port(8443)
//!     .with_workers(4)
//!     .with_tls("certs/server.pem", "certs/server.key")
//!     .with_read_timeout(Duration::from_secs(30));
//! ```

use std::env;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::error::Error;

pub const DEFAULT_MAX_HEADER_BYTES: usize = 16 * 1024;
pub const DEFAULT_MAX_BODY_BYTES: usize = 8 * 1024 * 1024;
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Where to find the PEM certificate chain and private key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TlsConfig {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

/// Everything the server consumes at construction time.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    /// Worker threads driving the event loop. `0` is treated as `1`.
    pub workers: usize,
    pub tls: Option<TlsConfig>,
    /// Header blocks larger than this are answered with `431` and the connection closes.
    pub max_header_bytes: usize,
    /// Declared bodies larger than this are answered with `413` and the connection closes.
    pub max_body_bytes: usize,
    pub read_timeout: Option<Duration>,
    /// After the shutdown signal, connections still mid-request get this long
    /// to finish. Whatever remains is then dropped.
    pub shutdown_grace: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(SocketAddr::from((Ipv4Addr::UNSPECIFIED, 8080)))
    }
}

impl ServerConfig {
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            workers: 1,
            tls: None,
            max_header_bytes: DEFAULT_MAX_HEADER_BYTES,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            read_timeout: None,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }

    /// Listen on every IPv4 interface at `port`.
    pub fn port(port: u16) -> Self {
        Self::new(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)))
    }

    /// Parses a `host:port` string.
    pub fn bind(addr: &str) -> Result<Self, Error> {
        let addr = addr
            .parse()
            .map_err(|e| Error::Config(format!("invalid socket address `{addr}`: {e}")))?;
        Ok(Self::new(addr))
    }

    /// Defaults overridden by `WICKET_*` variables. Unparsable values are
    /// logged and skipped; a certificate without a key (or the reverse) is an
    /// error.
    pub fn from_env() -> Result<Self, Error> {
        let mut config = match env::var("WICKET_ADDR") {
            Ok(addr) => Self::bind(&addr)?,
            Err(_) => Self::default(),
        };

        if let Some(workers) = env_parse("WICKET_WORKERS") {
            config.workers = workers;
        }
        if let Some(bytes) = env_parse("WICKET_MAX_HEADER_BYTES") {
            config.max_header_bytes = bytes;
        }
        if let Some(bytes) = env_parse("WICKET_MAX_BODY_BYTES") {
            config.max_body_bytes = bytes;
        }
        if let Some(secs) = env_parse::<u64>("WICKET_READ_TIMEOUT_SECS") {
            config.read_timeout = Some(Duration::from_secs(secs));
        }
        if let Some(secs) = env_parse::<u64>("WICKET_SHUTDOWN_GRACE_SECS") {
            config.shutdown_grace = Duration::from_secs(secs);
        }

        match (env::var_os("WICKET_TLS_CERT"), env::var_os("WICKET_TLS_KEY")) {
            (Some(cert), Some(key)) => config = config.with_tls(cert, key),
            (None, None) => {}
            _ => {
                return Err(Error::Config(
                    "WICKET_TLS_CERT and WICKET_TLS_KEY must be set together".into(),
                ));
            }
        }

        Ok(config)
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_tls(mut self, cert_path: impl Into<PathBuf>, key_path: impl Into<PathBuf>) -> Self {
        self.tls = Some(TlsConfig { cert_path: cert_path.into(), key_path: key_path.into() });
        self
    }

    pub fn with_max_header_bytes(mut self, bytes: usize) -> Self {
        self.max_header_bytes = bytes;
        self
    }

    pub fn with_max_body_bytes(mut self, bytes: usize) -> Self {
        self.max_body_bytes = bytes;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    pub(crate) fn limits(&self) -> Limits {
        Limits {
            max_header_bytes: self.max_header_bytes,
            max_body_bytes: self.max_body_bytes,
            read_timeout: self.read_timeout,
        }
    }
}

/// The per-connection subset of the configuration.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Limits {
    pub max_header_bytes: usize,
    pub max_body_bytes: usize,
    pub read_timeout: Option<Duration>,
}

impl Default for Limits {
    fn default() -> Self {
        ServerConfig::default().limits()
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    let raw = env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "ignoring unparsable environment override");
            None
        }
    }
}
