//! Unified error type.

/// The error type returned by wicket's fallible operations.
///
/// Protocol-level problems (a malformed request line, an unknown path) are
/// answered on the wire with a status code and never become an `Error`. This
/// type surfaces infrastructure failures: building the worker pool, binding
/// the listener, loading TLS material, or reading configuration.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("tls: {0}")]
    Tls(String),

    #[error("config: {0}")]
    Config(String),
}

impl From<rustls::Error> for Error {
    fn from(e: rustls::Error) -> Self {
        Self::Tls(e.to_string())
    }
}
