//! Listener, accept loop and graceful shutdown.
//!
//! The accept loop always has an accept outstanding: each accepted socket is
//! handed to its own task and the loop goes straight back to accepting. The
//! task runs the transport handshake (if any) and then the connection
//! pipeline. A failure inside one task never reaches the loop or any other
//! connection.
//!
//! # Shutdown
//!
//! When the shutdown signal resolves the server:
//! 1. Stops accepting new connections.
//! 2. Tells every connection to close once it is idle between requests.
//! 3. Waits up to the configured grace period for the remaining connections
//!    to finish, then drops whatever is still running (a client stalled
//!    mid-request or mid-handshake) and returns.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{Instrument, debug, debug_span, error, info, warn};

use crate::config::{Limits, ServerConfig};
use crate::connection::Connection;
use crate::error::Error;
use crate::pool::WorkerPool;
use crate::router::{RouteTable, Router};
use crate::tls;
use crate::transport::{Acceptor, PlainAcceptor, TlsAcceptor};

/// The HTTP(S) server.
///
/// ```rust,no_run
/// use wicket::{Request, ResponseWriter, Router, Server, ServerConfig};
///
/// fn info(out: &mut ResponseWriter, _req: &Request) {
///     out.send("ok");
/// }
///
/// fn main() -> Result<(), wicket::Error> {
///     let router = Router::new().get("^/info/?$", info);
///     Server::new(ServerConfig::port(12345).with_workers(4)).run(router)
/// }
/// ```
pub struct Server {
    config: ServerConfig,
}

impl Server {
    pub fn new(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Shorthand for a default configuration listening on `addr` (`host:port`).
    pub fn bind(addr: &str) -> Result<Self, Error> {
        Ok(Self::new(ServerConfig::bind(addr)?))
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Builds a [`WorkerPool`] with the configured worker count and blocks the
    /// calling thread serving `router` until SIGTERM or Ctrl-C.
    pub fn run(self, router: Router) -> Result<(), Error> {
        let pool = WorkerPool::new(self.config.workers)?;
        info!(workers = pool.workers(), "worker pool started");
        let result = pool.block_on(self.serve(router));
        pool.shutdown(Duration::from_secs(5));
        result
    }

    /// Serves `router` on the current runtime until SIGTERM or Ctrl-C, then
    /// drains in-flight connections.
    pub async fn serve(self, router: Router) -> Result<(), Error> {
        self.serve_with_shutdown(router, shutdown_signal()).await
    }

    /// Like [`serve`](Server::serve), stopping when `signal` resolves.
    pub async fn serve_with_shutdown(
        self,
        router: Router,
        signal: impl Future<Output = ()>,
    ) -> Result<(), Error> {
        self.listen(router).await?.serve_until(signal).await
    }

    /// Loads TLS material (if configured), binds the listening socket and
    /// freezes the routes, without accepting anything yet.
    pub async fn listen(self, router: Router) -> Result<Listening, Error> {
        let tls = match &self.config.tls {
            Some(paths) => Some(TlsAcceptor::new(tls::load_server_config(&paths.cert_path, &paths.key_path)?)),
            None => None,
        };
        let listener = TcpListener::bind(self.config.addr).await?;
        Ok(Listening {
            listener,
            routes: Arc::new(router.into_table()),
            tls,
            limits: self.config.limits(),
            grace: self.config.shutdown_grace,
        })
    }
}

/// A bound server that has not started accepting yet.
pub struct Listening {
    listener: TcpListener,
    routes: Arc<RouteTable>,
    tls: Option<TlsAcceptor>,
    limits: Limits,
    grace: Duration,
}

impl Listening {
    /// The bound address; useful after binding port `0`.
    pub fn local_addr(&self) -> Result<SocketAddr, Error> {
        Ok(self.listener.local_addr()?)
    }

    /// Accepts and serves connections until `signal` resolves.
    pub async fn serve_until(self, signal: impl Future<Output = ()>) -> Result<(), Error> {
        match self.tls.clone() {
            Some(tls) => accept_loop(self, tls, signal).await,
            None => accept_loop(self, PlainAcceptor, signal).await,
        }
    }
}

async fn accept_loop<A: Acceptor>(
    listening: Listening,
    acceptor: A,
    signal: impl Future<Output = ()>,
) -> Result<(), Error> {
    let Listening { listener, routes, limits, grace, .. } = listening;
    let addr = listener.local_addr()?;
    info!(addr = %addr, scheme = A::SCHEME, routes = routes.len(), "wicket listening");

    // Flipped once on shutdown; idle connections watch it.
    let (stop, stopped) = watch::channel(false);
    let mut tasks = JoinSet::new();

    tokio::pin!(signal);

    loop {
        tokio::select! {
            biased;

            () = &mut signal => {
                info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                break;
            }

            res = listener.accept() => {
                let (stream, peer) = match res {
                    Ok(v) => v,
                    Err(e) => {
                        error!("accept error: {e}");
                        continue;
                    }
                };
                let _ = stream.set_nodelay(true);

                let acceptor = acceptor.clone();
                let routes = Arc::clone(&routes);
                let stopped = stopped.clone();

                tasks.spawn(
                    async move {
                        let stream = match handshake(&acceptor, stream, limits.read_timeout).await {
                            Ok(s) => s,
                            Err(e) => {
                                debug!(error = %e, "handshake failed");
                                return;
                            }
                        };
                        Connection::new(stream, routes, limits, stopped).run().await;
                    }
                    .instrument(debug_span!("conn", peer = %peer)),
                );
            }

            // Reap finished connection tasks so the JoinSet does not grow
            // without bound on long-running servers.
            Some(res) = tasks.join_next(), if !tasks.is_empty() => reap(res),
        }
    }

    let _ = stop.send(true);
    let drained = tokio::time::timeout(grace, async {
        while let Some(res) = tasks.join_next().await {
            reap(res);
        }
    })
    .await;
    if drained.is_err() {
        warn!(remaining = tasks.len(), "shutdown grace period elapsed, dropping connections");
        tasks.shutdown().await;
    }

    info!("wicket stopped");
    Ok(())
}

async fn handshake<A: Acceptor>(
    acceptor: &A,
    tcp: TcpStream,
    timeout: Option<Duration>,
) -> io::Result<A::Stream> {
    match timeout {
        Some(limit) => tokio::time::timeout(limit, acceptor.accept(tcp))
            .await
            .map_err(|_| io::Error::from(io::ErrorKind::TimedOut))?,
        None => acceptor.accept(tcp).await,
    }
}

fn reap(res: Result<(), tokio::task::JoinError>) {
    if let Err(e) = res {
        if e.is_panic() {
            error!("connection task panicked: {e}");
        }
    }
}

/// Resolves on the first shutdown signal the process receives: SIGTERM or
/// SIGINT on Unix, Ctrl-C elsewhere. A signal that cannot be installed is
/// logged and never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl-C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c  => {}
        () = sigterm => {}
    }
}
