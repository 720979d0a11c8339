//! # wicket
//!
//! A small, embeddable HTTP/1.1 server engine. It accepts TCP (optionally
//! TLS) connections, reads request heads and fixed-length bodies, matches the
//! path and method against an ordered list of regex routes, runs the matching
//! handler and writes back whatever the handler produced. Connections stay
//! open for the next request until the peer goes away.
//!
//! What wicket deliberately does not do: HTTP/2, chunked transfer-encoding,
//! compression, caching. A request without a `Content-Length` has no body.
//!
//! ## Routing
//!
//! Routes are tried in registration order, primary routes before fallback
//! routes. The first route whose pattern matches the *whole* path and which
//! has a handler for the method wins, and nothing after it runs. A miss is
//! answered with `404 Not Found`, or `405 Method Not Allowed` when some route
//! matched the path but not the method.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use wicket::{Method, Request, Response, ResponseWriter, Router, Server, ServerConfig, Status};
//!
//! fn main() -> Result<(), wicket::Error> {
//!     let app = Router::new()
//!         .on(Method::Get,  r"^/users/(?P<id>\d+)$", get_user)
//!         .on(Method::Post, "^/users$",               create_user)
//!         .fallback(Method::Get, "^/.*$",             not_here);
//!
//!     Server::new(ServerConfig::port(3000).with_workers(4)).run(app)
//! }
//!
//! fn get_user(out: &mut ResponseWriter, req: &Request) {
//!     let id = req.param("id").unwrap_or("unknown");
//!     out.send(Response::json(format!(r#"{{"id":"{id}"}}"#).into_bytes()));
//! }
//!
//! fn create_user(out: &mut ResponseWriter, req: &Request) {
//!     if req.body().is_empty() {
//!         return out.send(Status::BadRequest);
//!     }
//!     out.send(
//!         Response::builder()
//!             .status(Status::Created)
//!             .header("location", "/users/99")
//!             .json(br#"{"id":"99"}"#.to_vec()),
//!     );
//! }
//!
//! fn not_here(out: &mut ResponseWriter, req: &Request) {
//!     out.send(Response::builder().status(Status::NotFound).text(format!("nothing at {}", req.path())));
//! }
//! ```

mod config;
mod connection;
mod error;
mod handler;
mod method;
mod pool;
mod request;
mod response;
mod router;
mod server;
mod status;

pub mod parse;
pub mod tls;
pub mod transport;

pub use config::{
    ServerConfig, TlsConfig, DEFAULT_MAX_BODY_BYTES, DEFAULT_MAX_HEADER_BYTES, DEFAULT_SHUTDOWN_GRACE,
};
pub use error::Error;
pub use handler::Handler;
pub use method::Method;
pub use pool::WorkerPool;
pub use request::Request;
pub use response::{ContentType, IntoResponse, Response, ResponseBuilder, ResponseWriter};
pub use router::{Lookup, RouteTable, Router};
pub use server::{Listening, Server};
pub use status::Status;
