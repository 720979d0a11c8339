//! Route handlers.
//!
//! A handler is any `Fn(&mut ResponseWriter, &Request)`. The route table
//! stores handlers of different closure types in one list, so registration
//! wraps each in a `Callback` and keeps it as a shared [`BoxedHandler`].
//! Dispatch is one dynamic call per request.
//!
//! Handlers run synchronously on the worker that owns the connection, in
//! between that worker's socket reads, and should not block.

use std::sync::Arc;

use crate::request::Request;
use crate::response::ResponseWriter;

/// Object-safe calling interface behind [`BoxedHandler`].
#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, out: &mut ResponseWriter, req: &Request);
}

/// One registered handler, shared by every connection.
#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

/// Satisfied by every `fn(&mut ResponseWriter, &Request)` and by closures of
/// the same shape that are `Send + Sync + 'static`. Sealed.
///
/// Closures passed inline need their parameter types spelled out:
///
/// ```rust
/// use wicket::{Request, ResponseWriter, Router};
///
/// Router::new().get("^/ping$", |out: &mut ResponseWriter, _: &Request| out.send("pong"));
/// ```
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

mod private {
    pub trait Sealed {}
}

impl<F> private::Sealed for F where F: Fn(&mut ResponseWriter, &Request) + Send + Sync + 'static {}

impl<F> Handler for F
where
    F: Fn(&mut ResponseWriter, &Request) + Send + Sync + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(Callback(self))
    }
}

struct Callback<F>(F);

impl<F> ErasedHandler for Callback<F>
where
    F: Fn(&mut ResponseWriter, &Request) + Send + Sync,
{
    fn call(&self, out: &mut ResponseWriter, req: &Request) {
        (self.0)(out, req)
    }
}
