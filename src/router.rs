//! Regex request router.
//!
//! Routes are `(pattern, method → handler)` entries kept in registration
//! order, in two groups: primary entries first, then fallback entries. A
//! lookup walks the list and stops at the first entry whose pattern matches
//! the whole path *and* which has a handler for the method. An entry that
//! matches the path but not the method does not end the search, so a later
//! entry (typically a fallback) can still serve the request.

use std::collections::HashMap;

use regex::Regex;

use crate::handler::{BoxedHandler, Handler};
use crate::method::Method;

/// The application router.
///
/// Build it once at startup and pass it to [`Server`](crate::Server); it turns
/// into an immutable [`RouteTable`] when the server starts. Every registration
/// returns `self` so calls chain naturally.
#[derive(Default)]
pub struct Router {
    primary: Vec<Route>,
    fallback: Vec<Route>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a primary route. Returns `self` for chaining.
    ///
    /// `pattern` is a regular expression that must match the entire request
    /// target. Capture groups end up in [`Request::captures`], named groups in
    /// [`Request::param`]:
    ///
    /// ```rust
    /// # use wicket::{Method, Request, ResponseWriter, Router};
    /// # fn get_user(_: &mut ResponseWriter, _: &Request) {}
    /// # fn create_user(_: &mut ResponseWriter, _: &Request) {}
    /// Router::new()
    ///     .on(Method::Get,  r"^/users/(?P<id>\d+)$", get_user)
    ///     .on(Method::Post, "^/users$",              create_user);
    /// ```
    ///
    /// Registering a pattern that already exists in the group adds the method
    /// to that entry, replacing any handler it already had for that method.
    ///
    /// # Panics
    ///
    /// Panics if `pattern` is not a valid regular expression.
    ///
    /// [`Request::captures`]: crate::Request::captures
    /// [`Request::param`]: crate::Request::param
    pub fn on(mut self, method: impl AsRef<str>, pattern: &str, handler: impl Handler) -> Self {
        add(&mut self.primary, method.as_ref(), pattern, handler.into_boxed_handler());
        self
    }

    /// Registers a fallback route, consulted only after every primary route.
    ///
    /// # Panics
    ///
    /// Panics if `pattern` is not a valid regular expression.
    pub fn fallback(mut self, method: impl AsRef<str>, pattern: &str, handler: impl Handler) -> Self {
        add(&mut self.fallback, method.as_ref(), pattern, handler.into_boxed_handler());
        self
    }

    pub fn get(self, pattern: &str, handler: impl Handler) -> Self {
        self.on(Method::Get, pattern, handler)
    }

    pub fn post(self, pattern: &str, handler: impl Handler) -> Self {
        self.on(Method::Post, pattern, handler)
    }

    pub fn put(self, pattern: &str, handler: impl Handler) -> Self {
        self.on(Method::Put, pattern, handler)
    }

    pub fn delete(self, pattern: &str, handler: impl Handler) -> Self {
        self.on(Method::Delete, pattern, handler)
    }

    pub fn patch(self, pattern: &str, handler: impl Handler) -> Self {
        self.on(Method::Patch, pattern, handler)
    }

    pub fn head(self, pattern: &str, handler: impl Handler) -> Self {
        self.on(Method::Head, pattern, handler)
    }

    pub fn options(self, pattern: &str, handler: impl Handler) -> Self {
        self.on(Method::Options, pattern, handler)
    }

    /// Freezes the router: primary routes, then fallback routes, in
    /// registration order.
    pub fn into_table(self) -> RouteTable {
        let mut routes = self.primary;
        routes.extend(self.fallback);
        RouteTable { routes }
    }
}

fn add(group: &mut Vec<Route>, method: &str, pattern: &str, handler: BoxedHandler) {
    let route = match group.iter().position(|r| r.pattern == pattern) {
        Some(i) => &mut group[i],
        None => {
            let regex = Regex::new(&format!("^(?:{pattern})$"))
                .unwrap_or_else(|e| panic!("invalid route `{pattern}`: {e}"));
            group.push(Route { pattern: pattern.to_owned(), regex, handlers: Vec::new() });
            let last = group.len() - 1;
            &mut group[last]
        }
    };
    match route.handlers.iter_mut().find(|(m, _)| m == method) {
        Some(slot) => slot.1 = handler,
        None => route.handlers.push((method.to_owned(), handler)),
    }
}

struct Route {
    pattern: String,
    regex: Regex,
    handlers: Vec<(String, BoxedHandler)>,
}

impl Route {
    fn handler(&self, method: &str) -> Option<&BoxedHandler> {
        self.handlers.iter().find(|(m, _)| m == method).map(|(_, h)| h)
    }
}

/// The frozen, ordered route list a running server dispatches against.
///
/// Read-only and shared by every connection without locking.
pub struct RouteTable {
    routes: Vec<Route>,
}

/// Outcome of [`RouteTable::lookup`].
pub enum Lookup<'a> {
    Found {
        handler: &'a BoxedHandler,
        /// Groups 1..n of the pattern; non-participating groups are empty.
        captures: Vec<String>,
        /// Named groups that took part in the match.
        params: HashMap<String, String>,
    },
    /// At least one pattern matched but none had a handler for the method.
    /// `allowed` lists the methods the matching entries do support.
    MethodNotAllowed { allowed: Vec<&'a str> },
    NotFound,
}

impl RouteTable {
    pub fn lookup<'a>(&'a self, method: &str, path: &str) -> Lookup<'a> {
        let mut allowed: Vec<&'a str> = Vec::new();

        for route in &self.routes {
            let Some(caps) = route.regex.captures(path) else { continue };

            if let Some(handler) = route.handler(method) {
                let captures = caps
                    .iter()
                    .skip(1)
                    .map(|m| m.map_or_else(String::new, |m| m.as_str().to_owned()))
                    .collect();
                let params = route
                    .regex
                    .capture_names()
                    .flatten()
                    .filter_map(|name| caps.name(name).map(|m| (name.to_owned(), m.as_str().to_owned())))
                    .collect();
                return Lookup::Found { handler, captures, params };
            }

            for (m, _) in &route.handlers {
                if !allowed.contains(&m.as_str()) {
                    allowed.push(m);
                }
            }
        }

        if allowed.is_empty() {
            Lookup::NotFound
        } else {
            Lookup::MethodNotAllowed { allowed }
        }
    }

    /// Number of distinct pattern entries.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
