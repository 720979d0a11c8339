//! HTTP method names for route registration.
//!
//! Routes are keyed by the method token exactly as it appears on the request
//! line, so any `AsRef<str>` works at registration time. [`Method`] covers the
//! RFC 9110 methods plus `PURGE` and spares callers from typos:
//!
//! ```rust
//! use wicket::{Method, Router};
//! # fn h(_: &mut wicket::ResponseWriter, _: &wicket::Request) {}
//! Router::new()
//!     .on(Method::Get, "^/info/?$", h)
//!     .on("REPORT", "^/calendar$", h);
//! ```

use std::fmt;
use std::str::FromStr;

macro_rules! methods {
    ($($variant:ident => $token:literal,)+) => {
        /// A well-known HTTP method.
        #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
        pub enum Method {
            $($variant,)+
        }

        impl Method {
            /// Returns the uppercase wire token (e.g. `"GET"`).
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $token,)+
                }
            }
        }

        /// Case-sensitive, per RFC 9110 §9.1.
        impl FromStr for Method {
            type Err = ();

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($token => Ok(Self::$variant),)+
                    _ => Err(()),
                }
            }
        }
    };
}

methods! {
    Connect => "CONNECT",
    Delete  => "DELETE",
    Get     => "GET",
    Head    => "HEAD",
    Options => "OPTIONS",
    Patch   => "PATCH",
    Post    => "POST",
    Purge   => "PURGE",
    Put     => "PUT",
    Trace   => "TRACE",
}

impl AsRef<str> for Method {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
