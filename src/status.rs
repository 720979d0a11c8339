//! HTTP status codes as a typed enum.
//!
//! Use [`Status`] anywhere a status code is accepted: `Response::status()`,
//! `Response::builder().status()`, or [`ResponseWriter::send`] directly.
//!
//! ```rust
//! use wicket::{Response, Status};
//!
//! Response::status(Status::NoContent);
//! Response::builder()
//!     .status(Status::Created)
//!     .header("location", "/users/42")
//!     .json(br#"{"id":42}"#.to_vec());
//! ```
//!
//! [`ResponseWriter::send`]: crate::ResponseWriter::send

macro_rules! statuses {
    ($($variant:ident = $code:literal, $reason:literal;)+) => {
        /// The status codes wicket knows a reason phrase for.
        #[allow(clippy::enum_variant_names)]
        #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
        pub enum Status {
            $($variant,)+
        }

        impl Status {
            /// Numeric code, e.g. `404`.
            pub fn code(self) -> u16 {
                match self {
                    $(Self::$variant => $code,)+
                }
            }

            /// Canonical reason phrase, e.g. `"Not Found"`.
            pub fn reason(self) -> &'static str {
                match self {
                    $(Self::$variant => $reason,)+
                }
            }

            /// Looks up a status by its numeric code.
            pub fn from_code(code: u16) -> Option<Self> {
                match code {
                    $($code => Some(Self::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

statuses! {
    // 1xx
    Continue                    = 100, "Continue";
    SwitchingProtocols          = 101, "Switching Protocols";
    // 2xx
    Ok                          = 200, "OK";
    Created                     = 201, "Created";
    Accepted                    = 202, "Accepted";
    NoContent                   = 204, "No Content";
    PartialContent              = 206, "Partial Content";
    // 3xx
    MovedPermanently            = 301, "Moved Permanently";
    Found                       = 302, "Found";
    SeeOther                    = 303, "See Other";
    NotModified                 = 304, "Not Modified";
    TemporaryRedirect           = 307, "Temporary Redirect";
    PermanentRedirect           = 308, "Permanent Redirect";
    // 4xx
    BadRequest                  = 400, "Bad Request";
    Unauthorized                = 401, "Unauthorized";
    Forbidden                   = 403, "Forbidden";
    NotFound                    = 404, "Not Found";
    MethodNotAllowed            = 405, "Method Not Allowed";
    RequestTimeout              = 408, "Request Timeout";
    Conflict                    = 409, "Conflict";
    Gone                        = 410, "Gone";
    LengthRequired              = 411, "Length Required";
    ContentTooLarge             = 413, "Content Too Large";
    UriTooLong                  = 414, "URI Too Long";
    UnsupportedMediaType        = 415, "Unsupported Media Type";
    UnprocessableContent        = 422, "Unprocessable Content";
    TooManyRequests             = 429, "Too Many Requests";
    RequestHeaderFieldsTooLarge = 431, "Request Header Fields Too Large";
    // 5xx
    InternalServerError         = 500, "Internal Server Error";
    NotImplemented              = 501, "Not Implemented";
    BadGateway                  = 502, "Bad Gateway";
    ServiceUnavailable          = 503, "Service Unavailable";
    GatewayTimeout              = 504, "Gateway Timeout";
    HttpVersionNotSupported     = 505, "HTTP Version Not Supported";
}

impl From<Status> for u16 {
    fn from(s: Status) -> u16 {
        s.code()
    }
}
