//! Minimal wicket example: regex routes, a JSON endpoint and a catch-all.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl http://localhost:8080/info
//!   curl http://localhost:8080/users/42
//!   curl -X POST http://localhost:8080/users -d '{"name":"alice"}'
//!   curl -X DELETE http://localhost:8080/users/42     # 405, allow: GET
//!   curl http://localhost:8080/anything/else          # fallback
//!
//! Settings come from the environment, e.g. `WICKET_WORKERS=4` or
//! `WICKET_TLS_CERT=cert.pem WICKET_TLS_KEY=key.pem` to serve https.

use wicket::{Method, Request, Response, ResponseWriter, Router, Server, ServerConfig, Status};

fn main() -> Result<(), wicket::Error> {
    tracing_subscriber::fmt::init();

    let app = Router::new()
        .get("^/info/?$", info)
        .get(r"^/users/(?P<id>\d+)$", get_user)
        .post("^/users$", create_user)
        .fallback(Method::Get, "^/.*$", not_here);

    Server::new(ServerConfig::from_env()?).run(app)
}

// GET /info
fn info(out: &mut ResponseWriter, _req: &Request) {
    out.send("ok");
}

// GET /users/{id}
//
// Named groups land in req.param(), positional ones in req.capture().
fn get_user(out: &mut ResponseWriter, req: &Request) {
    let id = req.param("id").unwrap_or("unknown");
    out.send(Response::json(format!(r#"{{"id":"{id}","name":"alice"}}"#).into_bytes()));
}

// POST /users
//
// req.body() is exactly Content-Length bytes; wicket does not look inside.
fn create_user(out: &mut ResponseWriter, req: &Request) {
    if req.body().is_empty() {
        return out.send(Status::BadRequest);
    }
    out.send(
        Response::builder()
            .status(Status::Created)
            .header("location", "/users/99")
            .json(br#"{"id":"99","name":"new_user"}"#.to_vec()),
    );
}

fn not_here(out: &mut ResponseWriter, req: &Request) {
    out.send(
        Response::builder()
            .status(Status::NotFound)
            .text(format!("nothing at {}\n", req.path())),
    );
}
