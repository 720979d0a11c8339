//! End-to-end tests over real loopback sockets.

use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use wicket::{Error, Method, Request, Response, ResponseWriter, Router, ServerConfig, Server, Status};

mod common;
use common::{TestServer, tls_config};

fn info(out: &mut ResponseWriter, _req: &Request) {
    out.send("ok");
}

fn echo(out: &mut ResponseWriter, req: &Request) {
    out.send(Response::builder().bytes(wicket::ContentType::OctetStream, req.body().to_vec()));
}

#[tokio::test]
async fn get_info_returns_ok() {
    let server = TestServer::start(Router::new().get("^/info/?$", info)).await;
    let mut client = server.connect().await;

    let reply = client.request(b"GET /info HTTP/1.1\r\nHost: x\r\n\r\n").await;
    assert_eq!(reply.status, 200);
    assert_eq!(reply.body_text(), "ok");

    server.stop().await;
}

#[tokio::test]
async fn post_to_get_only_route_is_405() {
    let server = TestServer::start(Router::new().get("^/info/?$", info)).await;
    let mut client = server.connect().await;

    let reply = client.request(b"POST /info HTTP/1.1\r\n\r\n").await;
    assert_eq!(reply.status, 405);
    assert_eq!(reply.header("allow"), Some("GET"));

    // The miss did not cost the connection.
    let reply = client.request(b"GET /info HTTP/1.1\r\n\r\n").await;
    assert_eq!(reply.body_text(), "ok");

    server.stop().await;
}

#[tokio::test]
async fn unknown_path_is_404() {
    let server = TestServer::start(Router::new().get("^/info/?$", info)).await;
    let mut client = server.connect().await;
    assert_eq!(client.request(b"GET /nope HTTP/1.1\r\n\r\n").await.status, 404);
    server.stop().await;
}

#[tokio::test]
async fn connection_serves_sequential_requests() {
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);
    let router = Router::new().get("^/count$", move |out: &mut ResponseWriter, _: &Request| {
        let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
        out.send(n.to_string());
    });
    let server = TestServer::start(router).await;
    let mut client = server.connect().await;

    assert_eq!(client.request(b"GET /count HTTP/1.1\r\n\r\n").await.body_text(), "1");
    assert_eq!(client.request(b"GET /count HTTP/1.1\r\n\r\n").await.body_text(), "2");
    assert_eq!(seen.load(Ordering::SeqCst), 2);

    server.stop().await;
}

#[tokio::test]
async fn only_the_first_matching_route_runs() {
    let second_calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&second_calls);
    let router = Router::new()
        .get("^/info$", |out: &mut ResponseWriter, _: &Request| out.send("first"))
        .get("^/info$|^/other$", move |out: &mut ResponseWriter, _: &Request| {
            counter.fetch_add(1, Ordering::SeqCst);
            out.send("second");
        });
    let server = TestServer::start(router).await;
    let mut client = server.connect().await;

    let reply = client.request(b"GET /info HTTP/1.1\r\n\r\n").await;
    assert_eq!(reply.body_text(), "first");
    assert_eq!(second_calls.load(Ordering::SeqCst), 0);

    server.stop().await;
}

#[tokio::test]
async fn fallback_serves_what_primary_routes_do_not() {
    let router = Router::new()
        .get("^/info$", info)
        .fallback(Method::Post, "^/.*$", |out: &mut ResponseWriter, req: &Request| {
            out.send(format!("fallback {}", req.path()));
        });
    let server = TestServer::start(router).await;
    let mut client = server.connect().await;

    let reply = client.request(b"POST /info HTTP/1.1\r\nContent-Length: 0\r\n\r\n").await;
    assert_eq!(reply.body_text(), "fallback /info");

    server.stop().await;
}

#[tokio::test]
async fn captures_reach_the_handler() {
    let router = Router::new().get(
        r"^/users/(\d+)/posts/(?P<post>\d+)$",
        |out: &mut ResponseWriter, req: &Request| {
            let user = req.capture(0).unwrap_or("-");
            let post = req.param("post").unwrap_or("-");
            out.send(format!("{user}:{post}"));
        },
    );
    let server = TestServer::start(router).await;
    let mut client = server.connect().await;

    let reply = client.request(b"GET /users/7/posts/31 HTTP/1.1\r\n\r\n").await;
    assert_eq!(reply.body_text(), "7:31");

    server.stop().await;
}

#[tokio::test]
async fn fragmented_body_is_reassembled() {
    let server = TestServer::start(Router::new().post("^/echo$", echo)).await;
    let mut client = server.connect().await;

    let body: Vec<u8> = (0..=255u8).cycle().take(10_000).collect();
    let mut wire = format!("POST /echo HTTP/1.1\r\nContent-Length: {}\r\n\r\n", body.len()).into_bytes();
    wire.extend_from_slice(&body);
    for piece in wire.chunks(777) {
        client.send(piece).await;
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    let reply = client.reply().await;
    assert_eq!(reply.status, 200);
    assert_eq!(reply.body, body);

    server.stop().await;
}

#[tokio::test]
async fn handler_bytes_go_out_verbatim() {
    let router = Router::new().get("^/raw$", |out: &mut ResponseWriter, _: &Request| {
        let _ = out.write_all(b"HTTP/1.1 200 OK\r\nX-Raw: yes\r\nContent-Length: 3\r\n\r\nraw");
    });
    let server = TestServer::start(router).await;
    let mut client = server.connect().await;

    let reply = client.request(b"GET /raw HTTP/1.1\r\n\r\n").await;
    assert_eq!(reply.header("x-raw"), Some("yes"));
    assert_eq!(reply.body_text(), "raw");

    server.stop().await;
}

#[tokio::test]
async fn malformed_request_line_closes_the_connection() {
    let server = TestServer::start(Router::new().get("^/info/?$", info)).await;
    let mut client = server.connect().await;

    let reply = client.request(b"GARBAGE\r\n").await;
    assert_eq!(reply.status, 400);
    assert!(client.is_closed().await);

    // Other connections are unaffected.
    let mut other = server.connect().await;
    assert_eq!(other.request(b"GET /info HTTP/1.1\r\n\r\n").await.body_text(), "ok");

    server.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_connections_progress_independently() {
    let server = TestServer::start(Router::new().post("^/echo$", echo)).await;

    // A client that sent half a request must not hold up the others.
    let mut stalled = server.connect().await;
    stalled.send(b"POST /echo HTTP/1.1\r\nContent-Length: 10\r\n\r\nhalf").await;

    let mut clients = Vec::new();
    for i in 0..8 {
        let mut client = server.connect().await;
        clients.push(tokio::spawn(async move {
            let body = format!("client-{i}");
            let wire = format!("POST /echo HTTP/1.1\r\nContent-Length: {}\r\n\r\n{body}", body.len());
            let reply = client.request(wire.as_bytes()).await;
            assert_eq!(reply.body_text(), body);
        }));
    }
    for client in clients {
        client.await.unwrap();
    }

    stalled.send(b"-complete").await;
    assert_eq!(stalled.reply().await.body_text(), "half-complete");

    server.stop().await;
}

#[tokio::test]
async fn stop_closes_idle_keep_alive_connections() {
    let server = TestServer::start(Router::new().get("^/info/?$", info)).await;
    let mut client = server.connect().await;
    assert_eq!(client.request(b"GET /info HTTP/1.1\r\n\r\n").await.status, 200);

    tokio::time::timeout(Duration::from_secs(5), server.stop())
        .await
        .expect("shutdown should not wait on idle connections");
    assert!(client.is_closed().await);
}

#[tokio::test]
async fn stop_drops_connections_stalled_mid_request_after_the_grace_period() {
    let config = ServerConfig::bind("127.0.0.1:0")
        .unwrap()
        .with_shutdown_grace(Duration::from_millis(200));
    let server = TestServer::start_with(config, Router::new().get("^/info/?$", info)).await;
    let mut head = server.connect().await;
    head.send(b"GET /info HT").await;
    let mut body = server.connect().await;
    body.send(b"POST /info HTTP/1.1\r\nContent-Length: 10\r\n\r\nabc").await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    tokio::time::timeout(Duration::from_secs(3), server.stop())
        .await
        .expect("shutdown must not wait on a stalled client forever");
    assert!(head.is_closed().await);
    assert!(body.is_closed().await);
}

#[tokio::test]
async fn oversized_body_is_refused() {
    let config = ServerConfig::bind("127.0.0.1:0").unwrap().with_max_body_bytes(16);
    let server = TestServer::start_with(config, Router::new().post("^/echo$", echo)).await;
    let mut client = server.connect().await;

    let reply = client.request(b"POST /echo HTTP/1.1\r\nContent-Length: 17\r\n\r\n").await;
    assert_eq!(reply.status, Status::ContentTooLarge.code());
    assert_eq!(reply.header("connection"), Some("close"));

    server.stop().await;
}

#[tokio::test]
async fn missing_tls_material_fails_at_listen() {
    let config = ServerConfig::bind("127.0.0.1:0")
        .unwrap()
        .with_tls("/nonexistent/server.pem", "/nonexistent/server.key");
    let err = Server::new(config).listen(Router::new()).await.err().unwrap();
    assert!(matches!(err, Error::Tls(_)), "{err}");
}

#[tokio::test]
async fn tls_handshake_completes_before_the_first_request() {
    let server = TestServer::start_with(tls_config(), Router::new().get("^/info/?$", info)).await;
    let mut client = server.connect_tls().await;

    let reply = client.request(b"GET /info HTTP/1.1\r\nHost: localhost\r\n\r\n").await;
    assert_eq!(reply.status, 200);
    assert_eq!(reply.body_text(), "ok");

    // Same TLS session, next request.
    assert_eq!(client.request(b"GET /info HTTP/1.1\r\n\r\n").await.body_text(), "ok");

    server.stop().await;
}

#[tokio::test]
async fn failed_handshake_drops_only_that_connection() {
    let server = TestServer::start_with(tls_config(), Router::new().get("^/info/?$", info)).await;
    let mut healthy = server.connect_tls().await;

    let mut plaintext = server.connect().await;
    plaintext.send(b"GET /info HTTP/1.1\r\n\r\n").await;
    let sent_back = tokio::time::timeout(Duration::from_secs(5), plaintext.read_to_close())
        .await
        .expect("a plaintext client must be dropped");
    assert!(!sent_back.starts_with(b"HTTP/"), "request was served without TLS");

    assert_eq!(healthy.request(b"GET /info HTTP/1.1\r\n\r\n").await.body_text(), "ok");
    let mut late = server.connect_tls().await;
    assert_eq!(late.request(b"GET /info HTTP/1.1\r\n\r\n").await.body_text(), "ok");

    server.stop().await;
}
