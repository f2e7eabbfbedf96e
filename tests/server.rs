use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use http::{HeaderValue, StatusCode};
use sheath::middleware::BasicMiddleware;
use sheath::{Error, Pipeline, Request, Response, Server};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

fn pipeline() -> Pipeline {
    let mut app = Pipeline::new();
    app.register(BasicMiddleware::on_request(|req: &Request| {
        (req.header("authorization").is_none())
            .then(|| Response::new(StatusCode::FORBIDDEN, "forbidden"))
    }))
    .register(BasicMiddleware::on_response(|res: &mut Response| {
        res.headers_mut().insert("x-stamp", HeaderValue::from_static("1"));
        Ok(())
    }))
    .register(BasicMiddleware::on_response(|res: &mut Response| {
        if res.body().contains("boom") {
            return Err("refused".into());
        }
        Ok(())
    }));
    app.set_terminal_handler(|req: &Request| {
        let peer = req.remote_addr().map(|a| a.ip().to_string()).unwrap_or_default();
        Response::new(StatusCode::OK, format!("{} {} {peer} {}", req.method(), req.path(), req.body().len()))
    })
    .unwrap();
    app
}

/// Sends one HTTP/1.1 request with `connection: close` and returns the raw reply.
async fn roundtrip(addr: std::net::SocketAddr, head: &str, body: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let raw = format!("{head}\r\nhost: test\r\nconnection: close\r\ncontent-length: {}\r\n\r\n{body}", body.len());
    stream.write_all(raw.as_bytes()).await.unwrap();
    let mut reply = String::new();
    stream.read_to_string(&mut reply).await.unwrap();
    reply
}

#[tokio::test]
async fn serves_requests_through_the_pipeline() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop, stopped) = oneshot::channel::<()>();

    let server = tokio::spawn(
        Server::from_listener(listener).serve_with_shutdown(pipeline(), async {
            let _ = stopped.await;
        }),
    );

    let denied = roundtrip(addr, "GET /hello HTTP/1.1", "").await;
    assert!(denied.starts_with("HTTP/1.1 403"), "{denied}");
    assert!(denied.ends_with("forbidden"), "{denied}");
    assert!(!denied.contains("x-stamp"), "{denied}");

    let ok = roundtrip(addr, "POST /hello HTTP/1.1\r\nauthorization: Bearer t", "abc").await;
    assert!(ok.starts_with("HTTP/1.1 200"), "{ok}");
    assert!(ok.contains("x-stamp: 1"), "{ok}");
    assert!(ok.ends_with("POST /hello 127.0.0.1 3"), "{ok}");

    let failed = roundtrip(addr, "GET /boom HTTP/1.1\r\nauthorization: Bearer t", "").await;
    assert!(failed.starts_with("HTTP/1.1 500"), "{failed}");
    assert!(failed.ends_with("refused"), "{failed}");

    stop.send(()).unwrap();
    server.await.unwrap().unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn blocking_handlers_do_not_starve_other_requests() {
    let mut app = Pipeline::new();
    app.set_terminal_handler(|_: &Request| {
        std::thread::sleep(Duration::from_millis(300));
        "slept"
    })
    .unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop, stopped) = oneshot::channel::<()>();
    let server = tokio::spawn(Server::from_listener(listener).serve_with_shutdown(app, async {
        let _ = stopped.await;
    }));

    let started = Instant::now();
    let clients: Vec<_> = (0..6)
        .map(|_| tokio::spawn(roundtrip(addr, "GET / HTTP/1.1", "")))
        .collect();
    for client in clients {
        let reply = client.await.unwrap();
        assert!(reply.ends_with("slept"), "{reply}");
    }
    let elapsed = started.elapsed();

    // Six 300ms handlers on two workers would take at least 900ms if they
    // ran on the async workers.
    assert!(elapsed < Duration::from_millis(700), "took {elapsed:?}");

    stop.send(()).unwrap();
    server.await.unwrap().unwrap();
}

#[tokio::test]
async fn oversized_bodies_are_rejected_before_dispatch() {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);
    let mut app = Pipeline::new();
    app.set_terminal_handler(move |req: &Request| {
        seen.fetch_add(1, Ordering::SeqCst);
        format!("{} bytes", req.body().len())
    })
    .unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop, stopped) = oneshot::channel::<()>();
    let server = tokio::spawn(
        Server::from_listener(listener)
            .max_body_size(16)
            .serve_with_shutdown(app, async {
                let _ = stopped.await;
            }),
    );

    let small = roundtrip(addr, "POST / HTTP/1.1", "0123456789").await;
    assert!(small.starts_with("HTTP/1.1 200"), "{small}");
    assert!(small.ends_with("10 bytes"), "{small}");

    let large = roundtrip(addr, "POST / HTTP/1.1", &"x".repeat(64)).await;
    assert!(large.starts_with("HTTP/1.1 413"), "{large}");
    assert!(large.ends_with("request body too large"), "{large}");
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    stop.send(()).unwrap();
    server.await.unwrap().unwrap();
}

#[tokio::test]
async fn refuses_to_serve_without_a_terminal_handler() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let err = Server::from_listener(listener)
        .serve_with_shutdown(Pipeline::new(), std::future::ready(()))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::MissingHandler));
}

#[test]
fn bind_rejects_malformed_addresses() {
    let err = Server::bind("localhost").err().unwrap();
    assert!(matches!(err, Error::InvalidAddress { .. }));
    assert!(err.to_string().starts_with("invalid socket address `localhost`"));
    assert!(Server::bind("127.0.0.1:8080").is_ok());
}
