//! Minimal sheath example: an auth gate, a header stamp and one handler.
//!
//! Run with:
//!   RUST_LOG=sheath=debug,info cargo run --example basic
//!
//! Try:
//!   curl -i http://localhost:3000/hello                        # 403
//!   curl -i -H 'authorization: Bearer t' http://localhost:3000/hello
//!   curl -i -H 'authorization: Bearer t' http://localhost:3000/boom  # 500

use std::time::Instant;

use http::{HeaderValue, StatusCode, header};
use sheath::middleware::BasicMiddleware;
use sheath::{Pipeline, Request, Response, Server};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), sheath::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let started = Instant::now();

    let mut app = Pipeline::new();
    app.register(BasicMiddleware::on_request(require_auth))
        .register(BasicMiddleware::on_response(|res: &mut Response| {
            res.headers_mut()
                .insert(header::SERVER, HeaderValue::from_static("sheath"));
            Ok(())
        }))
        .register(BasicMiddleware::on_response(move |res: &mut Response| {
            // Refuse to ship anything that leaked an internal marker.
            if res.body().contains("INTERNAL") {
                return Err(format!("response withheld after {:?}", started.elapsed()).into());
            }
            Ok(())
        }));
    app.set_terminal_handler(hello)?;

    Server::bind("0.0.0.0:3000")?.serve(app).await
}

fn require_auth(req: &Request) -> Option<Response> {
    match req.header("authorization") {
        Some(v) if v.starts_with("Bearer ") => None,
        _ => Some(Response::new(StatusCode::FORBIDDEN, "forbidden")),
    }
}

fn hello(req: &Request) -> Response {
    match req.path() {
        "/boom" => Response::new(StatusCode::OK, "INTERNAL state dump"),
        path => Response::new(StatusCode::OK, format!("hello from {path}\n")),
    }
}
