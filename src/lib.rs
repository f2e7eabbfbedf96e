//! # sheath
//!
//! One HTTP handler, wrapped in an ordered pipeline of interceptors.
//!
//! ## The contract
//!
//! Cross-cutting behaviour (auth checks, rate limiting, logging, response
//! post-processing) lives in [`middleware`], not in the handler. Every
//! middleware contributes a request phase, a response phase, or both:
//!
//! - **Request phase**: runs before the handler, in registration order. The
//!   first one to return `Some(response)` answers the request. Nothing after
//!   it runs, and neither does the handler.
//! - **Response phase**: runs after the handler, in the *same* registration
//!   order. Each one edits the single working [`Response`] in place. The
//!   first one to return `Err` replaces the response with a `500` carrying
//!   the error's message.
//!
//! What sheath does not do, and leaves to the transport or the handler:
//!
//! - **Routing**: there is exactly one terminal handler
//! - **Body parsing**: the body arrives as bytes
//! - **Streaming responses**: bodies are text, written in one go
//! - **Timeouts and cancellation**: handlers run to completion
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use http::StatusCode;
//! use sheath::{Pipeline, Request, Response, Server};
//! use sheath::middleware::BasicMiddleware;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), sheath::Error> {
//!     let mut app = Pipeline::new();
//!     app.register(BasicMiddleware::on_request(|req| {
//!         req.header("authorization")
//!             .is_none()
//!             .then(|| Response::new(StatusCode::FORBIDDEN, "forbidden"))
//!     }));
//!     app.set_terminal_handler(hello)?;
//!
//!     Server::bind("0.0.0.0:3000")?.serve(app).await
//! }
//!
//! fn hello(req: &Request) -> Response {
//!     Response::new(StatusCode::OK, format!("hello from {}", req.path()))
//! }
//! ```
//!
//! ## Known limitation
//!
//! A [`Response`] may hold several values under one header name, but
//! [`Response::write`] sends only the first of them.

mod error;
mod handler;
mod pipeline;
mod request;
mod response;
mod server;
mod transport;

pub mod middleware;

pub use error::{BoxError, Error};
pub use handler::Handler;
pub use pipeline::Pipeline;
pub use request::Request;
pub use response::{IntoResponse, Response};
pub use server::{DEFAULT_MAX_BODY_SIZE, Server};
pub use transport::{Recorder, Transport};
