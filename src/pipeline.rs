//! The interceptor pipeline.
//!
//! A [`Pipeline`] wraps one terminal handler with an ordered list of
//! middleware. Per dispatch:
//!
//! ```text
//! request ─► req₁ ─► req₂ ─► … ─► handler ─► res₁ ─► res₂ ─► … ─► write
//!             │       │                        │       │
//!             └───────┴─ Some(resp) ─► write   └───────┴─ Err(e) ─► write 500
//! ```
//!
//! Exactly one response is written per dispatch, through exactly one of the
//! three arrows ending in `write`.
//!
//! # Lifecycle
//!
//! Build the pipeline on one thread, then hand it to
//! [`Server::serve`](crate::Server::serve), which moves it behind an `Arc`.
//! From then on it is shared read-only by every in-flight request.

use crate::error::Error;
use crate::handler::{BoxedHandler, Handler};
use crate::middleware::{Middleware, RequestInterceptor, ResponseInterceptor};
use crate::request::Request;
use crate::response::Response;
use crate::transport::Transport;

/// An ordered set of interceptors around a single terminal handler.
///
/// ```rust
/// use http::StatusCode;
/// use sheath::{Pipeline, Recorder, Request, Response};
/// use sheath::middleware::BasicMiddleware;
///
/// let mut pipeline = Pipeline::new();
/// pipeline.register(BasicMiddleware::on_response(|res| {
///     res.body_mut().push('!');
///     Ok(())
/// }));
/// pipeline.set_terminal_handler(|_req: &Request| "hello")?;
///
/// let req = Request::from(http::Request::new(bytes::Bytes::new()));
/// let mut rec = Recorder::new();
/// pipeline.dispatch(&req, &mut rec)?;
/// assert_eq!(rec.status(), Some(StatusCode::OK));
/// assert_eq!(rec.body_str(), "hello!");
/// # Ok::<(), sheath::Error>(())
/// ```
#[derive(Default)]
pub struct Pipeline {
    request_interceptors: Vec<RequestInterceptor>,
    response_interceptors: Vec<ResponseInterceptor>,
    handler: Option<BoxedHandler>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `middleware`'s request and response phases. Returns `self` for
    /// chaining.
    ///
    /// Registration order is the run order for both phases. An absent phase
    /// is skipped without disturbing the order of the others.
    pub fn register(&mut self, middleware: impl Middleware) -> &mut Self {
        self.request_interceptors.extend(middleware.request_interceptor());
        self.response_interceptors.extend(middleware.response_interceptor());
        self
    }

    /// Sets the terminal handler.
    ///
    /// # Errors
    ///
    /// [`Error::HandlerAlreadySet`] if a handler was set before. The first
    /// handler stays in place.
    pub fn set_terminal_handler(&mut self, handler: impl Handler) -> Result<(), Error> {
        if self.handler.is_some() {
            return Err(Error::HandlerAlreadySet);
        }
        self.handler = Some(handler.into_boxed_handler());
        Ok(())
    }

    pub fn has_terminal_handler(&self) -> bool {
        self.handler.is_some()
    }

    /// Runs one request through the pipeline and writes exactly one response
    /// to `transport`.
    ///
    /// 1. Request interceptors run in registration order. The first to return
    ///    a response has it written; nothing else runs.
    /// 2. Otherwise the terminal handler produces the working response.
    /// 3. Response interceptors edit it in registration order. The first to
    ///    fail has [`Response::from_error`] written in its place; later
    ///    interceptors do not run.
    /// 4. Otherwise the edited working response is written.
    ///
    /// Interceptor failures are absorbed silently: nothing is logged or
    /// retried here.
    ///
    /// # Errors
    ///
    /// [`Error::MissingHandler`] if no terminal handler was set. This is
    /// checked before any interceptor runs, and nothing is written.
    pub fn dispatch<T: Transport + ?Sized>(
        &self,
        req: &Request,
        transport: &mut T,
    ) -> Result<(), Error> {
        let handler = self.handler.as_ref().ok_or(Error::MissingHandler)?;

        for intercept in &self.request_interceptors {
            if let Some(res) = intercept(req) {
                res.write(transport);
                return Ok(());
            }
        }

        let mut res = handler.call(req);

        for intercept in &self.response_interceptors {
            if let Err(err) = intercept(&mut res) {
                Response::from_error(&err).write(transport);
                return Ok(());
            }
        }

        res.write(transport);
        Ok(())
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("request_interceptors", &self.request_interceptors.len())
            .field("response_interceptors", &self.response_interceptors.len())
            .field("has_terminal_handler", &self.handler.is_some())
            .finish()
    }
}
