use std::sync::Arc;

use super::{Middleware, RequestInterceptor, ResponseInterceptor};
use crate::error::BoxError;
use crate::request::Request;
use crate::response::Response;

/// Middleware assembled from independently supplied functions.
///
/// ```rust
/// use http::{HeaderValue, StatusCode, header};
/// use sheath::Response;
/// use sheath::middleware::BasicMiddleware;
///
/// let auth = BasicMiddleware::new(
///     |req| match req.header("authorization") {
///         Some(_) => None,
///         None => Some(Response::new(StatusCode::FORBIDDEN, "forbidden")),
///     },
///     |res| {
///         res.headers_mut().insert(header::VARY, HeaderValue::from_static("authorization"));
///         Ok(())
///     },
/// );
/// ```
#[derive(Clone, Default)]
pub struct BasicMiddleware {
    request: Option<RequestInterceptor>,
    response: Option<ResponseInterceptor>,
}

impl BasicMiddleware {
    pub fn new<Rq, Rs>(request: Rq, response: Rs) -> Self
    where
        Rq: Fn(&Request) -> Option<Response> + Send + Sync + 'static,
        Rs: Fn(&mut Response) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        Self { request: Some(Arc::new(request)), response: Some(Arc::new(response)) }
    }

    /// Middleware with only a request phase.
    pub fn on_request<Rq>(request: Rq) -> Self
    where
        Rq: Fn(&Request) -> Option<Response> + Send + Sync + 'static,
    {
        Self { request: Some(Arc::new(request)), response: None }
    }

    /// Middleware with only a response phase.
    pub fn on_response<Rs>(response: Rs) -> Self
    where
        Rs: Fn(&mut Response) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        Self { request: None, response: Some(Arc::new(response)) }
    }

    /// Wraps already-erased functions, either of which may be absent.
    pub fn from_parts(
        request: Option<RequestInterceptor>,
        response: Option<ResponseInterceptor>,
    ) -> Self {
        Self { request, response }
    }
}

impl Middleware for BasicMiddleware {
    fn request_interceptor(&self) -> Option<RequestInterceptor> {
        self.request.clone()
    }

    fn response_interceptor(&self) -> Option<ResponseInterceptor> {
        self.response.clone()
    }
}
