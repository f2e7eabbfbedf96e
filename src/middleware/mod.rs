//! Middleware layer.
//!
//! Middleware is the right place for cross-cutting concerns: authentication
//! checks, rate limiting, request logging, response post-processing. Each
//! middleware contributes up to two functions to a [`Pipeline`](crate::Pipeline):
//!
//! - a [`RequestInterceptor`], which sees the request before the terminal
//!   handler and may answer it early by returning `Some(response)`;
//! - a [`ResponseInterceptor`], which edits the working response in place
//!   and may abort the dispatch by returning `Err`.
//!
//! Both sides run in registration order. Response interceptors are **not**
//! unwound in reverse.
//!
//! Most middleware is built from two closures with [`BasicMiddleware`].
//! Implement [`Middleware`] yourself when the two sides share state.

mod basic;

use std::sync::Arc;

use crate::error::BoxError;
use crate::request::Request;
use crate::response::Response;

pub use basic::BasicMiddleware;

/// Request-phase function. `None` means "continue".
pub type RequestInterceptor = Arc<dyn Fn(&Request) -> Option<Response> + Send + Sync + 'static>;

/// Response-phase function. `Err` aborts the dispatch with a `500`.
pub type ResponseInterceptor =
    Arc<dyn Fn(&mut Response) -> Result<(), BoxError> + Send + Sync + 'static>;

/// A paired request-phase / response-phase behaviour.
///
/// Either side may be absent, in which case the pipeline passes straight
/// through that phase for this middleware.
pub trait Middleware {
    fn request_interceptor(&self) -> Option<RequestInterceptor>;
    fn response_interceptor(&self) -> Option<ResponseInterceptor>;
}
