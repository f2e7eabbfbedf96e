//! Outgoing HTTP response type and the [`IntoResponse`] conversion trait.
//!
//! A [`Response`] is produced once per dispatch, either by a short-circuiting
//! request interceptor or by the terminal handler. Response interceptors then
//! edit that same value in place through `&mut Response` before it is written.

use std::fmt;

use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, StatusCode};

use crate::transport::Transport;

// ── Response ─────────────────────────────────────────────────────────────────

/// An outgoing HTTP response.
///
/// ```rust
/// use http::{HeaderValue, StatusCode, header};
/// use sheath::Response;
///
/// let res = Response::new(StatusCode::CREATED, r#"{"id":42}"#)
///     .with_header(header::LOCATION, HeaderValue::from_static("/users/42"));
/// assert_eq!(res.status(), StatusCode::CREATED);
/// ```
#[derive(Clone, Debug, Default)]
pub struct Response {
    status: StatusCode,
    body: String,
    headers: HeaderMap,
}

impl Response {
    /// A response with the given status and body, and no headers.
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self { status, body: body.into(), headers: HeaderMap::new() }
    }

    /// Response with no body.
    pub fn status_only(status: StatusCode) -> Self {
        Self::new(status, String::new())
    }

    /// `500 Internal Server Error` whose body is the error's message.
    ///
    /// Never fails and carries no headers.
    pub fn from_error<E: fmt::Display + ?Sized>(err: &E) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
    }

    /// Appends a header value. Earlier values under the same name are kept.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn status(&self) -> StatusCode { self.status }
    pub fn set_status(&mut self, status: StatusCode) { self.status = status; }
    pub fn body(&self) -> &str { &self.body }
    pub fn body_mut(&mut self) -> &mut String { &mut self.body }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn headers_mut(&mut self) -> &mut HeaderMap { &mut self.headers }

    /// Writes headers, status and body to `transport`, in that order.
    ///
    /// Only the first value stored under each header name is sent, and it
    /// replaces anything the transport already held under that name. Nothing
    /// is added implicitly: no `content-type`, no `content-length`.
    pub fn write<T: Transport + ?Sized>(&self, transport: &mut T) {
        let out = transport.headers_mut();
        for name in self.headers.keys() {
            if let Some(value) = self.headers.get(name) {
                out.insert(name.clone(), value.clone());
            }
        }
        transport.write_status(self.status);
        transport.write_body(self.body.as_bytes());
    }
}

// ── IntoResponse ──────────────────────────────────────────────────────────────

/// Conversion into an HTTP [`Response`].
///
/// Terminal handlers may return any type implementing this trait.
pub trait IntoResponse {
    fn into_response(self) -> Response;
}

impl IntoResponse for Response {
    fn into_response(self) -> Response { self }
}

impl IntoResponse for &'static str {
    fn into_response(self) -> Response { Response::new(StatusCode::OK, self) }
}

impl IntoResponse for String {
    fn into_response(self) -> Response { Response::new(StatusCode::OK, self) }
}

/// Return a bare status from a handler: `StatusCode::NO_CONTENT`
impl IntoResponse for StatusCode {
    fn into_response(self) -> Response { Response::status_only(self) }
}

impl<B: Into<String>> IntoResponse for (StatusCode, B) {
    fn into_response(self) -> Response { Response::new(self.0, self.1) }
}

#[cfg(test)]
mod tests {
    use http::header;

    use super::*;
    use crate::transport::Recorder;

    #[test]
    fn from_error_is_a_bare_500() {
        let res = Response::from_error("disk on fire");
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(res.body(), "disk on fire");
        assert!(res.headers().is_empty());
    }

    #[test]
    fn write_sends_status_and_body_verbatim() {
        let mut rec = Recorder::new();
        Response::new(StatusCode::ACCEPTED, "<b>&raw</b>").write(&mut rec);

        assert_eq!(rec.status(), Some(StatusCode::ACCEPTED));
        assert_eq!(rec.body_str(), "<b>&raw</b>");
        assert!(rec.headers().is_empty());
    }

    #[test]
    fn write_sends_only_the_first_value_per_header() {
        let res = Response::new(StatusCode::OK, "")
            .with_header(header::SET_COOKIE, HeaderValue::from_static("a=1"))
            .with_header(header::SET_COOKIE, HeaderValue::from_static("b=2"))
            .with_header(header::VARY, HeaderValue::from_static("accept"));
        assert_eq!(res.headers().get_all(header::SET_COOKIE).iter().count(), 2);

        let mut rec = Recorder::new();
        res.write(&mut rec);

        let sent: Vec<_> = rec.headers().get_all(header::SET_COOKIE).iter().collect();
        assert_eq!(sent, [&HeaderValue::from_static("a=1")]);
        assert_eq!(rec.headers().get(header::VARY).unwrap(), "accept");
    }

    #[test]
    fn write_replaces_headers_already_on_the_transport() {
        let mut rec = Recorder::new();
        rec.headers_mut().insert(header::SERVER, HeaderValue::from_static("old"));
        rec.headers_mut().insert(header::DATE, HeaderValue::from_static("today"));

        Response::new(StatusCode::OK, "")
            .with_header(header::SERVER, HeaderValue::from_static("sheath"))
            .write(&mut rec);

        assert_eq!(rec.headers().get(header::SERVER).unwrap(), "sheath");
        assert_eq!(rec.headers().get(header::DATE).unwrap(), "today");
    }

    #[test]
    fn into_response_conversions() {
        assert_eq!("ok".into_response().body(), "ok");
        assert_eq!(StatusCode::NO_CONTENT.into_response().body(), "");
        let res = (StatusCode::FORBIDDEN, "forbidden").into_response();
        assert_eq!((res.status(), res.body()), (StatusCode::FORBIDDEN, "forbidden"));
    }
}
