//! The outbound side of a dispatch.
//!
//! [`Transport`] is the narrow surface the pipeline writes through: a mutable
//! header set, one status line, a body. [`Recorder`] is the in-memory
//! implementation. The server hands a fresh one to every dispatch and turns
//! it into a hyper response afterwards; tests inspect it directly.

use bytes::{Bytes, BytesMut};
use http::{HeaderMap, StatusCode};
use http_body_util::Full;
use tracing::warn;

/// Where a [`Response`](crate::Response) is written to.
pub trait Transport {
    /// The outgoing header set. Changes after `write_status` are not
    /// guaranteed to reach the client.
    fn headers_mut(&mut self) -> &mut HeaderMap;

    fn write_status(&mut self, status: StatusCode);

    fn write_body(&mut self, body: &[u8]);
}

/// An in-memory [`Transport`].
///
/// The first `write_status` wins. Later ones are counted and ignored.
#[derive(Debug, Default)]
pub struct Recorder {
    status: Option<StatusCode>,
    status_writes: usize,
    headers: HeaderMap,
    body: BytesMut,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// The status written, if any.
    pub fn status(&self) -> Option<StatusCode> { self.status }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// How many times `write_status` was called, including ignored calls.
    pub fn status_writes(&self) -> usize { self.status_writes }

    /// The body as text, with invalid UTF-8 replaced.
    pub fn body_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Converts the recording into a response hyper can send.
    ///
    /// A recorder that never saw a status answers `200 OK`.
    pub fn into_http_response(self) -> http::Response<Full<Bytes>> {
        let mut res = http::Response::new(Full::new(self.body.freeze()));
        *res.status_mut() = self.status.unwrap_or(StatusCode::OK);
        *res.headers_mut() = self.headers;
        res
    }
}

impl Transport for Recorder {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn write_status(&mut self, status: StatusCode) {
        self.status_writes += 1;
        match self.status {
            Some(first) => warn!(%first, ignored = %status, "superfluous status write"),
            None => self.status = Some(status),
        }
    }

    fn write_body(&mut self, body: &[u8]) {
        self.body.extend_from_slice(body);
    }
}
