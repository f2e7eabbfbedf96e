//! Unified error type.

use std::net::AddrParseError;

use thiserror::Error;

/// A failure reported by a response interceptor.
///
/// Never escapes [`Pipeline::dispatch`](crate::Pipeline::dispatch): it is
/// turned into a `500` via [`Response::from_error`](crate::Response::from_error).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The error type returned by sheath's fallible operations.
///
/// Request rejections (403, 429, etc.) are expressed as HTTP
/// [`Response`](crate::Response) values, not as `Error`s. This type surfaces
/// setup mistakes and infrastructure failures.
#[derive(Debug, Error)]
pub enum Error {
    /// A terminal handler was registered on a pipeline that already has one.
    #[error("handler already set")]
    HandlerAlreadySet,

    /// A pipeline was dispatched or served without a terminal handler.
    #[error("terminal handler not set: call `Pipeline::set_terminal_handler` before dispatching")]
    MissingHandler,

    /// `Server::bind` was given something that is not `host:port`.
    #[error("invalid socket address `{addr}`: {source}")]
    InvalidAddress {
        addr: String,
        #[source]
        source: AddrParseError,
    },

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}
