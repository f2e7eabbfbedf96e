//! Terminal handler trait and type erasure.
//!
//! # How handlers are stored
//!
//! A [`Pipeline`](crate::Pipeline) holds exactly one terminal handler, but
//! every application's handler is a different closure type. The pipeline
//! stores it as a **trait object** (`dyn ErasedHandler`) so `Pipeline` itself
//! stays a plain, non-generic type.
//!
//! ```text
//! fn hello(req: &Request) -> Response { … }        ← user writes this
//!        ↓ pipeline.set_terminal_handler(hello)
//! hello.into_boxed_handler()                       ← Handler blanket impl
//!        ↓
//! Arc::new(FnHandler(hello))                       ← heap-allocated wrapper
//!        ↓  stored as BoxedHandler = Arc<dyn ErasedHandler>
//! handler.call(&req)  at dispatch time             ← one vtable dispatch
//! ```
//!
//! Handlers run synchronously on the thread that called
//! [`Pipeline::dispatch`](crate::Pipeline::dispatch).

use std::sync::Arc;

use crate::request::Request;
use crate::response::{IntoResponse, Response};

// ── Internal types ────────────────────────────────────────────────────────────

/// Internal dispatch interface.
///
/// `#[doc(hidden)] pub` rather than `pub(crate)` because it appears in the
/// return type of the public `Handler` trait's `into_boxed_handler` method.
#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, req: &Request) -> Response;
}

/// A type-erased handler shared by every concurrent dispatch.
#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

// ── Public Handler trait ──────────────────────────────────────────────────────

/// Implemented for every valid terminal handler.
///
/// You never implement this yourself. It is automatically satisfied for any
/// function or closure with the signature:
///
/// ```text
/// fn name(req: &Request) -> impl IntoResponse
/// ```
///
/// The trait is **sealed**: only the blanket impl below can satisfy it.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

mod private {
    pub trait Sealed {}
}

// ── Blanket implementations ───────────────────────────────────────────────────

impl<F, R> private::Sealed for F
where
    F: Fn(&Request) -> R + Send + Sync + 'static,
    R: IntoResponse,
{
}

impl<F, R> Handler for F
where
    F: Fn(&Request) -> R + Send + Sync + 'static,
    R: IntoResponse,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(self))
    }
}

// ── Concrete wrapper ──────────────────────────────────────────────────────────

/// Bridges a concrete handler `F` to the trait-object world.
struct FnHandler<F>(F);

impl<F, R> ErasedHandler for FnHandler<F>
where
    F: Fn(&Request) -> R,
    R: IntoResponse,
{
    fn call(&self, req: &Request) -> Response {
        (self.0)(req).into_response()
    }
}
