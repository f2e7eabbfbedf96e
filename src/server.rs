//! HTTP server and graceful shutdown.
//!
//! The server is the transport the pipeline was built for: it accepts
//! connections, buffers each request, calls
//! [`Pipeline::dispatch`](crate::Pipeline::dispatch) once per request and
//! flushes whatever was written.
//!
//! Interceptors and the terminal handler are plain synchronous functions
//! that may block, so every dispatch runs on tokio's blocking pool rather
//! than on an async worker. Each in-flight request gets its own thread.
//!
//! Request bodies are buffered up to [`Server::max_body_size`] bytes
//! (default [`DEFAULT_MAX_BODY_SIZE`]); larger bodies are answered with
//! `413 Payload Too Large` without reaching the pipeline.
//!
//! # Graceful shutdown
//!
//! On SIGTERM or Ctrl-C (or when the future given to
//! [`Server::serve_with_shutdown`] resolves) the server:
//! 1. Stops `listener.accept()`, so no new connections are made.
//! 2. Lets every in-flight connection task run to completion.
//! 3. Returns from `serve`, which lets `main` exit cleanly.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::error::Error;
use crate::pipeline::Pipeline;
use crate::request::Request;
use crate::response::Response;
use crate::transport::Recorder;

/// Body cap used unless [`Server::max_body_size`] says otherwise: 2 MiB.
pub const DEFAULT_MAX_BODY_SIZE: usize = 2 * 1024 * 1024;

enum Listen {
    Addr(SocketAddr),
    Listener(TcpListener),
}

/// The HTTP server.
pub struct Server {
    listen: Listen,
    max_body_size: usize,
}

impl Server {
    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidAddress`] if `addr` is not a valid `host:port` string.
    ///
    /// ```rust,no_run
    /// use sheath::Server;
    /// let server = Server::bind("0.0.0.0:3000")?;
    /// # Ok::<(), sheath::Error>(())
    /// ```
    pub fn bind(addr: &str) -> Result<Self, Error> {
        let parsed = addr.parse::<SocketAddr>().map_err(|source| Error::InvalidAddress {
            addr: addr.to_owned(),
            source,
        })?;
        Ok(Self { listen: Listen::Addr(parsed), max_body_size: DEFAULT_MAX_BODY_SIZE })
    }

    /// Serves on an already-bound listener, e.g. one bound to port `0`.
    pub fn from_listener(listener: TcpListener) -> Self {
        Self { listen: Listen::Listener(listener), max_body_size: DEFAULT_MAX_BODY_SIZE }
    }

    /// Largest request body, in bytes, that is buffered and dispatched.
    pub fn max_body_size(mut self, bytes: usize) -> Self {
        self.max_body_size = bytes;
        self
    }

    /// Starts accepting connections and dispatching them through `pipeline`.
    ///
    /// Returns only after a full graceful shutdown (SIGTERM or Ctrl-C,
    /// followed by all in-flight requests completing).
    pub async fn serve(self, pipeline: Pipeline) -> Result<(), Error> {
        self.serve_with_shutdown(pipeline, shutdown_signal()).await
    }

    /// Like [`serve`](Server::serve), but shuts down when `signal` resolves.
    ///
    /// # Errors
    ///
    /// [`Error::MissingHandler`] before binding if `pipeline` has no terminal
    /// handler, or [`Error::Io`] if binding fails.
    pub async fn serve_with_shutdown(
        self,
        pipeline: Pipeline,
        signal: impl Future<Output = ()>,
    ) -> Result<(), Error> {
        if !pipeline.has_terminal_handler() {
            return Err(Error::MissingHandler);
        }

        let listener = match self.listen {
            Listen::Addr(addr) => TcpListener::bind(addr).await?,
            Listen::Listener(listener) => listener,
        };
        let local_addr = listener.local_addr()?;
        let max_body_size = self.max_body_size;

        // Frozen from here on: every connection task shares it read-only.
        let pipeline = Arc::new(pipeline);

        info!(addr = %local_addr, "sheath listening");

        let mut tasks = tokio::task::JoinSet::new();

        tokio::pin!(signal);

        loop {
            tokio::select! {
                // Check shutdown first so a signal stops accepting
                // immediately, even if more connections are queued.
                biased;

                () = &mut signal => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = listener.accept() => {
                    let (stream, remote_addr) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let pipeline = Arc::clone(&pipeline);
                    let io = TokioIo::new(stream);

                    tasks.spawn(async move {
                        // Called once per request on the connection.
                        let svc = service_fn(move |req| {
                            let pipeline = Arc::clone(&pipeline);
                            async move { dispatch(pipeline, req, remote_addr, max_body_size).await }
                        });

                        if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                            .serve_connection(io, svc)
                            .await
                        {
                            error!(peer = %remote_addr, "connection error: {e}");
                        }
                    });
                }

                // Reap finished connection tasks so the JoinSet does not grow
                // without bound on long-running servers.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        while tasks.join_next().await.is_some() {}

        info!("sheath stopped");
        Ok(())
    }
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Buffers one request, runs it through the pipeline on the blocking pool
/// and returns what was written.
///
/// Failures are answered with a response, so hyper never sees an error.
async fn dispatch(
    pipeline: Arc<Pipeline>,
    req: hyper::Request<Incoming>,
    remote_addr: SocketAddr,
    max_body_size: usize,
) -> Result<http::Response<Full<Bytes>>, Infallible> {
    let (parts, body) = req.into_parts();

    let body = match Limited::new(body, max_body_size).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) if e.is::<LengthLimitError>() => {
            warn!(peer = %remote_addr, limit = max_body_size, "request body too large");
            let res = Response::new(StatusCode::PAYLOAD_TOO_LARGE, "request body too large");
            return Ok(written(&res));
        }
        Err(e) => {
            warn!(peer = %remote_addr, "failed to read request body: {e}");
            let res = Response::new(StatusCode::BAD_REQUEST, "unreadable request body");
            return Ok(written(&res));
        }
    };

    let request = Request::from(http::Request::from_parts(parts, body))
        .with_remote_addr(remote_addr);

    let outcome = tokio::task::spawn_blocking(move || {
        let mut rec = Recorder::new();
        if let Err(e) = pipeline.dispatch(&request, &mut rec) {
            error!(path = request.path(), "dispatch failed: {e}");
            Response::from_error(&e).write(&mut rec);
        }
        rec
    })
    .await;

    match outcome {
        Ok(rec) => Ok(rec.into_http_response()),
        // The pipeline panicked or the runtime is shutting down.
        Err(e) => {
            error!(peer = %remote_addr, "dispatch task failed: {e}");
            Ok(written(&Response::from_error(&e)))
        }
    }
}

fn written(res: &Response) -> http::Response<Full<Bytes>> {
    let mut rec = Recorder::new();
    res.write(&mut rec);
    rec.into_http_response()
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first shutdown signal the process receives.
///
/// On Unix this listens for both **SIGTERM** and **SIGINT** (Ctrl-C). On
/// other platforms only Ctrl-C is available. If a handler cannot be
/// installed, that arm never resolves.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl-C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}
