//! HTTP server and graceful shutdown.
//!
//! On SIGTERM or Ctrl-C the server:
//! 1. Stops `listener.accept()`, so no new connections are made.
//! 2. Tells every open connection to finish its in-flight request and close.
//! 3. Waits for all connection tasks, then returns from [`Server::serve`].

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Body;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::cancel::CancelToken;
use crate::error::{ApiError, Error};
use crate::method::Method;
use crate::middleware::trace::traced;
use crate::request::Request;
use crate::response::{IntoResponse, Response};
use crate::router::{Router, method_not_allowed};
use crate::status::Status;

/// Largest request body accepted, in bytes. Larger bodies get `413`.
pub const MAX_BODY_BYTES: usize = 64 * 1024;

/// The HTTP server.
pub struct Server {
    addr: SocketAddr,
}

impl Server {
    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called.
    pub fn bind(addr: SocketAddr) -> Self {
        Self { addr }
    }

    /// Binds, then serves `router` until SIGTERM or Ctrl-C.
    pub async fn serve<S>(self, router: Router<S>) -> Result<(), Error>
    where
        S: Clone + Send + Sync + 'static,
    {
        let listener = TcpListener::bind(self.addr).await?;
        serve_with_shutdown(listener, router, shutdown_signal()).await
    }
}

/// Serves `router` on an already-bound listener until `signal` resolves.
pub async fn serve_with_shutdown<S, F>(
    listener: TcpListener,
    router: Router<S>,
    signal: F,
) -> Result<(), Error>
where
    S: Clone + Send + Sync + 'static,
    F: Future<Output = ()>,
{
    let router = Arc::new(router);
    let stopping = CancelToken::new();
    let mut tasks = JoinSet::new();

    info!(addr = %listener.local_addr()?, "listening");

    tokio::pin!(signal);

    loop {
        tokio::select! {
            // Shutdown first, so a signal stops accepting even with a backlog.
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

                let router = Arc::clone(&router);
                let stopping = stopping.clone();
                let io = TokioIo::new(stream);

                tasks.spawn(async move {
                    let svc = service_fn(move |req| {
                        let router = Arc::clone(&router);
                        async move { dispatch(router, req).await }
                    });

                    let builder = ConnBuilder::new(TokioExecutor::new());
                    let conn = builder.serve_connection(io, svc);
                    tokio::pin!(conn);

                    let result = tokio::select! {
                        res = conn.as_mut() => res,
                        () = stopping.cancelled() => {
                            conn.as_mut().graceful_shutdown();
                            conn.await
                        }
                    };
                    if let Err(e) = result {
                        error!(peer = %remote_addr, "connection error: {e}");
                    }
                });
            }

            // Reap finished connection tasks so the set stays bounded.
            Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
        }
    }

    stopping.cancel();
    while tasks.join_next().await.is_some() {}

    info!("stopped");
    Ok(())
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Routes one hyper request and produces one hyper response.
///
/// Infallible: every failure becomes a status code here, so hyper never sees
/// an error. Bodies over [`MAX_BODY_BYTES`] are refused with `413` without
/// being buffered past the limit.
async fn dispatch<S, B>(router: Arc<Router<S>>, req: hyper::Request<B>) -> Result<http::Response<Full<Bytes>>, Infallible>
where
    S: Clone + Send + Sync + 'static,
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let (parts, body) = req.into_parts();
    let path = parts.uri.path().to_owned();

    let Ok(method) = parts.method.as_str().parse::<Method>() else {
        warn!(method = %parts.method, %path, "unknown method");
        return Ok(method_not_allowed(&[]).into_inner());
    };

    if body.size_hint().lower() > MAX_BODY_BYTES as u64 {
        warn!(%method, %path, declared = body.size_hint().lower(), "request body too large");
        return Ok(ApiError::PayloadTooLarge.into_response().into_inner());
    }

    let body = match Limited::new(body, MAX_BODY_BYTES).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) if e.is::<LengthLimitError>() => {
            warn!(%method, %path, "request body too large");
            return Ok(ApiError::PayloadTooLarge.into_response().into_inner());
        }
        Err(e) => {
            warn!(%method, %path, "failed to read request body: {e}");
            return Ok(Response::status(Status::BadRequest).into_inner());
        }
    };

    let request = Request::from_parts(method, parts, body);
    let response = traced(method, &path, router.handle(request)).await;
    Ok(response.into_inner())
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first SIGTERM or SIGINT (Ctrl-C). On non-Unix platforms
/// only Ctrl-C is available. If a handler cannot be installed, that signal is
/// logged and ignored.
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
            Ok(mut stream) => {
                stream.recv().await;
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

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    use hyper::body::Frame;

    use super::*;

    /// A body sent in chunks with no declared length.
    struct Chunked(VecDeque<Bytes>);

    impl Body for Chunked {
        type Data = Bytes;
        type Error = Infallible;

        fn poll_frame(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Option<Result<Frame<Bytes>, Infallible>>> {
            Poll::Ready(self.0.pop_front().map(|chunk| Ok(Frame::data(chunk))))
        }
    }

    async fn body_len(_state: (), req: Request) -> String {
        req.body().len().to_string()
    }

    fn router() -> Arc<Router<()>> {
        Arc::new(Router::new(()).on(Method::Post, "/api/login", body_len))
    }

    fn post<B>(body: B) -> hyper::Request<B> {
        hyper::Request::post("/api/login").body(body).unwrap()
    }

    #[tokio::test]
    async fn bodies_within_the_limit_reach_the_handler() {
        let body = Full::new(Bytes::from(vec![b'a'; MAX_BODY_BYTES]));
        let res = dispatch(router(), post(body)).await.unwrap();
        assert_eq!(res.status().as_u16(), 200);
        assert_eq!(res.into_body().collect().await.unwrap().to_bytes(), MAX_BODY_BYTES.to_string());
    }

    #[tokio::test]
    async fn declared_oversized_body_is_refused() {
        let body = Full::new(Bytes::from(vec![b'a'; MAX_BODY_BYTES + 1]));
        let res = dispatch(router(), post(body)).await.unwrap();
        assert_eq!(res.status().as_u16(), 413);
        assert_eq!(res.into_body().collect().await.unwrap().to_bytes(), r#"{"message":"Payload too large"}"#);
    }

    #[tokio::test]
    async fn undeclared_oversized_body_is_cut_off() {
        let chunk = Bytes::from(vec![b'a'; 16 * 1024]);
        let chunks: VecDeque<Bytes> = std::iter::repeat_n(chunk, 64).collect();
        let res = dispatch(router(), post(Chunked(chunks))).await.unwrap();
        assert_eq!(res.status().as_u16(), 413);
    }

    #[tokio::test]
    async fn unknown_method_is_405() {
        let req = hyper::Request::builder()
            .method("BREW")
            .uri("/api/login")
            .body(Full::new(Bytes::new()))
            .unwrap();
        let res = dispatch(router(), req).await.unwrap();
        assert_eq!(res.status().as_u16(), 405);
    }
}
