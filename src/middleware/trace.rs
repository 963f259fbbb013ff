//! Per-request tracing.

use std::future::Future;
use std::time::Instant;

use tracing::{Instrument, info, info_span, warn};

use crate::method::Method;
use crate::response::Response;

/// Runs `handle` inside a `request` span and logs its outcome.
///
/// Server errors log at `warn`; everything else at `info`.
pub(crate) async fn traced<F>(method: Method, path: &str, handle: F) -> Response
where
    F: Future<Output = Response>,
{
    let span = info_span!("request", %method, path);
    let started = Instant::now();
    let response = handle.instrument(span.clone()).await;
    let latency_ms = started.elapsed().as_millis() as u64;

    span.in_scope(|| {
        if response.status >= 500 {
            warn!(status = response.status, latency_ms, "request failed");
        } else {
            info!(status = response.status, latency_ms, "request completed");
        }
    });
    response
}
