//! Health-check handlers.
//!
//! | Check | Path | Question |
//! |---|---|---|
//! | **Liveness** | `/healthz` | Is the process alive? Failure → restart. |
//! | **Readiness** | `/readyz` | Can the record store be reached? Failure → pulled from load-balancer. |

use tracing::warn;

use crate::state::AppState;
use crate::store::Store;
use crate::{Request, Response, Status};

/// Always `200 OK` with body `"ok"`. No dependencies.
pub async fn liveness<S>(_state: S, _req: Request) -> Response {
    Response::text("ok")
}

/// `200 OK` with body `"ready"` when the store answers a ping, otherwise
/// `503 Service Unavailable`.
pub async fn readiness<St: Store>(state: AppState<St>, _req: Request) -> Response {
    match state.store.ping().await {
        Ok(()) => Response::text("ready"),
        Err(e) => {
            warn!(error = %e, "readiness check failed");
            Response::builder().status(Status::ServiceUnavailable).text("unavailable")
        }
    }
}
