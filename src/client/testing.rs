//! Scripted [`Transport`] for controller tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::transport::{ApiRequest, ApiResponse, Transport, TransportError};
use crate::cancel::CancelToken;
use crate::method::Method;

#[derive(Clone)]
pub(crate) enum Reply {
    Respond(u16, String),
    Unreachable,
    /// Never answers; resolves only through cancellation.
    Hang,
}

/// Answers each `(method, path)` with a fixed [`Reply`] and records every
/// request it receives. Unscripted paths answer `404`.
#[derive(Default)]
pub(crate) struct FakeTransport {
    replies: Mutex<HashMap<(Method, String), Reply>>,
    sent: Mutex<Vec<ApiRequest>>,
}

impl FakeTransport {
    pub(crate) fn reply(self, method: Method, path: &str, reply: Reply) -> Self {
        self.replies.lock().unwrap().insert((method, path.to_owned()), reply);
        self
    }

    pub(crate) fn sent(&self) -> Vec<ApiRequest> {
        self.sent.lock().unwrap().clone()
    }

    pub(crate) fn sent_to(&self, path: &str) -> usize {
        self.sent().iter().filter(|r| r.path == path).count()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(&self, request: ApiRequest, cancel: &CancelToken) -> Result<ApiResponse, TransportError> {
        let reply = self.replies.lock().unwrap()
            .get(&(request.method, request.path.clone()))
            .cloned()
            .unwrap_or(Reply::Respond(404, String::new()));
        self.sent.lock().unwrap().push(request);

        if cancel.is_cancelled() {
            return Err(TransportError::Cancelled);
        }
        match reply {
            Reply::Respond(status, body) => Ok(ApiResponse { status, body: body.into_bytes() }),
            Reply::Unreachable => Err(TransportError::Unreachable("connection refused".into())),
            Reply::Hang => {
                cancel.cancelled().await;
                Err(TransportError::Cancelled)
            }
        }
    }
}
