//! The I/O seam of the client controllers.

use async_trait::async_trait;
use thiserror::Error;
use url::Url;

use crate::cancel::CancelToken;
use crate::method::Method;

/// One API call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Vec<u8>>,
    pub bearer: Option<String>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self { method: Method::Get, path: path.into(), body: None, bearer: None }
    }

    pub fn post_json(path: impl Into<String>, body: Vec<u8>) -> Self {
        Self { method: Method::Post, path: path.into(), body: Some(body), bearer: None }
    }

    pub fn bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }
}

/// Status and body of a completed call. Any status counts as completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The server's explanation: the JSON `message` field when present,
    /// otherwise the trimmed body text.
    pub fn message(&self) -> Option<String> {
        #[derive(serde::Deserialize)]
        struct Body {
            message: String,
        }

        if let Ok(body) = serde_json::from_slice::<Body>(&self.body) {
            return Some(body.message).filter(|m| !m.is_empty());
        }
        let text = String::from_utf8_lossy(&self.body).trim().to_owned();
        (!text.is_empty()).then_some(text)
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request cancelled")]
    Cancelled,

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    #[error("unreachable: {0}")]
    Unreachable(String),

    #[error("http: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unsupported method {0}")]
    UnsupportedMethod(Method),
}

/// Sends API requests. Implementations must stop waiting and return
/// [`TransportError::Cancelled`] once `cancel` fires.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ApiRequest, cancel: &CancelToken) -> Result<ApiResponse, TransportError>;
}

/// [`Transport`] over HTTP with `reqwest`.
pub struct HttpTransport {
    client: reqwest::Client,
    base: Url,
}

impl HttpTransport {
    /// `base` is the site root, e.g. `http://localhost:3000/`.
    pub fn new(base: &str) -> Result<Self, TransportError> {
        Ok(Self { client: reqwest::Client::new(), base: Url::parse(base)? })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest, cancel: &CancelToken) -> Result<ApiResponse, TransportError> {
        let url = self.base.join(&request.path)?;
        let mut builder = match request.method {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url),
            other => return Err(TransportError::UnsupportedMethod(other)),
        };
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = request.body {
            builder = builder.header("content-type", "application/json").body(body);
        }

        let exchange = async {
            let response = builder.send().await.map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    TransportError::Unreachable(e.to_string())
                } else {
                    TransportError::Http(e)
                }
            })?;
            let status = response.status().as_u16();
            let body = response.bytes().await?.to_vec();
            Ok::<_, TransportError>(ApiResponse { status, body })
        };

        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(TransportError::Cancelled),
            result = exchange => result,
        }
    }
}
