//! Error types.
//!
//! Two layers:
//!
//! - [`Error`] surfaces infrastructure failures: binding a port, loading
//!   configuration, connecting the database. These end the process.
//! - [`ApiError`] is what request handlers fail with. It converts into a
//!   response with a `{"message": …}` body; store failures become an opaque
//!   `500` and the cause is only logged.

use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::config::ConfigError;
use crate::entity::ValidationError;
use crate::response::{IntoResponse, Response};
use crate::status::Status;
use crate::store::StoreError;

/// The error type returned by the service's fallible startup operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("config: {0}")]
    Config(#[from] ConfigError),

    #[error("store: {0}")]
    Store(#[from] StoreError),
}

/// A request-scoped failure, rendered as a JSON error response.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Malformed payload")]
    MalformedPayload,

    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Invalid password")]
    InvalidPassword,

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Payload too large")]
    PayloadTooLarge,

    #[error("Internal server error")]
    Store(#[from] StoreError),
}

impl ApiError {
    pub fn status(&self) -> Status {
        match self {
            Self::MalformedPayload => Status::BadRequest,
            Self::Validation(_) => Status::UnprocessableContent,
            Self::Unauthorized | Self::InvalidPassword => Status::Unauthorized,
            Self::MethodNotAllowed => Status::MethodNotAllowed,
            Self::PayloadTooLarge => Status::PayloadTooLarge,
            Self::Store(_) => Status::InternalServerError,
        }
    }
}

/// Wire shape of every error body.
#[derive(Serialize)]
pub(crate) struct ErrorBody<'a> {
    pub message: &'a str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Store(cause) = &self {
            error!(error = %cause, "store failure");
        }

        let message = self.to_string();
        let body = serde_json::to_vec(&ErrorBody { message: &message }).unwrap_or_default();
        Response::builder().status(self.status()).json(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_failures_are_opaque() {
        let err = ApiError::Store(StoreError::Database(sqlx::Error::PoolClosed));
        let res = err.into_response();
        assert_eq!(res.status_code(), 500);
        assert_eq!(res.body(), br#"{"message":"Internal server error"}"#);
    }

    #[test]
    fn validation_failures_carry_their_message() {
        let res = ApiError::from(ValidationError::Required("Name")).into_response();
        assert_eq!(res.status_code(), 422);
        assert_eq!(res.body(), br#"{"message":"Name is required"}"#);
    }
}
