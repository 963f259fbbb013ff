//! JSON API handlers.
//!
//! One `list`/`create` pair serves every entity kind; the kind is chosen by
//! the type parameter at route registration. `create` requires a bearer
//! token issued by [`login`].

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::entity::{Entity, NewEntity};
use crate::error::ApiError;
use crate::response::{Created, Json};
use crate::state::AppState;
use crate::store::Store;
use crate::Request;

/// `GET /api/<collection>`: every record of kind `E`.
pub async fn list<E: Entity, St: Store>(
    state: AppState<St>,
    _req: Request,
) -> Result<Json<Vec<E>>, ApiError> {
    let records = state.store.find_many::<E>().await?;
    debug!(kind = E::KIND.noun(), count = records.len(), "listed records");
    Ok(Json(records))
}

/// `POST /api/<collection>`: inserts one record of kind `E`.
pub async fn create<E: Entity, St: Store>(
    state: AppState<St>,
    req: Request,
) -> Result<Created<E>, ApiError> {
    let authorized = req.bearer_token().is_some_and(|token| state.auth.verify(token));
    if !authorized {
        warn!(kind = E::KIND.noun(), "create rejected: missing or invalid token");
        return Err(ApiError::Unauthorized);
    }

    let new: E::New = req.json().map_err(|e| {
        debug!(kind = E::KIND.noun(), "malformed payload: {e}");
        ApiError::MalformedPayload
    })?;
    new.check()?;

    let record: E = state.store.create(new).await?;
    info!(kind = E::KIND.noun(), id = record.id(), "record created");

    Ok(Created { location: E::KIND.detail_href(record.id()), body: record })
}

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
}

/// `POST /api/login`: exchanges the admin password for a bearer token.
pub async fn login<St: Store>(
    state: AppState<St>,
    req: Request,
) -> Result<Json<LoginResponse>, ApiError> {
    let body: LoginRequest = req.json().map_err(|_| ApiError::MalformedPayload)?;
    if body.password.is_empty() {
        return Err(ApiError::MalformedPayload);
    }

    match state.auth.login(&body.password) {
        Some(token) => {
            info!("admin logged in");
            Ok(Json(LoginResponse { token }))
        }
        None => {
            warn!("admin login rejected");
            Err(ApiError::InvalidPassword)
        }
    }
}
