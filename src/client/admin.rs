//! Admin console: login and the three creation forms.
//!
//! Each form keeps its own field values, error slot and success notice.
//! Submitting validates locally first (required fields, then URL shape, then
//! login) and only then calls the API, so a rejected form never touches the
//! network. Forms never affect one another.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::session::{Session, StorageError};
use super::transport::{ApiRequest, Transport, TransportError};
use crate::api::LoginResponse;
use crate::cancel::CancelToken;
use crate::entity::{EntityKind, is_web_url};

const LOGIN_PATH: &str = "/api/login";

/// Why a form submission did not create a record. The `Display` text is what
/// lands in the form's error slot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("{0} is required")]
    Required(&'static str),

    #[error("{0} must be a valid URL")]
    InvalidUrl(&'static str),

    #[error("You must be logged in")]
    NotLoggedIn,

    #[error("Failed to create {noun} ({status}) - {message}")]
    Rejected { noun: &'static str, status: u16, message: String },

    #[error("Failed to create {0}")]
    Failed(&'static str),
}

#[derive(Debug, Error)]
pub enum LoginError {
    #[error("Password is required")]
    EmptyPassword,

    #[error("{0}")]
    Rejected(String),

    #[error("No token returned")]
    NoToken,

    #[error("Login failed")]
    Transport(#[from] TransportError),

    #[error("Logged in, but the token could not be saved: {0}")]
    Storage(#[from] StorageError),
}

/// One creation form.
#[derive(Debug, Clone)]
pub struct Form {
    kind: EntityKind,
    values: BTreeMap<&'static str, String>,
    error: String,
    notice: Option<String>,
}

impl Form {
    pub fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            values: kind.fields().iter().map(|f| (f.name, String::new())).collect(),
            error: String::new(),
            notice: None,
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Sets a field. Returns `false` for a field this form does not have.
    pub fn set(&mut self, field: &str, value: impl Into<String>) -> bool {
        match self.kind.field(field) {
            Some(f) => {
                self.values.insert(f.name, value.into());
                true
            }
            None => false,
        }
    }

    pub fn value(&self, field: &str) -> Option<&str> {
        self.values.get(field).map(String::as_str)
    }

    pub fn values(&self) -> &BTreeMap<&'static str, String> {
        &self.values
    }

    /// Empty when the last submission had no error.
    pub fn error(&self) -> &str {
        &self.error
    }

    /// Acknowledgement of the last successful submission.
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    fn clear_values(&mut self) {
        self.values.values_mut().for_each(String::clear);
    }

    /// Checks the fields and builds the JSON body. Empty optional fields are
    /// sent as `null`.
    pub fn validate(&self) -> Result<Value, FormError> {
        let fields = self.kind.fields();
        let value = |name: &str| self.values.get(name).map(|v| v.trim()).unwrap_or_default();

        if let Some(missing) = fields.iter().find(|f| f.required && value(f.name).is_empty()) {
            return Err(FormError::Required(missing.label));
        }
        if let Some(bad) = fields.iter().find(|f| {
            let v = value(f.name);
            f.url && !v.is_empty() && !is_web_url(v)
        }) {
            return Err(FormError::InvalidUrl(bad.label));
        }

        let body: Map<String, Value> = fields.iter()
            .map(|f| {
                let v = value(f.name);
                let json = if v.is_empty() { Value::Null } else { Value::String(v.to_owned()) };
                (f.name.to_owned(), json)
            })
            .collect();
        Ok(Value::Object(body))
    }
}

/// The three forms, one per kind.
#[derive(Debug, Clone)]
struct Forms {
    restaurant: Form,
    activity: Form,
    advertisement: Form,
}

impl Forms {
    fn new() -> Self {
        Self {
            restaurant: Form::new(EntityKind::Restaurant),
            activity: Form::new(EntityKind::Activity),
            advertisement: Form::new(EntityKind::Advertisement),
        }
    }

    fn get(&self, kind: EntityKind) -> &Form {
        match kind {
            EntityKind::Restaurant => &self.restaurant,
            EntityKind::Activity => &self.activity,
            EntityKind::Advertisement => &self.advertisement,
        }
    }

    fn get_mut(&mut self, kind: EntityKind) -> &mut Form {
        match kind {
            EntityKind::Restaurant => &mut self.restaurant,
            EntityKind::Activity => &mut self.activity,
            EntityKind::Advertisement => &mut self.advertisement,
        }
    }
}

/// The admin console state holder.
///
/// Submissions take `&mut self`, so one console cannot have two submissions
/// in flight.
pub struct AdminConsole<T> {
    transport: T,
    session: Session,
    forms: Forms,
}

impl<T: Transport> AdminConsole<T> {
    pub fn new(transport: T, session: Session) -> Self {
        Self { transport, session, forms: Forms::new() }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn form(&self, kind: EntityKind) -> &Form {
        self.forms.get(kind)
    }

    pub fn form_mut(&mut self, kind: EntityKind) -> &mut Form {
        self.forms.get_mut(kind)
    }

    /// Exchanges `password` for a bearer token and stores it.
    pub async fn login(&mut self, password: &str) -> Result<(), LoginError> {
        if password.is_empty() {
            return Err(LoginError::EmptyPassword);
        }

        let body = serde_json::json!({ "password": password }).to_string().into_bytes();
        let response = self
            .transport
            .send(ApiRequest::post_json(LOGIN_PATH, body), &CancelToken::new())
            .await
            .inspect_err(|e| warn!(error = %e, "login request failed"))?;

        if !response.is_success() {
            let message = response.message().unwrap_or_else(|| "Invalid password".to_owned());
            return Err(LoginError::Rejected(message));
        }

        let token = serde_json::from_slice::<LoginResponse>(&response.body)
            .ok()
            .map(|r| r.token)
            .filter(|t| !t.is_empty())
            .ok_or(LoginError::NoToken)?;

        info!("logged in");
        self.session.set_token(token)?;
        Ok(())
    }

    /// Forgets the token in memory and in storage.
    pub fn logout(&mut self) -> Result<(), StorageError> {
        info!("logged out");
        self.session.clear()
    }

    /// Validates and submits one form. On success the form is cleared, its
    /// notice set, and the new record's id returned. On failure the form's
    /// error slot holds the message and its values are kept.
    pub async fn submit(&mut self, kind: EntityKind) -> Result<i64, FormError> {
        let form = self.forms.get_mut(kind);
        form.notice = None;

        let outcome = match (form.validate(), self.session.token()) {
            (Err(e), _) => Err(e),
            (Ok(_), None) => Err(FormError::NotLoggedIn),
            (Ok(body), Some(token)) => {
                form.error.clear();
                create(&self.transport, kind, body, token).await
            }
        };

        match outcome {
            Ok(id) => {
                info!(kind = kind.noun(), id, "created");
                form.clear_values();
                form.notice = Some(format!("{} created", kind.title()));
                Ok(id)
            }
            Err(e) => {
                debug!(kind = kind.noun(), error = %e, "submission rejected");
                form.error = e.to_string();
                Err(e)
            }
        }
    }
}

async fn create<T: Transport>(
    transport: &T,
    kind: EntityKind,
    body: Value,
    token: &str,
) -> Result<i64, FormError> {
    #[derive(serde::Deserialize)]
    struct CreatedId {
        id: i64,
    }

    let request = ApiRequest::post_json(kind.collection_path(), body.to_string().into_bytes()).bearer(token);
    let response = match transport.send(request, &CancelToken::new()).await {
        Ok(response) => response,
        Err(e) => {
            warn!(kind = kind.noun(), error = %e, "create request failed");
            return Err(FormError::Failed(kind.noun()));
        }
    };

    if !response.is_success() {
        return Err(match response.message() {
            Some(message) => FormError::Rejected { noun: kind.noun(), status: response.status, message },
            None => FormError::Failed(kind.noun()),
        });
    }

    serde_json::from_slice::<CreatedId>(&response.body)
        .map(|created| created.id)
        .map_err(|e| {
            warn!(kind = kind.noun(), "unreadable create response: {e}");
            FormError::Failed(kind.noun())
        })
}
