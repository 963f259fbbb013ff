//! Shared application state handed to every handler.

use std::sync::Arc;

use crate::auth::Authenticator;
use crate::store::Store;

/// Immutable per-process state. Cloning is two reference-count bumps.
pub struct AppState<St> {
    pub store: Arc<St>,
    pub auth: Arc<Authenticator>,
}

impl<St: Store> AppState<St> {
    pub fn new(store: St, auth: Authenticator) -> Self {
        Self { store: Arc::new(store), auth: Arc::new(auth) }
    }
}

impl<St> Clone for AppState<St> {
    fn clone(&self) -> Self {
        Self { store: Arc::clone(&self.store), auth: Arc::clone(&self.auth) }
    }
}
