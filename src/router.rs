//! Radix-tree request router.
//!
//! One tree per HTTP method, O(path-length) lookup. A path that is registered
//! under some other method answers `405` with an `allow` header; a path that
//! is not registered at all answers `404`.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use matchit::Router as MatchitRouter;

use crate::handler::{BoxedHandler, Handler};
use crate::method::Method;
use crate::request::Request;
use crate::response::{IntoResponse, Response};
use crate::status::Status;

/// The application router.
///
/// Owns the application state `S`; every handler receives a clone of it.
/// Build it once at startup and pass it to [`Server::serve`](crate::Server::serve).
pub struct Router<S> {
    routes: BTreeMap<Method, MatchitRouter<BoxedHandler<S>>>,
    state: S,
}

pub(crate) enum Route<S> {
    Matched(BoxedHandler<S>, HashMap<String, String>),
    MethodNotAllowed(Vec<Method>),
    NotFound,
}

impl<S: Clone + Send + Sync + 'static> Router<S> {
    pub fn new(state: S) -> Self {
        Self { routes: BTreeMap::new(), state }
    }

    /// Register a handler for a method + path pair. Returns `self` for chaining.
    ///
    /// Path parameters use `{name}` syntax; `req.param("name")` retrieves them.
    ///
    /// # Panics
    ///
    /// Panics if the path is not a valid route or conflicts with one already
    /// registered for the same method. Routes are fixed at startup.
    pub fn on(mut self, method: Method, path: &str, handler: impl Handler<S>) -> Self {
        self.routes
            .entry(method)
            .or_default()
            .insert(path, handler.into_boxed_handler())
            .unwrap_or_else(|e| panic!("invalid route `{method} {path}`: {e}"));
        self
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    pub(crate) fn lookup(&self, method: Method, path: &str) -> Route<S> {
        if let Some(matched) = self.routes.get(&method).and_then(|tree| tree.at(path).ok()) {
            let params = matched.params.iter()
                .map(|(k, v)| (k.to_owned(), v.to_owned()))
                .collect();
            return Route::Matched(Arc::clone(matched.value), params);
        }

        let allowed: Vec<Method> = self.routes.iter()
            .filter(|(_, tree)| tree.at(path).is_ok())
            .map(|(method, _)| *method)
            .collect();

        if allowed.is_empty() { Route::NotFound } else { Route::MethodNotAllowed(allowed) }
    }

    /// Routes one request to its handler and produces one response.
    pub async fn handle(&self, mut req: Request) -> Response {
        match self.lookup(req.method, &req.path) {
            Route::Matched(handler, params) => {
                req.params = params;
                handler.call(self.state.clone(), req).await
            }
            Route::MethodNotAllowed(allowed) => method_not_allowed(&allowed),
            Route::NotFound => Response::status(Status::NotFound),
        }
    }
}

/// `405` with the JSON error body and an `allow` header.
pub(crate) fn method_not_allowed(allowed: &[Method]) -> Response {
    let allow = allowed.iter().map(|m| m.as_str()).collect::<Vec<_>>().join(", ");
    let mut response = crate::error::ApiError::MethodNotAllowed.into_response();
    if !allow.is_empty() {
        response.headers.push(("allow".to_owned(), allow));
    }
    response
}
