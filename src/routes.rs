//! The route table.

use crate::entity::{Activity, Advertisement, Restaurant};
use crate::state::AppState;
use crate::store::Store;
use crate::{Method, Router, api, health, pages};

/// Builds the full application router over `state`.
pub fn app<St: Store>(state: AppState<St>) -> Router<AppState<St>> {
    Router::new(state)
        .on(Method::Get,  "/api/restaurants",     api::list::<Restaurant, St>)
        .on(Method::Post, "/api/restaurants",     api::create::<Restaurant, St>)
        .on(Method::Get,  "/api/activities",      api::list::<Activity, St>)
        .on(Method::Post, "/api/activities",      api::create::<Activity, St>)
        .on(Method::Get,  "/api/advertisements",  api::list::<Advertisement, St>)
        .on(Method::Post, "/api/advertisements",  api::create::<Advertisement, St>)
        .on(Method::Post, "/api/login",           api::login::<St>)
        .on(Method::Get,  "/eat/{id}",            pages::detail::<Restaurant, St>)
        .on(Method::Get,  "/fun/{id}",            pages::detail::<Activity, St>)
        .on(Method::Get,  "/advertise/{id}",      pages::detail::<Advertisement, St>)
        .on(Method::Get,  "/healthz",             health::liveness::<AppState<St>>)
        .on(Method::Get,  "/readyz",              health::readiness::<St>)
}
