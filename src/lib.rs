//! # aspen-guide
//!
//! A listings site for Aspen: restaurants, activities and advertisements.
//!
//! The server side is a small hyper service: a JSON API to list and create
//! records, HTML detail pages, and a login endpoint that hands the admin a
//! signed bearer token. Records live in SQLite through [`sqlx`].
//!
//! The client side ([`client`]) holds the state of the two interactive
//! pages: the public listing, which fetches all three collections at once,
//! and the admin console, which validates and submits creation forms.
//!
//! ## Routes
//!
//! | Method | Path | |
//! |---|---|---|
//! | `GET` / `POST` | `/api/restaurants`, `/api/activities`, `/api/advertisements` | list / create |
//! | `POST` | `/api/login` | password → token |
//! | `GET` | `/eat/{id}`, `/fun/{id}`, `/advertise/{id}` | detail pages |
//! | `GET` | `/healthz`, `/readyz` | health checks |
//!
//! ## Writing a handler
//!
//! Handlers are async functions of the shared state and the request.
//! Anything that implements [`IntoResponse`] can be returned:
//!
//! ```rust
//! use aspen_guide::{Request, Response, Status};
//!
//! async fn teapot(_state: (), req: Request) -> Response {
//!     if req.body().is_empty() {
//!         return Response::status(Status::BadRequest);
//!     }
//!     Response::text("short and stout")
//! }
//! ```

pub mod api;
pub mod auth;
pub mod cancel;
pub mod client;
pub mod config;
pub mod entity;
pub mod error;
pub mod health;
pub mod pages;
pub mod routes;
pub mod server;
pub mod state;
pub mod store;
pub mod telemetry;

mod handler;
mod method;
mod middleware;
mod request;
mod response;
mod router;
mod status;

pub use cancel::CancelToken;
pub use error::{ApiError, Error};
pub use handler::Handler;
pub use method::Method;
pub use request::Request;
pub use response::{Created, IntoResponse, Json, Response, ResponseBuilder};
pub use router::Router;
pub use server::{Server, serve_with_shutdown};
pub use state::AppState;
pub use status::Status;
