//! Route handlers.
//!
//! A handler is any `async fn(state, request)` whose output converts into a
//! response. The router stores handlers of many concrete types side by side,
//! so each one is boxed behind [`ErasedHandler`] at registration and called
//! through a single dynamic dispatch per request, with a fresh clone of the
//! state.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::request::Request;
use crate::response::{IntoResponse, Response};

pub(crate) type BoxFuture = Pin<Box<dyn Future<Output = Response> + Send + 'static>>;

/// Object-safe form of a handler.
#[doc(hidden)]
pub trait ErasedHandler<S> {
    fn call(&self, state: S, req: Request) -> BoxFuture;
}

#[doc(hidden)]
pub type BoxedHandler<S> = Arc<dyn ErasedHandler<S> + Send + Sync + 'static>;

/// Implemented for every function usable as a route handler:
///
/// ```text
/// async fn list(state: AppState<St>, req: Request) -> impl IntoResponse
/// ```
///
/// Sealed; the blanket impl is the only one.
pub trait Handler<S>: sealed::Sealed<S> + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler<S>;
}

mod sealed {
    pub trait Sealed<S> {}
}

impl<F, Fut, S> sealed::Sealed<S> for F
where
    F: Fn(S, Request) -> Fut + Send + Sync + 'static,
    Fut: Future + Send + 'static,
    Fut::Output: IntoResponse,
{
}

impl<F, Fut, S> Handler<S> for F
where
    F: Fn(S, Request) -> Fut + Send + Sync + 'static,
    Fut: Future + Send + 'static,
    Fut::Output: IntoResponse,
    S: 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler<S> {
        Arc::new(FnHandler(self))
    }
}

struct FnHandler<F>(F);

impl<F, Fut, S> ErasedHandler<S> for FnHandler<F>
where
    F: Fn(S, Request) -> Fut + Send + Sync + 'static,
    Fut: Future + Send + 'static,
    Fut::Output: IntoResponse,
    S: 'static,
{
    fn call(&self, state: S, req: Request) -> BoxFuture {
        let response = (self.0)(state, req);
        Box::pin(async move { response.await.into_response() })
    }
}
