//! Responses and the [`IntoResponse`] conversion.
//!
//! Handlers return anything that converts into a [`Response`]: a response
//! built by hand, a [`Status`], a [`Json`] or [`Created`] payload, or a
//! `Result` of two such types.

use bytes::Bytes;
use http_body_util::Full;
use serde::Serialize;
use tracing::error;

use crate::status::Status;

const JSON: &str = "application/json";
const TEXT: &str = "text/plain; charset=utf-8";
const HTML: &str = "text/html; charset=utf-8";

/// A complete response, body buffered.
///
/// ```rust
/// use aspen_guide::{Response, Status};
///
/// let ok = Response::text("ok");
/// assert_eq!(ok.status_code(), 200);
///
/// let missing = Response::builder()
///     .status(Status::NotFound)
///     .html("<p>Restaurant not found</p>");
/// assert_eq!(missing.header("Content-Type"), Some("text/html; charset=utf-8"));
/// ```
#[derive(Debug)]
pub struct Response {
    pub(crate) status: u16,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) body: Vec<u8>,
}

impl Response {
    pub fn json(body: Vec<u8>) -> Self {
        Self::builder().json(body)
    }

    pub fn text(body: impl Into<String>) -> Self {
        Self::builder().text(body)
    }

    pub fn html(body: impl Into<String>) -> Self {
        Self::builder().html(body)
    }

    /// An empty response with `code`.
    pub fn status(code: Status) -> Self {
        Self { status: code.into(), headers: Vec::new(), body: Vec::new() }
    }

    /// Starts a `200` response with custom status or headers.
    pub fn builder() -> ResponseBuilder {
        ResponseBuilder { status: Status::Ok, headers: Vec::new() }
    }

    pub fn status_code(&self) -> u16 { self.status }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Converts into the hyper representation. Headers that are not valid
    /// HTTP are dropped with an error log rather than failing the response.
    pub(crate) fn into_inner(self) -> http::Response<Full<Bytes>> {
        let mut res = http::Response::new(Full::new(Bytes::from(self.body)));
        *res.status_mut() = http::StatusCode::from_u16(self.status)
            .unwrap_or(http::StatusCode::INTERNAL_SERVER_ERROR);
        for (name, value) in self.headers {
            match (
                http::HeaderName::from_bytes(name.as_bytes()),
                http::HeaderValue::from_str(&value),
            ) {
                (Ok(name), Ok(value)) => {
                    res.headers_mut().append(name, value);
                }
                _ => error!(header = %name, "dropping invalid response header"),
            }
        }
        res
    }
}

/// Builds a [`Response`]; the body method finishes it and sets
/// `content-type`.
pub struct ResponseBuilder {
    status: Status,
    headers: Vec<(String, String)>,
}

impl ResponseBuilder {
    pub fn status(self, status: Status) -> Self {
        Self { status, ..self }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    pub fn json(self, body: Vec<u8>) -> Response {
        self.body(JSON, body)
    }

    pub fn text(self, body: impl Into<String>) -> Response {
        self.body(TEXT, body.into().into_bytes())
    }

    pub fn html(self, body: impl Into<String>) -> Response {
        self.body(HTML, body.into().into_bytes())
    }

    fn body(self, content_type: &str, body: Vec<u8>) -> Response {
        let mut headers = Vec::with_capacity(self.headers.len() + 1);
        headers.push(("content-type".to_owned(), content_type.to_owned()));
        headers.extend(self.headers);
        Response { status: self.status.into(), headers, body }
    }
}

/// Anything a handler may return.
pub trait IntoResponse {
    fn into_response(self) -> Response;
}

impl IntoResponse for Response {
    fn into_response(self) -> Response { self }
}

impl IntoResponse for &'static str {
    fn into_response(self) -> Response { Response::text(self) }
}

impl IntoResponse for String {
    fn into_response(self) -> Response { Response::text(self) }
}

impl IntoResponse for Status {
    fn into_response(self) -> Response { Response::status(self) }
}

impl<T: IntoResponse, E: IntoResponse> IntoResponse for Result<T, E> {
    fn into_response(self) -> Response {
        self.map_or_else(IntoResponse::into_response, IntoResponse::into_response)
    }
}

fn serialized<T: Serialize>(value: &T, finish: impl FnOnce(Vec<u8>) -> Response) -> Response {
    match serde_json::to_vec(value) {
        Ok(bytes) => finish(bytes),
        Err(e) => {
            error!("failed to serialise response body: {e}");
            Response::status(Status::InternalServerError)
        }
    }
}

/// `200 OK` with `T` as JSON.
pub struct Json<T>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        serialized(&self.0, Response::json)
    }
}

/// `201 Created` with the new record as JSON and its `location`.
pub struct Created<T> {
    pub location: String,
    pub body: T,
}

impl<T: Serialize> IntoResponse for Created<T> {
    fn into_response(self) -> Response {
        let Self { location, body } = self;
        serialized(&body, |bytes| {
            Response::builder()
                .status(Status::Created)
                .header("location", &location)
                .json(bytes)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn created_sets_status_location_and_json() {
        let res = Created { location: "/eat/3".into(), body: serde_json::json!({ "id": 3 }) }.into_response();
        assert_eq!(res.status_code(), 201);
        assert_eq!(res.header("location"), Some("/eat/3"));
        assert_eq!(res.header("content-type"), Some("application/json"));
        assert_eq!(res.body(), br#"{"id":3}"#);
    }

    #[test]
    fn result_picks_the_matching_side() {
        let ok: Result<&'static str, Status> = Ok("fine");
        assert_eq!(ok.into_response().status_code(), 200);

        let err: Result<&'static str, Status> = Err(Status::NotFound);
        let res = err.into_response();
        assert_eq!(res.status_code(), 404);
        assert!(res.body().is_empty());
    }

    #[test]
    fn invalid_headers_are_dropped_on_conversion() {
        let res = Response::builder().header("bad header", "x").text("ok").into_inner();
        assert_eq!(res.status(), http::StatusCode::OK);
        assert_eq!(res.headers().len(), 1);
    }
}
