//! Server-rendered detail pages: `/eat/{id}`, `/fun/{id}`, `/advertise/{id}`.

use std::fmt::Write as _;

use tracing::error;

use crate::entity::{Activity, Advertisement, Entity, Restaurant, is_web_url};
use crate::state::AppState;
use crate::store::{Store, StoreError};
use crate::{Request, Response, Status};

/// Looks up one record by its raw path identifier.
///
/// Anything that is not a positive base-10 integer is absent without a store
/// query. Absence is `Ok(None)`; only a store failure is an error.
pub async fn get_by_id<E: Entity, St: Store>(store: &St, raw: &str) -> Result<Option<E>, StoreError> {
    match raw.parse::<i64>() {
        Ok(id) if id > 0 => store.find_unique::<E>(id).await,
        _ => Ok(None),
    }
}

/// Entities with a detail page.
pub trait DetailPage: Entity {
    /// Appends the page body (everything under the heading) as HTML.
    fn render_body(&self, html: &mut String);
}

impl DetailPage for Restaurant {
    fn render_body(&self, html: &mut String) {
        place_body(html, &self.description, &self.location, self.url.as_deref());
    }
}

impl DetailPage for Activity {
    fn render_body(&self, html: &mut String) {
        place_body(html, &self.description, &self.location, self.url.as_deref());
    }
}

impl DetailPage for Advertisement {
    fn render_body(&self, html: &mut String) {
        let _ = write!(html, "<p>{}</p>", escape(&self.description));
        if let Some(src) = self.image_url.as_deref().filter(|s| is_web_url(s)) {
            let _ = write!(html, r#"<img src="{}" alt="{}">"#, escape(src), escape(&self.title));
        }
        if let Some(link) = self.link.as_deref().filter(|s| !s.is_empty()) {
            let _ = write!(html, "<p>Learn more: {}</p>", anchor(link));
        }
    }
}

fn place_body(html: &mut String, description: &str, location: &str, url: Option<&str>) {
    let _ = write!(html, "<p>{}</p>", escape(description));
    if !location.is_empty() {
        let _ = write!(html, "<p><strong>Location:</strong> {}</p>", escape(location));
    }
    if let Some(url) = url.filter(|s| !s.is_empty()) {
        let _ = write!(html, "<p>Website: {}</p>", anchor(url));
    }
}

/// A link for web URLs; anything else is shown as inert text.
fn anchor(href: &str) -> String {
    let text = escape(href);
    if is_web_url(href) {
        format!(r#"<a href="{text}" target="_blank" rel="noopener noreferrer">{text}</a>"#)
    } else {
        text
    }
}

fn layout(title: &str, content: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>{title}</title></head>\
         <body><main>{content}</main></body></html>\n"
    )
}

pub(crate) fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// `GET /<segment>/{id}`: the detail page for one record of kind `E`.
pub async fn detail<E: DetailPage, St: Store>(state: AppState<St>, req: Request) -> Response {
    let raw = req.param("id").unwrap_or_default();

    match get_by_id::<E, St>(&state.store, raw).await {
        Ok(Some(record)) => {
            let title = escape(record.label());
            let mut content = format!("<h1>{title}</h1>");
            record.render_body(&mut content);
            Response::html(layout(&title, &content))
        }
        Ok(None) => {
            let message = format!("{} not found", E::KIND.title());
            Response::builder()
                .status(Status::NotFound)
                .html(layout(&message, &format!("<p>{message}</p>")))
        }
        Err(e) => {
            error!(kind = E::KIND.noun(), error = %e, "detail lookup failed");
            let reason = Status::InternalServerError.reason();
            Response::builder()
                .status(Status::InternalServerError)
                .html(layout(reason, &format!("<p>{reason}</p>")))
        }
    }
}
