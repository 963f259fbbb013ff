//! Listing page: the three collections side by side.

use tracing::{debug, warn};

use super::transport::{ApiRequest, Transport, TransportError};
use crate::cancel::CancelToken;
use crate::entity::{Activity, Advertisement, Entity, EntityKind, Restaurant};

pub const PAGE_TITLE: &str = "Welcome to Aspen Adventures & Dining";

/// Target of the page's admin link.
pub const ADMIN_HREF: &str = "/admin";

/// Load state of one collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot<E> {
    Loading,
    Loaded(Vec<E>),
    Failed(String),
    /// The fetch was abandoned. Rendered the same as [`Slot::Loading`].
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub href: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Links(Vec<Link>),
    Message(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub kind: EntityKind,
    pub heading: &'static str,
    pub content: Content,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingPage {
    pub restaurants: Slot<Restaurant>,
    pub activities: Slot<Activity>,
    pub advertisements: Slot<Advertisement>,
}

impl Default for ListingPage {
    fn default() -> Self {
        Self::new()
    }
}

impl ListingPage {
    pub fn new() -> Self {
        Self { restaurants: Slot::Loading, activities: Slot::Loading, advertisements: Slot::Loading }
    }

    /// Fetches all three collections concurrently. Each slot is written as
    /// its own fetch resolves; a failure in one leaves the others alone.
    pub async fn load<T: Transport>(&mut self, transport: &T, cancel: &CancelToken) {
        let Self { restaurants, activities, advertisements } = self;
        *restaurants = Slot::Loading;
        *activities = Slot::Loading;
        *advertisements = Slot::Loading;

        tokio::join!(
            async { *restaurants = fetch(transport, cancel).await },
            async { *activities = fetch(transport, cancel).await },
            async { *advertisements = fetch(transport, cancel).await }
        );
    }

    pub fn title(&self) -> &'static str {
        PAGE_TITLE
    }

    /// The "Go to Admin Dashboard" link shown under the sections.
    pub fn admin_link(&self) -> Link {
        Link { href: ADMIN_HREF.to_owned(), label: "Go to Admin Dashboard".to_owned() }
    }

    pub fn sections(&self) -> [Section; 3] {
        [
            section(&self.restaurants, "Explore Restaurants"),
            section(&self.activities, "Fun Things to Do"),
            section(&self.advertisements, "Advertisements"),
        ]
    }
}

async fn fetch<E: Entity, T: Transport>(transport: &T, cancel: &CancelToken) -> Slot<E> {
    let kind = E::KIND;
    let failed = || Slot::Failed(format!("Failed to load {}.", kind.plural()));

    let response = match transport.send(ApiRequest::get(kind.collection_path()), cancel).await {
        Ok(response) => response,
        Err(TransportError::Cancelled) => {
            debug!(kind = kind.plural(), "fetch cancelled");
            return Slot::Cancelled;
        }
        Err(e) => {
            warn!(kind = kind.plural(), error = %e, "fetch failed");
            return failed();
        }
    };

    if !response.is_success() {
        warn!(kind = kind.plural(), status = response.status, "fetch rejected");
        return failed();
    }
    match serde_json::from_slice::<Vec<E>>(&response.body) {
        Ok(items) => Slot::Loaded(items),
        Err(e) => {
            warn!(kind = kind.plural(), "unreadable listing: {e}");
            failed()
        }
    }
}

fn section<E: Entity>(slot: &Slot<E>, heading: &'static str) -> Section {
    let kind = E::KIND;
    let content = match slot {
        Slot::Loading | Slot::Cancelled => Content::Message("Loading …".to_owned()),
        Slot::Failed(message) => Content::Message(message.clone()),
        Slot::Loaded(items) if items.is_empty() => Content::Message(format!("No {} found.", kind.plural())),
        Slot::Loaded(items) => Content::Links(
            items.iter()
                .map(|item| Link { href: kind.detail_href(item.id()), label: item.label().to_owned() })
                .collect(),
        ),
    };
    Section { kind, heading, content }
}
