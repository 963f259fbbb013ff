//! Listing entities: restaurants, activities and advertisements.
//!
//! Each kind has a stored record type (with its `id`) and a create payload
//! type (`New*`) decoded from request bodies. A static [`Field`] schema per
//! kind drives the table layout, the required-field check and the admin
//! forms, so the three stay in step.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::sqlite::SqliteRow;
use thiserror::Error;
use url::Url;

/// One input field of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    /// JSON and form key.
    pub name: &'static str,
    /// SQL column.
    pub column: &'static str,
    /// Human label used in messages.
    pub label: &'static str,
    pub required: bool,
    /// Must parse as a URL when non-empty.
    pub url: bool,
}

const fn text(name: &'static str, label: &'static str) -> Field {
    Field { name, column: name, label, required: true, url: false }
}

const fn link(name: &'static str, column: &'static str, label: &'static str) -> Field {
    Field { name, column, label, required: false, url: true }
}

const PLACE_FIELDS: &[Field] = &[
    text("name", "Name"),
    text("description", "Description"),
    text("location", "Location"),
    link("url", "url", "Website URL"),
];

const ADVERTISEMENT_FIELDS: &[Field] = &[
    text("title", "Title"),
    text("description", "Description"),
    link("imageUrl", "image_url", "Image URL"),
    link("link", "link", "Link"),
];

/// The three listing kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Restaurant,
    Activity,
    Advertisement,
}

impl EntityKind {
    pub const ALL: [Self; 3] = [Self::Restaurant, Self::Activity, Self::Advertisement];

    pub fn fields(self) -> &'static [Field] {
        match self {
            Self::Restaurant | Self::Activity => PLACE_FIELDS,
            Self::Advertisement => ADVERTISEMENT_FIELDS,
        }
    }

    pub fn table(self) -> &'static str {
        match self {
            Self::Restaurant => "restaurants",
            Self::Activity => "activities",
            Self::Advertisement => "advertisements",
        }
    }

    /// Lowercase singular, e.g. `"restaurant"`.
    pub fn noun(self) -> &'static str {
        match self {
            Self::Restaurant => "restaurant",
            Self::Activity => "activity",
            Self::Advertisement => "advertisement",
        }
    }

    /// Lowercase plural, e.g. `"activities"`.
    pub fn plural(self) -> &'static str {
        self.table()
    }

    /// Capitalised singular, e.g. `"Restaurant"`.
    pub fn title(self) -> &'static str {
        match self {
            Self::Restaurant => "Restaurant",
            Self::Activity => "Activity",
            Self::Advertisement => "Advertisement",
        }
    }

    /// Collection endpoint, e.g. `"/api/restaurants"`.
    pub fn collection_path(self) -> &'static str {
        match self {
            Self::Restaurant => "/api/restaurants",
            Self::Activity => "/api/activities",
            Self::Advertisement => "/api/advertisements",
        }
    }

    /// First path segment of the detail page.
    pub fn page_segment(self) -> &'static str {
        match self {
            Self::Restaurant => "eat",
            Self::Activity => "fun",
            Self::Advertisement => "advertise",
        }
    }

    pub fn detail_href(self, id: i64) -> String {
        format!("/{}/{id}", self.page_segment())
    }

    pub fn field(self, name: &str) -> Option<&'static Field> {
        self.fields().iter().find(|f| f.name == name)
    }
}

/// Whether `raw` is an absolute `http`/`https` URL, the only kind a
/// URL-shaped field may hold or a page may link to.
pub fn is_web_url(raw: &str) -> bool {
    Url::parse(raw).is_ok_and(|url| matches!(url.scheme(), "http" | "https"))
}

/// A create payload failed the required-field check.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    Required(&'static str),
}

/// A stored record. Every record carries `createdAt` and `updatedAt`
/// timestamps, set by the store.
pub trait Entity:
    Serialize + DeserializeOwned + for<'r> FromRow<'r, SqliteRow> + Send + Sync + Unpin + 'static
{
    type New: NewEntity;

    const KIND: EntityKind;

    fn id(&self) -> i64;

    /// Name or title, used as the link text in listings.
    fn label(&self) -> &str;
}

/// A create payload, decoded from a request body.
///
/// Every field is optional at the type level so a missing required field is
/// reported as a [`ValidationError`] rather than a decode failure.
pub trait NewEntity: Serialize + DeserializeOwned + Send + Sync + 'static {
    const KIND: EntityKind;

    /// Values in [`EntityKind::fields`] order.
    fn values(&self) -> Vec<Option<String>>;

    fn check(&self) -> Result<(), ValidationError> {
        for (field, value) in Self::KIND.fields().iter().zip(self.values()) {
            if field.required && value.as_deref().is_none_or(|v| v.trim().is_empty()) {
                return Err(ValidationError::Required(field.label));
            }
        }
        Ok(())
    }
}

// ── Restaurant ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Restaurant {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub location: String,
    pub url: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRestaurant {
    pub name: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub url: Option<String>,
}

impl Entity for Restaurant {
    type New = NewRestaurant;
    const KIND: EntityKind = EntityKind::Restaurant;

    fn id(&self) -> i64 { self.id }
    fn label(&self) -> &str { &self.name }
}

impl NewEntity for NewRestaurant {
    const KIND: EntityKind = EntityKind::Restaurant;

    fn values(&self) -> Vec<Option<String>> {
        vec![self.name.clone(), self.description.clone(), self.location.clone(), self.url.clone()]
    }
}

// ── Activity ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Activity {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub location: String,
    pub url: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewActivity {
    pub name: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub url: Option<String>,
}

impl Entity for Activity {
    type New = NewActivity;
    const KIND: EntityKind = EntityKind::Activity;

    fn id(&self) -> i64 { self.id }
    fn label(&self) -> &str { &self.name }
}

impl NewEntity for NewActivity {
    const KIND: EntityKind = EntityKind::Activity;

    fn values(&self) -> Vec<Option<String>> {
        vec![self.name.clone(), self.description.clone(), self.location.clone(), self.url.clone()]
    }
}

// ── Advertisement ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Advertisement {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub image_url: Option<String>,
    pub link: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAdvertisement {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub link: Option<String>,
}

impl Entity for Advertisement {
    type New = NewAdvertisement;
    const KIND: EntityKind = EntityKind::Advertisement;

    fn id(&self) -> i64 { self.id }
    fn label(&self) -> &str { &self.title }
}

impl NewEntity for NewAdvertisement {
    const KIND: EntityKind = EntityKind::Advertisement;

    fn values(&self) -> Vec<Option<String>> {
        vec![self.title.clone(), self.description.clone(), self.image_url.clone(), self.link.clone()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_required_field_names_its_label() {
        let new = NewRestaurant {
            name: Some("Cafe X".into()),
            description: Some("   ".into()),
            location: Some("Aspen".into()),
            url: None,
        };
        assert_eq!(new.check(), Err(ValidationError::Required("Description")));
    }

    #[test]
    fn optional_fields_may_be_absent() {
        let new: NewAdvertisement =
            serde_json::from_str(r#"{"title":"Ski sale","description":"Half off"}"#).unwrap();
        assert_eq!(new.check(), Ok(()));
        assert_eq!(new.image_url, None);
    }

    #[test]
    fn advertisement_uses_camel_case_on_the_wire() {
        let ad = Advertisement {
            id: 7,
            title: "Ski sale".into(),
            description: "Half off".into(),
            image_url: Some("https://img.example/ski.png".into()),
            link: None,
            created_at: "2024-03-01T12:00:00Z".parse().unwrap(),
            updated_at: "2024-03-01T12:00:00Z".parse().unwrap(),
        };
        let json = serde_json::to_value(&ad).unwrap();
        assert_eq!(json["imageUrl"], "https://img.example/ski.png");
        assert_eq!(json["createdAt"], "2024-03-01T12:00:00Z");
        assert!(json.get("image_url").is_none());
        assert!(json.get("created_at").is_none());
    }

    #[test]
    fn place_timestamps_are_camel_case() {
        let json = r#"{"id":1,"name":"Cafe X","description":"d","location":"Aspen","url":null,
            "createdAt":"2024-03-01T12:00:00Z","updatedAt":"2024-03-02T08:30:00Z"}"#;
        let cafe: Restaurant = serde_json::from_str(json).unwrap();
        assert!(cafe.updated_at > cafe.created_at);
        assert!(serde_json::to_value(&cafe).unwrap().get("updatedAt").is_some());
    }

    #[test]
    fn schema_columns_line_up_with_payload_values() {
        for kind in EntityKind::ALL {
            assert_eq!(kind.fields().len(), 4);
        }
        assert_eq!(EntityKind::Advertisement.field("imageUrl").map(|f| f.column), Some("image_url"));
        assert_eq!(EntityKind::Activity.detail_href(3), "/fun/3");
    }
}
