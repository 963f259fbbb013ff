//! Record store.
//!
//! The [`Store`] trait is the three-operation contract the handlers rely on
//! (`create`, `find_many`, `find_unique`), plus a cheap `ping` for
//! readiness. [`SqliteStore`] implements it on a `sqlx` SQLite pool; its SQL
//! is assembled from each kind's static field schema, never from input.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use thiserror::Error;
use tracing::{debug, info};

use crate::entity::{Entity, EntityKind, NewEntity};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Persistence for the three entity collections.
///
/// Identifier assignment under concurrent creates is the store's concern.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    /// Inserts a record and returns it with its freshly assigned id.
    async fn create<E: Entity>(&self, new: E::New) -> Result<E, StoreError>;

    /// Every record of one kind, in id order.
    async fn find_many<E: Entity>(&self) -> Result<Vec<E>, StoreError>;

    async fn find_unique<E: Entity>(&self, id: i64) -> Result<Option<E>, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}

/// [`Store`] backed by SQLite.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connects to `url` (e.g. `sqlite://aspen.db?mode=rwc`).
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(5))
            .connect(url)
            .await?;
        info!("connected to record store");
        Ok(Self { pool })
    }

    /// A private in-memory database. Pinned to one connection that never
    /// expires, since every SQLite memory connection is its own database.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        Ok(Self { pool })
    }

    /// Creates any missing entity tables. Existing tables are left alone.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        for kind in EntityKind::ALL {
            sqlx::query(&create_table_sql(kind)).execute(&self.pool).await?;
        }
        debug!("record store schema ready");
        Ok(())
    }

    /// Closes the pool. Later operations fail with [`StoreError`].
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Store-managed columns, in addition to `id`.
const TIMESTAMPS: [&str; 2] = ["created_at", "updated_at"];

fn column_list(kind: EntityKind) -> String {
    let mut columns = vec!["id"];
    columns.extend(kind.fields().iter().map(|f| f.column));
    columns.extend(TIMESTAMPS);
    columns.join(", ")
}

fn create_table_sql(kind: EntityKind) -> String {
    let columns: Vec<String> = kind.fields().iter()
        .map(|f| format!("{} TEXT{}", f.column, if f.required { " NOT NULL" } else { "" }))
        .chain(TIMESTAMPS.map(|c| format!("{c} TEXT NOT NULL")))
        .collect();
    format!(
        "CREATE TABLE IF NOT EXISTS {} (id INTEGER PRIMARY KEY AUTOINCREMENT, {})",
        kind.table(),
        columns.join(", "),
    )
}

fn insert_sql(kind: EntityKind) -> String {
    let columns: Vec<&str> = kind.fields().iter().map(|f| f.column).chain(TIMESTAMPS).collect();
    let placeholders = vec!["?"; columns.len()].join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES ({placeholders}) RETURNING {}",
        kind.table(),
        columns.join(", "),
        column_list(kind),
    )
}

#[async_trait]
impl Store for SqliteStore {
    async fn create<E: Entity>(&self, new: E::New) -> Result<E, StoreError> {
        let sql = insert_sql(E::KIND);
        let mut query = sqlx::query_as::<_, E>(&sql);
        for value in new.values() {
            query = query.bind(value);
        }
        let now = Utc::now();
        query = query.bind(now).bind(now);
        let record = query.fetch_one(&self.pool).await?;
        debug!(kind = E::KIND.noun(), id = record.id(), "inserted record");
        Ok(record)
    }

    async fn find_many<E: Entity>(&self) -> Result<Vec<E>, StoreError> {
        let sql = format!("SELECT {} FROM {} ORDER BY id", column_list(E::KIND), E::KIND.table());
        Ok(sqlx::query_as::<_, E>(&sql).fetch_all(&self.pool).await?)
    }

    async fn find_unique<E: Entity>(&self, id: i64) -> Result<Option<E>, StoreError> {
        let sql = format!("SELECT {} FROM {} WHERE id = ?", column_list(E::KIND), E::KIND.table());
        Ok(sqlx::query_as::<_, E>(&sql).bind(id).fetch_optional(&self.pool).await?)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Advertisement, NewAdvertisement, NewRestaurant, Restaurant};

    async fn store() -> SqliteStore {
        let store = SqliteStore::in_memory().await.expect("in-memory store");
        store.ensure_schema().await.expect("schema");
        store
    }

    fn cafe(name: &str) -> NewRestaurant {
        NewRestaurant {
            name: Some(name.into()),
            description: Some("Good coffee".into()),
            location: Some("Aspen".into()),
            url: Some("https://example.com".into()),
        }
    }

    #[tokio::test]
    async fn create_then_list_includes_fresh_ids() {
        let store = store().await;

        let first: Restaurant = store.create(cafe("Cafe X")).await.unwrap();
        let second: Restaurant = store.create(cafe("Cafe Y")).await.unwrap();
        assert_ne!(first.id, second.id);
        assert_eq!(first.created_at, first.updated_at);
        assert!(second.created_at >= first.created_at);

        let all: Vec<Restaurant> = store.find_many().await.unwrap();
        assert_eq!(all, vec![first, second]);
    }

    #[tokio::test]
    async fn collections_are_independent() {
        let store = store().await;
        let _: Restaurant = store.create(cafe("Cafe X")).await.unwrap();

        let ads: Vec<Advertisement> = store.find_many().await.unwrap();
        assert!(ads.is_empty());

        let ad: Advertisement = store
            .create(NewAdvertisement {
                title: Some("Ski sale".into()),
                description: Some("Half off".into()),
                image_url: None,
                link: Some("https://ski.example".into()),
            })
            .await
            .unwrap();
        assert_eq!(ad.image_url, None);
        assert_eq!(store.find_unique::<Advertisement>(ad.id).await.unwrap(), Some(ad));
    }

    #[tokio::test]
    async fn find_unique_on_unknown_id_is_none() {
        let store = store().await;
        assert_eq!(store.find_unique::<Restaurant>(999).await.unwrap(), None);
    }

    #[tokio::test]
    async fn ids_are_not_reused() {
        let store = store().await;
        let first: Restaurant = store.create(cafe("Cafe X")).await.unwrap();
        sqlx::query("DELETE FROM restaurants").execute(&store.pool).await.unwrap();

        let next: Restaurant = store.create(cafe("Cafe Y")).await.unwrap();
        assert!(next.id > first.id);
    }

    #[tokio::test]
    async fn closed_store_reports_errors() {
        let store = store().await;
        store.close().await;
        assert!(store.find_many::<Restaurant>().await.is_err());
        assert!(store.ping().await.is_err());
    }
}
