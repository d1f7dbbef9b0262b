//! `ContentStore` over the `artworks` table.

use atelier_core::catalog::{Availability, CatalogFilter};
use atelier_core::error::StoreError;
use atelier_core::store::{ContentStore, StoreFuture};
use atelier_core::types::{Currency, Item, ItemId, Sale, SessionId};
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

const SELECT_COLUMNS: &str = "id, title, price_minor_units, currency, medium, dimensions, year, \
     image_urls, sold, sold_at, sold_to_name, sold_to_email, sold_session_id";

#[derive(sqlx::FromRow)]
struct ArtworkRow {
    id: String,
    title: String,
    price_minor_units: i64,
    currency: String,
    medium: Option<String>,
    dimensions: Option<String>,
    year: Option<String>,
    image_urls: Vec<String>,
    sold: bool,
    sold_at: Option<DateTime<Utc>>,
    sold_to_name: Option<String>,
    sold_to_email: Option<String>,
    sold_session_id: Option<String>,
}

impl From<ArtworkRow> for Item {
    fn from(row: ArtworkRow) -> Self {
        Self {
            id: ItemId::new(row.id),
            title: row.title,
            price_minor_units: row.price_minor_units,
            currency: Currency::new(&row.currency),
            medium: row.medium,
            dimensions: row.dimensions,
            year: row.year,
            image_urls: row.image_urls,
            sold: row.sold,
            sold_at: row.sold_at,
            sold_to_name: row.sold_to_name,
            sold_to_email: row.sold_to_email,
            sold_session_id: row.sold_session_id.map(SessionId::new),
        }
    }
}

fn store_error(e: sqlx::Error) -> StoreError {
    match e {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            StoreError::Unavailable(e.to_string())
        }
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
            StoreError::Serialization(e.to_string())
        }
        _ => StoreError::Database(e.to_string()),
    }
}

/// `PostgreSQL`-based content store.
///
/// Marking an item sold is one statement,
/// `UPDATE artworks SET sold = TRUE, ... WHERE id = $1 AND sold = $2`, so two
/// concurrent reconciliations for the same item cannot both apply: the row
/// lock taken by the first makes the second re-check `sold` and match nothing.
///
/// # Example
///
/// ```no_run
/// use atelier_core::store::ContentStore;
/// use atelier_core::types::ItemId;
/// use atelier_postgres::PostgresContentStore;
///
/// # async fn example(pool: sqlx::PgPool) -> Result<(), Box<dyn std::error::Error>> {
/// let store = PostgresContentStore::from_pool(pool);
/// let item = store.get(&ItemId::new("blue-frog")).await?;
/// println!("sold: {:?}", item.map(|i| i.sold));
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct PostgresContentStore {
    pool: PgPool,
}

impl PostgresContentStore {
    /// Connect with a new pool.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the database cannot be reached.
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Unavailable(format!("Failed to connect: {e}")))?;

        tracing::info!(max_connections, "Connected to content database");
        Ok(Self::from_pool(pool))
    }

    /// Wrap an existing pool.
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run the embedded migrations (creates the `artworks` table).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Database(format!("Migration failed: {e}")))?;
        Ok(())
    }
}

impl ContentStore for PostgresContentStore {
    fn get<'a>(&'a self, id: &'a ItemId) -> StoreFuture<'a, Option<Item>> {
        Box::pin(async move {
            let row: Option<ArtworkRow> =
                sqlx::query_as(&format!("SELECT {SELECT_COLUMNS} FROM artworks WHERE id = $1"))
                    .bind(id.as_str())
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(store_error)?;
            Ok(row.map(Item::from))
        })
    }

    fn compare_and_set_sold<'a>(
        &'a self,
        id: &'a ItemId,
        expected_sold: bool,
        sale: &'a Sale,
    ) -> StoreFuture<'a, bool> {
        Box::pin(async move {
            if expected_sold {
                tracing::warn!(item_id = %id, "Refusing to overwrite the sale of a sold artwork");
                return Ok(false);
            }

            let result = sqlx::query(
                r"
                UPDATE artworks
                SET sold = TRUE,
                    sold_at = $3,
                    sold_to_name = $4,
                    sold_to_email = $5,
                    sold_session_id = $6,
                    updated_at = now()
                WHERE id = $1 AND sold = FALSE AND $2 = FALSE
                ",
            )
            .bind(id.as_str())
            .bind(expected_sold)
            .bind(sale.sold_at)
            .bind(sale.buyer_name.as_deref())
            .bind(sale.buyer_email.as_deref())
            .bind(sale.session_id.as_ref().map(SessionId::as_str))
            .execute(&self.pool)
            .await
            .map_err(store_error)?;

            let applied = result.rows_affected() == 1;
            if !applied {
                tracing::debug!(item_id = %id, expected_sold, "Compare-and-set matched no row");
            }
            Ok(applied)
        })
    }

    fn list<'a>(&'a self, filter: &'a CatalogFilter) -> StoreFuture<'a, Vec<Item>> {
        Box::pin(async move {
            let sold = filter.availability.map(|a| a == Availability::Sold);
            let rows: Vec<ArtworkRow> = sqlx::query_as(&format!(
                r"
                SELECT {SELECT_COLUMNS} FROM artworks
                WHERE ($1::text IS NULL OR lower(medium) = lower($1))
                  AND ($2::text IS NULL OR lower(dimensions) = lower($2))
                  AND ($3::boolean IS NULL OR sold = $3)
                ORDER BY title, id
                "
            ))
            .bind(filter.medium.as_deref().map(str::trim))
            .bind(filter.size.as_deref().map(str::trim))
            .bind(sold)
            .fetch_all(&self.pool)
            .await
            .map_err(store_error)?;

            Ok(rows.into_iter().map(Item::from).collect())
        })
    }

    fn upsert(&self, item: Item) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            // An existing sale always wins over incoming catalog data.
            sqlx::query(
                r"
                INSERT INTO artworks (
                    id, title, price_minor_units, currency, medium, dimensions, year,
                    image_urls, sold, sold_at, sold_to_name, sold_to_email, sold_session_id
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
                ON CONFLICT (id) DO UPDATE SET
                    title = EXCLUDED.title,
                    price_minor_units = EXCLUDED.price_minor_units,
                    currency = EXCLUDED.currency,
                    medium = EXCLUDED.medium,
                    dimensions = EXCLUDED.dimensions,
                    year = EXCLUDED.year,
                    image_urls = EXCLUDED.image_urls,
                    sold = artworks.sold OR EXCLUDED.sold,
                    sold_at = CASE WHEN artworks.sold THEN artworks.sold_at ELSE EXCLUDED.sold_at END,
                    sold_to_name = CASE WHEN artworks.sold THEN artworks.sold_to_name ELSE EXCLUDED.sold_to_name END,
                    sold_to_email = CASE WHEN artworks.sold THEN artworks.sold_to_email ELSE EXCLUDED.sold_to_email END,
                    sold_session_id = CASE WHEN artworks.sold THEN artworks.sold_session_id ELSE EXCLUDED.sold_session_id END,
                    updated_at = now()
                ",
            )
            .bind(item.id.as_str())
            .bind(&item.title)
            .bind(item.price_minor_units)
            .bind(item.currency.code())
            .bind(&item.medium)
            .bind(&item.dimensions)
            .bind(&item.year)
            .bind(&item.image_urls)
            .bind(item.sold)
            .bind(item.sold_at)
            .bind(&item.sold_to_name)
            .bind(&item.sold_to_email)
            .bind(item.sold_session_id.as_ref().map(SessionId::as_str))
            .execute(&self.pool)
            .await
            .map_err(store_error)?;
            Ok(())
        })
    }

    fn ping(&self) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            sqlx::query("SELECT 1")
                .execute(&self.pool)
                .await
                .map_err(store_error)?;
            Ok(())
        })
    }
}
