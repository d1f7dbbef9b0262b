//! `PostgreSQL` content store for Atelier.
//!
//! This crate provides a PostgreSQL-backed implementation of the
//! `ContentStore` trait from `atelier-core`. It uses sqlx runtime queries and
//! supports:
//!
//! - Item lookups and filtered catalog listing
//! - Marking items sold with a single conditional `UPDATE`
//! - Catalog upserts that never un-sell a piece
//! - Connection pooling and embedded migrations
//!
//! # Example
//!
//! ```ignore
//! use atelier_postgres::PostgresContentStore;
//! use std::time::Duration;
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let store =
//!         PostgresContentStore::connect("postgres://localhost/atelier", 10, Duration::from_secs(30))
//!             .await?;
//!     store.migrate().await?;
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod content_store;

pub use content_store::PostgresContentStore;
