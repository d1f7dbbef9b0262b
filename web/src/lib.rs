//! # Atelier Web
//!
//! HTTP surface over [`atelier_core::Coordinator`].
//!
//! # Endpoints
//!
//! | Method | Path | Purpose |
//! |--------|------|---------|
//! | `POST` | `/checkout` | Validate a cart and open an embedded payment session |
//! | `GET` | `/session-status?session_id=` | Verify a session and mark its artworks sold |
//! | `GET` | `/artworks` | Browse the catalog by medium, size and availability |
//! | `GET` | `/artworks/:id` | One artwork |
//! | `GET` | `/health`, `/health/ready` | Liveness and readiness |
//!
//! # Example
//!
//! ```ignore
//! use atelier_web::{AppState, build_router};
//!
//! let coordinator = Coordinator::new(store, provider, Arc::new(SystemClock));
//! let app = build_router(AppState::new(coordinator), &config.server.cors_allowed_origins);
//! axum::serve(listener, app).await?;
//! ```

#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod router;
pub mod seed;
pub mod state;

// Re-export key types for convenience
pub use config::{Config, ConfigError, StoreBackend};
pub use error::AppError;
pub use router::build_router;
pub use state::AppState;
