//! HTTP handlers.

pub mod artworks;
pub mod checkout;
pub mod health;
pub mod session_status;
