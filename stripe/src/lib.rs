//! # Stripe Checkout Client
//!
//! `PaymentProvider` implementation over Stripe Checkout in embedded UI mode.
//!
//! ## Example
//!
//! ```no_run
//! use atelier_stripe::{StripeClient, StripeConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = StripeClient::new(
//!     StripeConfig::new("sk_test_...")
//!         .with_return_url("https://shop.example/success?session_id={CHECKOUT_SESSION_ID}"),
//! )?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//!
//! - Session creation with one `price_data` line per item and string metadata
//! - Session retrieval with `expand[]=payment_intent` so all three statuses
//!   are available for verification
//! - Stripe error envelopes mapped onto `ProviderError`

pub mod client;
pub mod error;
pub mod wire;

// Re-export main types for convenience
pub use client::{DEFAULT_API_URL, DEFAULT_RETURN_URL, StripeClient, StripeConfig};
pub use error::StripeError;
