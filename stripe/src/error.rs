//! Error types for the Stripe client

use atelier_core::error::ProviderError;
use thiserror::Error;

/// Errors that can occur when talking to the Stripe API
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StripeError {
    /// The client could not be built from its configuration
    #[error("Invalid Stripe configuration: {0}")]
    InvalidConfig(String),

    /// A session id that cannot name a Checkout Session
    #[error("Invalid checkout session id: {0:?}")]
    InvalidSessionId(String),

    /// HTTP request failed
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// Response parsing failed
    #[error("Response parsing failed: {0}")]
    ResponseParseFailed(String),

    /// Rate limited - too many requests
    #[error("Rate limited - too many requests")]
    RateLimited,

    /// Unauthorized - invalid secret key
    #[error("Unauthorized - invalid Stripe secret key")]
    Unauthorized,

    /// API returned an error
    #[error("API error (status {status}): {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from Stripe
        message: String,
    },
}

impl From<StripeError> for ProviderError {
    fn from(err: StripeError) -> Self {
        match err {
            StripeError::RequestFailed(message) | StripeError::InvalidConfig(message) => {
                Self::RequestFailed(message)
            }
            StripeError::ResponseParseFailed(message) => Self::ResponseParseFailed(message),
            StripeError::RateLimited => Self::Api {
                status: 429,
                message: "rate limited".to_string(),
            },
            StripeError::Unauthorized => Self::Api {
                status: 401,
                message: "invalid secret key".to_string(),
            },
            StripeError::InvalidSessionId(id) => Self::Api {
                status: 404,
                message: format!("no such checkout session: {id:?}"),
            },
            StripeError::ApiError { status, message } => Self::Api { status, message },
        }
    }
}
