//! Stripe Checkout client implementation

use crate::error::StripeError;
use crate::wire::{CheckoutSession, ErrorEnvelope, session_form};
use atelier_core::payment::{PaymentProvider, ProviderFuture, RetrieveOptions};
use atelier_core::types::{CreateSessionRequest, CreatedSession, Session, SessionId};
use reqwest::{Client, Response, StatusCode, Url};
use std::time::Duration;

/// Default API base URL
pub const DEFAULT_API_URL: &str = "https://api.stripe.com/v1";

/// Default return URL; Stripe substitutes `{CHECKOUT_SESSION_ID}`.
pub const DEFAULT_RETURN_URL: &str =
    "http://localhost:3000/success?session_id={CHECKOUT_SESSION_ID}";

/// Stripe client settings, passed in explicitly.
#[derive(Clone, Debug)]
pub struct StripeConfig {
    /// Secret API key (`sk_...`)
    pub secret_key: String,
    /// API base URL, overridable for tests
    pub api_url: String,
    /// Where the embedded checkout sends the buyer when done
    pub return_url: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl StripeConfig {
    /// Config with default URLs and a 20 second timeout
    #[must_use]
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self {
            secret_key: secret_key.into(),
            api_url: DEFAULT_API_URL.to_string(),
            return_url: DEFAULT_RETURN_URL.to_string(),
            timeout: Duration::from_secs(20),
        }
    }

    /// Override the API base URL
    #[must_use]
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    /// Override the return URL
    #[must_use]
    pub fn with_return_url(mut self, return_url: impl Into<String>) -> Self {
        self.return_url = return_url.into();
        self
    }
}

/// Stripe Checkout API client
#[derive(Clone)]
pub struct StripeClient {
    client: Client,
    secret_key: String,
    api_url: Url,
    return_url: String,
}

impl std::fmt::Debug for StripeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeClient")
            .field("api_url", &self.api_url)
            .field("return_url", &self.return_url)
            .finish_non_exhaustive()
    }
}

impl StripeClient {
    /// Create a new client
    ///
    /// # Errors
    ///
    /// Returns `StripeError::InvalidConfig` if the secret key is empty, the API
    /// URL is not an absolute base URL, or the HTTP client cannot be built
    pub fn new(config: StripeConfig) -> Result<Self, StripeError> {
        if config.secret_key.trim().is_empty() {
            return Err(StripeError::InvalidConfig("secret key is empty".to_string()));
        }
        let api_url = Url::parse(config.api_url.trim_end_matches('/'))
            .map_err(|e| StripeError::InvalidConfig(format!("invalid API URL: {e}")))?;
        if api_url.cannot_be_a_base() {
            return Err(StripeError::InvalidConfig(format!(
                "API URL {api_url} cannot carry a path"
            )));
        }
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| StripeError::InvalidConfig(e.to_string()))?;

        Ok(Self {
            client,
            secret_key: config.secret_key,
            api_url,
            return_url: config.return_url,
        })
    }

    /// `{api_url}/checkout/sessions`, plus the session id as one encoded
    /// path segment when given.
    fn sessions_url(&self, session_id: Option<&str>) -> Result<Url, StripeError> {
        if let Some(id) = session_id.filter(|id| matches!(*id, "" | "." | "..")) {
            return Err(StripeError::InvalidSessionId(id.to_string()));
        }

        let mut url = self.api_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                StripeError::InvalidConfig(format!("API URL {} cannot carry a path", self.api_url))
            })?
            .pop_if_empty()
            .extend(["checkout", "sessions"].into_iter().chain(session_id));
        Ok(url)
    }

    /// Create an embedded Checkout Session
    ///
    /// # Errors
    ///
    /// Returns errors for network failures, API errors, or parsing failures
    pub async fn create_checkout_session(
        &self,
        request: &CreateSessionRequest,
    ) -> Result<CheckoutSession, StripeError> {
        let form = session_form(request, &self.return_url);
        tracing::debug!(lines = request.line_items.len(), "Creating Stripe checkout session");

        let response = self
            .client
            .post(self.sessions_url(None)?)
            .bearer_auth(&self.secret_key)
            .form(&form)
            .send()
            .await
            .map_err(|e| StripeError::RequestFailed(e.to_string()))?;

        parse(response).await
    }

    /// Retrieve a Checkout Session, optionally expanding related objects
    ///
    /// # Errors
    ///
    /// Returns errors for network failures, API errors, or parsing failures
    pub async fn retrieve_checkout_session(
        &self,
        session_id: &str,
        expand: &[String],
    ) -> Result<CheckoutSession, StripeError> {
        let url = self.sessions_url(Some(session_id))?;
        let query: Vec<(&str, &str)> = expand.iter().map(|key| ("expand[]", key.as_str())).collect();

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.secret_key)
            .query(&query)
            .send()
            .await
            .map_err(|e| StripeError::RequestFailed(e.to_string()))?;

        parse(response).await
    }
}

async fn parse(response: Response) -> Result<CheckoutSession, StripeError> {
    match response.status() {
        StatusCode::OK => response
            .json::<CheckoutSession>()
            .await
            .map_err(|e| StripeError::ResponseParseFailed(e.to_string())),
        StatusCode::TOO_MANY_REQUESTS => Err(StripeError::RateLimited),
        StatusCode::UNAUTHORIZED => Err(StripeError::Unauthorized),
        status => {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .ok()
                .and_then(|envelope| envelope.error.message)
                .unwrap_or(body);
            Err(StripeError::ApiError {
                status: status.as_u16(),
                message,
            })
        }
    }
}

impl PaymentProvider for StripeClient {
    fn create_session(&self, request: CreateSessionRequest) -> ProviderFuture<'_, CreatedSession> {
        Box::pin(async move {
            let session = self.create_checkout_session(&request).await?;
            let client_secret = session.client_secret.ok_or_else(|| {
                StripeError::ResponseParseFailed("session has no client_secret".to_string())
            })?;
            Ok(CreatedSession {
                session_id: SessionId::new(session.id),
                client_secret,
            })
        })
    }

    fn retrieve_session<'a>(
        &'a self,
        session_id: &'a SessionId,
        options: &'a RetrieveOptions,
    ) -> ProviderFuture<'a, Session> {
        Box::pin(async move {
            let session = self
                .retrieve_checkout_session(session_id.as_str(), &options.expand)
                .await?;
            Ok(Session::from(session))
        })
    }
}
