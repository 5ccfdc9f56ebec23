//! Remote provider seam.
//!
//! [`CheckoutProvider`] is everything the gateway needs from the payment
//! provider. [`StripeClient`] talks to the real REST API; tests substitute an
//! in-memory implementation.

mod client;
mod form;
mod types;

use async_trait::async_trait;
use serde::Deserialize;

pub use client::StripeClient;
pub use form::FormParams;
pub use types::{
    CreateCustomerParams, CreateSessionParams, Customer, LineItem, Lookup, Session,
};

/// Error code the provider uses when an object id does not exist.
pub const RESOURCE_MISSING: &str = "resource_missing";

const INVALID_REQUEST_ERROR: &str = "invalid_request_error";

/// Ids travel as a single path segment, so dot segments would address a
/// different endpoint.
pub fn is_valid_id(id: &str) -> bool {
    !matches!(id, "" | "." | "..")
}

#[async_trait]
pub trait CheckoutProvider: Send + Sync + 'static {
    async fn create_session(&self, params: &CreateSessionParams) -> Result<Session, StripeError>;

    async fn retrieve_session(&self, id: &str, expand: &[String]) -> Result<Session, StripeError>;

    /// Looks a customer up by id. A missing customer is [`Lookup::Missing`],
    /// not an error.
    async fn retrieve_customer(&self, id: &str) -> Result<Lookup<Customer>, StripeError>;

    async fn create_customer(&self, params: &CreateCustomerParams)
    -> Result<Customer, StripeError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StripeError {
    #[error("{0}")]
    Api(ApiError),

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid object id: {0:?}")]
    InvalidId(String),
}

impl StripeError {
    /// True for the provider's "no such object" answer.
    pub fn is_resource_missing(&self) -> bool {
        match self {
            StripeError::Api(api) => api.is_resource_missing(),
            _ => false,
        }
    }
}

/// Structured error returned by the provider, plus the HTTP status it came with.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiError {
    #[serde(skip)]
    pub status: u16,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub code: Option<String>,
    pub message: Option<String>,
    pub param: Option<String>,
}

impl ApiError {
    pub fn is_resource_missing(&self) -> bool {
        self.kind.as_deref() == Some(INVALID_REQUEST_ERROR)
            && self.code.as_deref() == Some(RESOURCE_MISSING)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({}): {}",
            self.kind.as_deref().unwrap_or("api_error"),
            self.status,
            self.message.as_deref().unwrap_or("no message")
        )?;
        if let Some(code) = &self.code {
            write!(f, " [{code}]")?;
        }
        Ok(())
    }
}
