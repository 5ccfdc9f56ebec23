use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};

use crate::callback::{CallbackCodec, RouteUrlBuilder};
use crate::config::CheckoutConfig;
use crate::error::CheckoutError;
use crate::gateway::SessionGateway;
use crate::stripe::{CheckoutProvider, StripeClient};
use crate::webhook::{WebhookEndpoint, WebhookRouter, WebhookVerifier};

/// Path the checkout routes are mounted under.
pub const CHECKOUT_MOUNT: &str = "/checkout_sessions";

pub struct AppState {
    pub config: CheckoutConfig,
    pub gateway: Arc<SessionGateway>,
    pub webhooks: Arc<WebhookEndpoint>,
}

impl AppState {
    pub fn from_env() -> Result<Self, CheckoutError> {
        Self::from_config(CheckoutConfig::from_env()?)
    }

    /// Stripe-backed state with the default webhook handlers.
    pub fn from_config(config: CheckoutConfig) -> Result<Self, CheckoutError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("be-checkout-service/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CheckoutError::Config(format!("Failed to build HTTP client: {e}")))?;
        let client = StripeClient::with_http_client(
            http,
            config.stripe_api_base.clone(),
            rewrap(&config.stripe_secret_key),
        );
        Ok(Self::new(
            config,
            Arc::new(client),
            WebhookRouter::with_default_handlers(),
        ))
    }

    pub fn new(
        config: CheckoutConfig,
        provider: Arc<dyn CheckoutProvider>,
        webhook_router: WebhookRouter,
    ) -> Self {
        let builder = RouteUrlBuilder::new(config.app_url.clone(), CHECKOUT_MOUNT);
        let callbacks = CallbackCodec::new(Arc::new(builder), config.callback_strategy);
        let gateway = Arc::new(SessionGateway::new(provider, callbacks));

        let verifier = WebhookVerifier::new(config.stripe_signing_secret.as_ref().map(rewrap));
        let webhooks = Arc::new(WebhookEndpoint::new(verifier, webhook_router));

        Self {
            config,
            gateway,
            webhooks,
        }
    }
}

fn rewrap(secret: &SecretString) -> SecretString {
    SecretString::from(secret.expose_secret().to_string())
}
