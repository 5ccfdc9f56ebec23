use std::net::SocketAddr;

use secrecy::SecretString;
use url::Url;

use crate::callback::CallbackStrategy;
use crate::error::CheckoutError;

const DEFAULT_API_BASE: &str = "https://api.stripe.com";
const DEFAULT_APP_URL: &str = "http://localhost:3000";
const DEFAULT_HTTP_ADDR: &str = "0.0.0.0:3000";

#[derive(Debug)]
pub struct CheckoutConfig {
    pub stripe_secret_key: SecretString,
    /// `None` makes every webhook verification fail.
    pub stripe_signing_secret: Option<SecretString>,
    pub stripe_api_base: Url,
    /// Public base URL used to build absolute callback URLs.
    pub app_url: Url,
    pub http_addr: SocketAddr,
    pub default_price_id: Option<String>,
    pub checkout_mode: String,
    pub callback_strategy: CallbackStrategy,
}

impl CheckoutConfig {
    pub fn from_env() -> Result<Self, CheckoutError> {
        let stripe_secret_key = std::env::var("STRIPE_SECRET_KEY")
            .map(SecretString::from)
            .map_err(|_| {
                CheckoutError::Config("STRIPE_SECRET_KEY environment variable must be set".into())
            })?;

        let stripe_signing_secret = std::env::var("STRIPE_SIGNING_SECRET")
            .ok()
            .filter(|s| !s.is_empty())
            .map(SecretString::from);
        if stripe_signing_secret.is_none() {
            tracing::warn!("STRIPE_SIGNING_SECRET not set, every webhook will be rejected");
        }

        let stripe_api_base = parse_url(
            "STRIPE_API_BASE",
            &std::env::var("STRIPE_API_BASE").unwrap_or_else(|_| DEFAULT_API_BASE.to_string()),
        )?;

        let app_url = parse_url(
            "APP_URL",
            &std::env::var("APP_URL").unwrap_or_else(|_| DEFAULT_APP_URL.to_string()),
        )?;

        let http_addr = std::env::var("HTTP_ADDR")
            .unwrap_or_else(|_| DEFAULT_HTTP_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| CheckoutError::Config(format!("HTTP_ADDR is not a socket address: {e}")))?;

        let default_price_id = std::env::var("STRIPE_PRICE_ID")
            .ok()
            .filter(|s| !s.is_empty());

        let checkout_mode =
            std::env::var("CHECKOUT_MODE").unwrap_or_else(|_| "subscription".to_string());

        let callback_strategy = match std::env::var("CALLBACK_STRATEGY") {
            Ok(value) => value.parse()?,
            Err(_) => CallbackStrategy::default(),
        };

        Ok(Self {
            stripe_secret_key,
            stripe_signing_secret,
            stripe_api_base,
            app_url,
            http_addr,
            default_price_id,
            checkout_mode,
            callback_strategy,
        })
    }
}

fn parse_url(name: &str, value: &str) -> Result<Url, CheckoutError> {
    let url = Url::parse(value)
        .map_err(|e| CheckoutError::Config(format!("{name} '{value}' is not a valid URL: {e}")))?;
    if url.cannot_be_a_base() {
        return Err(CheckoutError::Config(format!(
            "{name} '{value}' must be an absolute http(s) URL"
        )));
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_url_accepts_absolute_urls() {
        let url = parse_url("APP_URL", "https://shop.example.com/app").unwrap();
        assert_eq!(url.host_str(), Some("shop.example.com"));
    }

    #[test]
    fn parse_url_rejects_relative_and_opaque_urls() {
        assert!(matches!(
            parse_url("APP_URL", "/checkout"),
            Err(CheckoutError::Config(_))
        ));
        assert!(matches!(
            parse_url("APP_URL", "mailto:billing@example.com"),
            Err(CheckoutError::Config(_))
        ));
    }
}
