use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::stripe::StripeError;

#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    #[error("Stripe error: {0}")]
    Stripe(#[from] StripeError),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid value for field: {0}")]
    InvalidField(&'static str),

    #[error("Could not build URL: {0}")]
    Url(String),

    #[error("Refusing to redirect to other host: {0}")]
    UnsafeRedirect(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Internal(#[from] anyhow::Error),
}

impl From<url::ParseError> for CheckoutError {
    fn from(err: url::ParseError) -> Self {
        CheckoutError::Url(err.to_string())
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for CheckoutError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            CheckoutError::Stripe(StripeError::Api(api_error)) => {
                let status = match api_error.status {
                    400 => StatusCode::BAD_REQUEST,
                    401 => StatusCode::UNAUTHORIZED,
                    402 => StatusCode::PAYMENT_REQUIRED,
                    404 => StatusCode::NOT_FOUND,
                    429 => StatusCode::TOO_MANY_REQUESTS,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                let message = api_error
                    .message
                    .clone()
                    .unwrap_or_else(|| "Payment processing error".to_string());
                (status, message)
            }
            CheckoutError::Stripe(StripeError::InvalidId(_)) => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            CheckoutError::Stripe(_) => (
                StatusCode::BAD_GATEWAY,
                "Payment provider unavailable".to_string(),
            ),
            CheckoutError::MissingField(_) | CheckoutError::InvalidField(_) => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            CheckoutError::Url(_)
            | CheckoutError::UnsafeRedirect(_)
            | CheckoutError::Config(_)
            | CheckoutError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        tracing::error!(%status, error = %self, "Checkout service error");

        (status, axum::Json(ErrorBody { error: message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stripe::ApiError;

    fn api_error(status: u16) -> CheckoutError {
        CheckoutError::Stripe(StripeError::Api(ApiError {
            status,
            kind: Some("invalid_request_error".to_string()),
            code: None,
            message: Some("No such price: 'price_missing'".to_string()),
            param: None,
        }))
    }

    #[test]
    fn provider_statuses_pass_through() {
        assert_eq!(api_error(404).into_response().status(), StatusCode::NOT_FOUND);
        assert_eq!(
            api_error(429).into_response().status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            api_error(503).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn internal_errors_hide_details() {
        let response = CheckoutError::Config("STRIPE_SECRET_KEY missing".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn missing_fields_are_client_errors() {
        let response = CheckoutError::MissingField("checkout_session_id").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let response = CheckoutError::InvalidField("checkout_session_id").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn invalid_ids_are_client_errors_not_gateway_failures() {
        let response = CheckoutError::Stripe(StripeError::InvalidId("..".into())).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let response = CheckoutError::Stripe(StripeError::Decode(
            serde_json::from_str::<()>("{").unwrap_err(),
        ))
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
