use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use tracing::{error, info};

use crate::analytics;
use crate::customer::CheckoutCustomer;
use crate::error::CheckoutError;
use crate::gateway::{CheckoutContext, SessionRequest};
use crate::redirect::{respond_with_redirect, respond_with_show_redirect};
use crate::service::AppState;
use crate::stripe::{CreateSessionParams, StripeError};
use crate::types::{CheckoutSessionSummary, NewCheckoutQuery, ShowCheckoutQuery};
use crate::webhook::{SIGNATURE_HEADER, WebhookOutcome};

/// Expanded on the callback page so the summary carries ids either way.
const SHOW_EXPAND: [&str; 2] = ["customer", "subscription"];

// ---------------------------------------------------------------------------
// GET /checkout_sessions/new
// ---------------------------------------------------------------------------

/// Gets or creates the request's checkout session and sends the browser to
/// its hosted page.
pub async fn new_checkout_session(
    State(state): State<Arc<AppState>>,
    Query(query): Query<NewCheckoutQuery>,
    CheckoutCustomer(customer): CheckoutCustomer,
) -> Result<Response, CheckoutError> {
    let mut request = SessionRequest {
        checkout_session_id: query.checkout_session_id,
        id: query.id,
        customer,
        ..Default::default()
    };

    if request.session_id().is_none() {
        let quantity = query.quantity.unwrap_or(1);
        if quantity == 0 {
            return Err(CheckoutError::InvalidField("quantity"));
        }
        let price = query
            .price
            .filter(|p| !p.trim().is_empty())
            .or_else(|| state.config.default_price_id.clone())
            .ok_or(CheckoutError::MissingField("price"))?;

        request.attributes = CreateSessionParams::new()
            .mode(state.config.checkout_mode.as_str())
            .line_item(price, quantity);
    }

    let reused = request.session_id().is_some();
    let has_customer = request.customer.is_some();
    let ctx = CheckoutContext::new(state.gateway.clone(), request);

    let session = match ctx.session().await {
        Ok(session) => session,
        Err(e) => {
            error!(error = %e, "Failed to resolve checkout session");
            analytics::track_checkout_session_failed(error_kind(&e));
            return Err(e);
        }
    };
    analytics::track_checkout_session_resolved(reused, has_customer);

    if reused && session.url.as_deref().is_none_or(str::is_empty) {
        return respond_with_show_redirect(
            state.gateway.callbacks(),
            &session,
            state.config.app_url.host_str(),
        );
    }
    respond_with_redirect(&session)
}

// ---------------------------------------------------------------------------
// GET /checkout_sessions/show
// ---------------------------------------------------------------------------

/// Callback target for the provider's success and cancel redirects.
pub async fn show_checkout_session(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ShowCheckoutQuery>,
) -> Result<Json<CheckoutSessionSummary>, CheckoutError> {
    let request = SessionRequest {
        checkout_session_id: query.checkout_session_id,
        id: query.id,
        expand: SHOW_EXPAND.iter().map(|s| s.to_string()).collect(),
        ..Default::default()
    };
    if request.session_id().is_none() {
        return Err(CheckoutError::MissingField("checkout_session_id"));
    }

    let ctx = CheckoutContext::new(state.gateway.clone(), request);
    let session = ctx.session().await?;

    info!(
        session_id = %session.id,
        status = ?session.status,
        state = ?query.state,
        "Checkout session shown"
    );
    analytics::track_checkout_session_shown(session.status.as_deref(), query.state.as_deref());

    Ok(Json(CheckoutSessionSummary::new(&session, query.state)))
}

// ---------------------------------------------------------------------------
// POST /webhooks/stripe
// ---------------------------------------------------------------------------

/// Verifies and routes one webhook delivery. The body is taken raw because
/// the signature covers the exact bytes sent.
pub async fn handle_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, CheckoutError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    let outcome = match state.webhooks.receive(&body, signature).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!(error = %e, "Webhook handler failed");
            return Err(CheckoutError::Internal(e));
        }
    };

    match &outcome {
        WebhookOutcome::Handled { event_type } => analytics::track_webhook_handled(event_type),
        WebhookOutcome::Rejected(rejection) => analytics::track_webhook_rejected(rejection.kind()),
    }

    Ok(outcome.status())
}

fn error_kind(error: &CheckoutError) -> &'static str {
    match error {
        CheckoutError::Stripe(e) if e.is_resource_missing() => "resource_missing",
        CheckoutError::Stripe(StripeError::InvalidId(_)) => "bad_request",
        CheckoutError::Stripe(_) => "stripe",
        CheckoutError::MissingField(_) | CheckoutError::InvalidField(_) => "bad_request",
        CheckoutError::Url(_) | CheckoutError::UnsafeRedirect(_) => "url",
        CheckoutError::Config(_) | CheckoutError::Internal(_) => "internal",
    }
}
