use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::debug;

pub mod analytics;
pub mod callback;
pub mod config;
pub mod customer;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod redirect;
pub mod service;
pub mod stripe;
pub mod types;
pub mod webhook;

use service::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let checkout_routes = Router::new()
        .route("/checkout_sessions/new", get(handlers::new_checkout_session))
        .route(
            "/checkout_sessions/show",
            get(handlers::show_checkout_session),
        );

    let webhook_route = Router::new().route("/webhooks/stripe", post(handlers::handle_webhook));

    checkout_routes
        .merge(webhook_route)
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

pub fn init_checkout_service() -> Result<Router> {
    debug!("Initializing checkout service");

    let state = Arc::new(AppState::from_env().context("Failed to create checkout service state")?);

    Ok(create_router(state))
}

pub use callback::{CallbackCodec, CallbackStrategy, UrlBuilder};
pub use config::CheckoutConfig;
pub use customer::CheckoutCustomer;
pub use error::CheckoutError;
pub use gateway::{CheckoutContext, CustomerProfile, SessionGateway, SessionRequest};
pub use types::{CheckoutSessionSummary, NewCheckoutQuery, ShowCheckoutQuery};
pub use webhook::{WebhookEndpoint, WebhookHandler, WebhookRouter, handler_fn};
