use serde::{Deserialize, Serialize};

use crate::stripe::Session;

#[derive(Debug, Default, Deserialize)]
pub struct NewCheckoutQuery {
    pub checkout_session_id: Option<String>,
    pub id: Option<String>,
    /// Overrides the configured default price.
    pub price: Option<String>,
    pub quantity: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ShowCheckoutQuery {
    pub checkout_session_id: Option<String>,
    pub id: Option<String>,
    /// `success` or `cancel`, set by the callback URLs.
    pub state: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CheckoutSessionSummary {
    pub id: String,
    pub status: Option<String>,
    pub payment_status: Option<String>,
    pub mode: Option<String>,
    pub customer_id: Option<String>,
    pub subscription_id: Option<String>,
    pub state: Option<String>,
}

impl CheckoutSessionSummary {
    pub fn new(session: &Session, state: Option<String>) -> Self {
        Self {
            id: session.id.clone(),
            status: session.status.clone(),
            payment_status: session.payment_status.clone(),
            mode: session.mode.clone(),
            customer_id: session.customer_id().map(str::to_string),
            subscription_id: session.subscription_id().map(str::to_string),
            state,
        }
    }
}
