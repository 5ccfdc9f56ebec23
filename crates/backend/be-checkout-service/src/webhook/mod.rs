//! Inbound webhooks: verify, parse, route.
//!
//! ```text
//! Unverified ── bad/missing signature ──▶ Rejected(BadSignature)   400
//!     │
//!     ├──────── unparseable body ───────▶ Rejected(BadPayload)     400
//!     ▼
//! Verified ──── no handler for name ───▶ Rejected(Unhandled)      400
//!     │
//!     ▼
//! Handled                                                         204
//! ```
//!
//! Handler errors are returned as-is and are not a rejection.

mod event;
mod router;
mod verifier;

use axum::http::StatusCode;
use tracing::{error, info, warn};

pub use event::{EventData, WebhookEvent, handler_name};
pub use router::{
    DEFAULT_EVENT_TYPES, FnHandler, LoggingWebhookHandler, WebhookHandler, WebhookRouter,
    handler_fn,
};
pub use verifier::{VerifyError, WebhookVerifier, sign_payload};

/// Header carrying the provider's signature.
pub const SIGNATURE_HEADER: &str = "stripe-signature";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    BadSignature(VerifyError),
    BadPayload(String),
    /// Carries the event type that had no handler.
    Unhandled(String),
}

impl Rejection {
    pub fn kind(&self) -> &'static str {
        match self {
            Rejection::BadSignature(_) => "bad_signature",
            Rejection::BadPayload(_) => "bad_payload",
            Rejection::Unhandled(_) => "unhandled",
        }
    }
}

/// Terminal state of one webhook delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    Handled { event_type: String },
    Rejected(Rejection),
}

impl WebhookOutcome {
    pub fn status(&self) -> StatusCode {
        match self {
            WebhookOutcome::Handled { .. } => StatusCode::NO_CONTENT,
            WebhookOutcome::Rejected(_) => StatusCode::BAD_REQUEST,
        }
    }
}

/// Verifier and router bound together for one endpoint.
#[derive(Debug)]
pub struct WebhookEndpoint {
    verifier: WebhookVerifier,
    router: WebhookRouter,
}

impl WebhookEndpoint {
    pub fn new(verifier: WebhookVerifier, router: WebhookRouter) -> Self {
        Self { verifier, router }
    }

    /// Runs one delivery through the state machine. `Err` only when the
    /// handler itself failed.
    pub async fn receive(
        &self,
        payload: &[u8],
        signature: Option<&str>,
    ) -> anyhow::Result<WebhookOutcome> {
        if let Err(err) = self.verifier.verify(payload, signature) {
            error!(error = %err, "Webhook signature verification failed");
            return Ok(WebhookOutcome::Rejected(Rejection::BadSignature(err)));
        }

        let event = match WebhookEvent::from_slice(payload) {
            Ok(event) => event,
            Err(err) => {
                error!(error = %err, "Could not parse webhook payload");
                return Ok(WebhookOutcome::Rejected(Rejection::BadPayload(
                    err.to_string(),
                )));
            }
        };

        let name = event.handler_name();
        info!(event_type = %event.event_type, handler = %name, "Webhook dispatching");

        let Some(handler) = self.router.handler(&name) else {
            warn!(event_type = %event.event_type, handler = %name, "Unhandled webhook event");
            return Ok(WebhookOutcome::Rejected(Rejection::Unhandled(
                event.event_type,
            )));
        };

        handler.handle(&event).await?;
        Ok(WebhookOutcome::Handled {
            event_type: event.event_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use secrecy::SecretString;
    use serde_json::{Value, json};
    use tokio::sync::Mutex;

    use super::*;

    const SECRET: &str = "whsec_test_secret";

    fn endpoint(router: WebhookRouter) -> WebhookEndpoint {
        WebhookEndpoint::new(
            WebhookVerifier::new(Some(SecretString::from(SECRET.to_string()))),
            router,
        )
    }

    fn signed(payload: &str) -> String {
        sign_payload(SECRET, chrono::Utc::now().timestamp(), payload)
    }

    fn event(event_type: &str) -> String {
        json!({
            "id": "evt_test",
            "object": "event",
            "api_version": "2017-05-25",
            "created": 1533204620,
            "livemode": false,
            "pending_webhooks": 1,
            "data": { "object": { "id": "in_123", "object": "invoice", "paid": true } },
            "type": event_type
        })
        .to_string()
    }

    #[tokio::test]
    async fn registered_handler_runs_once_with_the_payload() {
        let seen: Arc<Mutex<Vec<Value>>> = Arc::default();
        let sink = seen.clone();
        let endpoint = endpoint(WebhookRouter::new().on(
            "invoice.paid",
            handler_fn(move |event: WebhookEvent| {
                let sink = sink.clone();
                async move {
                    sink.lock().await.push(event.data.object);
                    Ok(())
                }
            }),
        ));

        let payload = event("invoice.paid");
        let outcome = endpoint
            .receive(payload.as_bytes(), Some(&signed(&payload)))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            WebhookOutcome::Handled {
                event_type: "invoice.paid".into()
            }
        );
        assert_eq!(outcome.status(), StatusCode::NO_CONTENT);
        let seen = seen.lock().await;
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0]["id"], "in_123");
    }

    #[tokio::test]
    async fn bad_signature_runs_no_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let endpoint = endpoint(WebhookRouter::new().on(
            "invoice.paid",
            handler_fn(move |_event| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Ok(()) }
            }),
        ));

        let payload = event("invoice.paid");
        let outcome = endpoint
            .receive(payload.as_bytes(), Some("t=123,v1=deadbeef"))
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            WebhookOutcome::Rejected(Rejection::BadSignature(_))
        ));
        assert_eq!(outcome.status(), StatusCode::BAD_REQUEST);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn signed_garbage_is_a_bad_payload() {
        let endpoint = endpoint(WebhookRouter::with_default_handlers());
        let payload = "{not json";

        let outcome = endpoint
            .receive(payload.as_bytes(), Some(&signed(payload)))
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            WebhookOutcome::Rejected(Rejection::BadPayload(_))
        ));
    }

    #[tokio::test]
    async fn unknown_event_types_are_rejected() {
        let endpoint = endpoint(WebhookRouter::with_default_handlers());
        let payload = event("charge.refunded");

        let outcome = endpoint
            .receive(payload.as_bytes(), Some(&signed(&payload)))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            WebhookOutcome::Rejected(Rejection::Unhandled("charge.refunded".into()))
        );
        assert_eq!(outcome.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn handler_errors_are_not_rejections() {
        let endpoint = endpoint(WebhookRouter::new().on(
            "invoice.paid",
            handler_fn(|_event| async { Err(anyhow::anyhow!("database unavailable")) }),
        ));
        let payload = event("invoice.paid");

        let result = endpoint
            .receive(payload.as_bytes(), Some(&signed(&payload)))
            .await;

        assert!(result.is_err());
    }

    #[test]
    fn rejection_kinds_are_stable() {
        assert_eq!(Rejection::Unhandled("x".into()).kind(), "unhandled");
        assert_eq!(Rejection::BadPayload("x".into()).kind(), "bad_payload");
        assert_eq!(
            Rejection::BadSignature(VerifyError::NoSecret).kind(),
            "bad_signature"
        );
    }
}
