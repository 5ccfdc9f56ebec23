use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use super::event::{WebhookEvent, handler_name};

/// Event types handled out of the box, each with a logging handler.
pub const DEFAULT_EVENT_TYPES: &[&str] = &[
    "customer.subscription.created",
    "customer.subscription.updated",
    "customer.subscription.deleted",
    "customer.subscription.trial_will_end",
    "customer.source.created",
    "customer.updated",
    "invoice.finalized",
    "invoice.created",
    "invoice.paid",
    "invoiceitem.created",
    "invoiceitem.updated",
    "payment_intent.created",
    "payment_intent.succeeded",
    "invoice.payment_succeeded",
];

/// Reacts to one kind of verified webhook event.
///
/// Implement this to provision or revoke access, sync records, etc. Errors
/// are not recovered by the router and surface as a server error, which asks
/// the provider to redeliver.
#[async_trait]
pub trait WebhookHandler: Send + Sync + 'static {
    async fn handle(&self, event: &WebhookEvent) -> anyhow::Result<()>;
}

/// Adapter turning an async closure into a [`WebhookHandler`].
pub struct FnHandler<F>(F);

/// Wraps `f` as a handler. The closure receives its own copy of the event.
pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(WebhookEvent) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    FnHandler(f)
}

#[async_trait]
impl<F, Fut> WebhookHandler for FnHandler<F>
where
    F: Fn(WebhookEvent) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    async fn handle(&self, event: &WebhookEvent) -> anyhow::Result<()> {
        (self.0)(event.clone()).await
    }
}

/// Default handler that logs webhook events without taking any action.
pub struct LoggingWebhookHandler;

#[async_trait]
impl WebhookHandler for LoggingWebhookHandler {
    async fn handle(&self, event: &WebhookEvent) -> anyhow::Result<()> {
        tracing::info!(
            event_id = ?event.id,
            event_type = %event.event_type,
            object_id = ?event.object_id(),
            "Webhook received (no-op handler)"
        );
        Ok(())
    }
}

/// Registry from derived handler name to handler.
#[derive(Clone, Default)]
pub struct WebhookRouter {
    handlers: BTreeMap<String, Arc<dyn WebhookHandler>>,
}

impl WebhookRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Logging handlers for [`DEFAULT_EVENT_TYPES`].
    pub fn with_default_handlers() -> Self {
        let logging: Arc<dyn WebhookHandler> = Arc::new(LoggingWebhookHandler);
        DEFAULT_EVENT_TYPES
            .iter()
            .fold(Self::new(), |router, event_type| {
                router.on_arc(event_type, logging.clone())
            })
    }

    /// Registers `handler` for `event_type`, replacing any previous one.
    pub fn on(self, event_type: &str, handler: impl WebhookHandler) -> Self {
        self.on_arc(event_type, Arc::new(handler))
    }

    pub fn on_arc(mut self, event_type: &str, handler: Arc<dyn WebhookHandler>) -> Self {
        self.handlers.insert(handler_name(event_type), handler);
        self
    }

    pub fn remove(mut self, event_type: &str) -> Self {
        self.handlers.remove(&handler_name(event_type));
        self
    }

    pub fn handler(&self, name: &str) -> Option<&Arc<dyn WebhookHandler>> {
        self.handlers.get(name)
    }

    pub fn handles(&self, event_type: &str) -> bool {
        self.handlers.contains_key(&handler_name(event_type))
    }

    /// Registered handler names, sorted.
    pub fn handler_names(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for WebhookRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookRouter")
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}
