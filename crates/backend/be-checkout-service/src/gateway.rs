//! Create-or-retrieve for checkout sessions, with find-or-create customers.
//!
//! [`SessionGateway`] is process-wide and stateless. [`CheckoutContext`] is
//! built per request and memoizes the session and customer it resolves.

use std::fmt::Display;
use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::callback::CallbackCodec;
use crate::error::CheckoutError;
use crate::stripe::{
    CheckoutProvider, CreateCustomerParams, CreateSessionParams, Customer, Session, is_valid_id,
};

/// Customer identity the host application wants attached to the session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomerProfile {
    /// Application id, already coerced to its string form.
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,
}

impl CustomerProfile {
    pub fn new(id: impl Display) -> Self {
        Self {
            id: id.to_string(),
            ..Default::default()
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// Everything a single checkout request contributes.
#[derive(Debug, Clone, Default)]
pub struct SessionRequest {
    /// `checkout_session_id` parameter.
    pub checkout_session_id: Option<String>,
    /// `id` parameter, consulted when `checkout_session_id` is absent.
    pub id: Option<String>,
    /// Fields to expand when retrieving.
    pub expand: Vec<String>,
    /// Caller attributes for creation.
    pub attributes: CreateSessionParams,
    pub customer: Option<CustomerProfile>,
}

impl SessionRequest {
    /// Existing session id, ignoring blank values.
    pub fn session_id(&self) -> Option<&str> {
        [&self.checkout_session_id, &self.id]
            .into_iter()
            .flatten()
            .map(|id| id.trim())
            .find(|id| !id.is_empty())
    }
}

pub struct SessionGateway {
    provider: Arc<dyn CheckoutProvider>,
    callbacks: CallbackCodec,
}

impl SessionGateway {
    pub fn new(provider: Arc<dyn CheckoutProvider>, callbacks: CallbackCodec) -> Self {
        Self {
            provider,
            callbacks,
        }
    }

    pub fn callbacks(&self) -> &CallbackCodec {
        &self.callbacks
    }

    /// Retrieves an existing session as-is.
    pub async fn retrieve_session(
        &self,
        id: &str,
        expand: &[String],
    ) -> Result<Session, CheckoutError> {
        if !is_valid_id(id) {
            return Err(CheckoutError::InvalidField("checkout_session_id"));
        }
        debug!(session_id = %id, "Retrieving checkout session");
        Ok(self.provider.retrieve_session(id, expand).await?)
    }

    /// Creates a session with freshly computed callback URLs.
    pub async fn create_session(
        &self,
        attributes: CreateSessionParams,
    ) -> Result<Session, CheckoutError> {
        let params = self.append_callback_urls(attributes)?;
        let session = self.provider.create_session(&params).await?;
        info!(session_id = %session.id, mode = ?session.mode, "Checkout session created");
        Ok(session)
    }

    fn append_callback_urls(
        &self,
        mut attributes: CreateSessionParams,
    ) -> Result<CreateSessionParams, CheckoutError> {
        attributes.success_url = Some(self.callbacks.success_url()?);
        attributes.cancel_url = Some(self.callbacks.cancel_url()?);
        attributes.extra.remove("success_url");
        attributes.extra.remove("cancel_url");
        Ok(attributes)
    }

    /// `None` for a blank id, without calling the provider.
    pub async fn retrieve_customer(&self, id: &str) -> Result<Option<Customer>, CheckoutError> {
        if id.trim().is_empty() {
            return Ok(None);
        }
        if !is_valid_id(id) {
            return Err(CheckoutError::InvalidField("customer_id"));
        }
        Ok(self.provider.retrieve_customer(id).await?.into_option())
    }

    pub async fn create_customer(
        &self,
        profile: &CustomerProfile,
    ) -> Result<Customer, CheckoutError> {
        let params = CreateCustomerParams {
            id: Some(profile.id.clone()),
            name: profile.name.clone(),
            email: profile.email.clone(),
            ..Default::default()
        };
        let customer = self.provider.create_customer(&params).await?;
        info!(customer_id = %customer.id, "Customer created");
        Ok(customer)
    }

    /// Find-or-create. A blank profile id means no customer applies.
    pub async fn retrieve_or_create_customer(
        &self,
        profile: &CustomerProfile,
    ) -> Result<Option<Customer>, CheckoutError> {
        if profile.id.trim().is_empty() {
            return Ok(None);
        }
        if let Some(customer) = self.retrieve_customer(&profile.id).await? {
            return Ok(Some(customer));
        }
        debug!(customer_id = %profile.id, "Customer missing, creating");
        self.create_customer(profile).await.map(Some)
    }
}

impl std::fmt::Debug for SessionGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionGateway")
            .field("callbacks", &self.callbacks)
            .finish_non_exhaustive()
    }
}

/// Request-scoped view of the gateway. Dropped with the request.
pub struct CheckoutContext {
    gateway: Arc<SessionGateway>,
    request: SessionRequest,
    session: OnceCell<Arc<Session>>,
    customer: OnceCell<Option<Arc<Customer>>>,
}

impl CheckoutContext {
    pub fn new(gateway: Arc<SessionGateway>, request: SessionRequest) -> Self {
        Self {
            gateway,
            request,
            session: OnceCell::new(),
            customer: OnceCell::new(),
        }
    }

    /// The request's session: retrieved when an id was supplied, created
    /// otherwise. Resolved at most once.
    pub async fn session(&self) -> Result<Arc<Session>, CheckoutError> {
        self.session
            .get_or_try_init(|| async { self.resolve_session().await.map(Arc::new) })
            .await
            .cloned()
    }

    /// The request's customer, found or created at most once.
    pub async fn customer(&self) -> Result<Option<Arc<Customer>>, CheckoutError> {
        self.customer
            .get_or_try_init(|| self.resolve_customer())
            .await
            .cloned()
    }

    async fn resolve_customer(&self) -> Result<Option<Arc<Customer>>, CheckoutError> {
        let Some(profile) = &self.request.customer else {
            return Ok(None);
        };
        let customer = self.gateway.retrieve_or_create_customer(profile).await?;
        Ok(customer.map(Arc::new))
    }

    async fn resolve_session(&self) -> Result<Session, CheckoutError> {
        if let Some(id) = self.request.session_id() {
            return self.gateway.retrieve_session(id, &self.request.expand).await;
        }

        let mut attributes = self.request.attributes.clone();
        if attributes.customer.is_none() {
            if let Some(customer) = self.customer().await? {
                attributes.customer = Some(customer.id.clone());
            }
        }
        self.gateway.create_session(attributes).await
    }
}
