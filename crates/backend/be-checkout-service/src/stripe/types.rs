use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::form::FormParams;

/// Hosted checkout session as returned by the provider. Owned by the
/// provider; never mutated locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    /// Hosted page. `None` once the session is complete or expired.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub payment_status: Option<String>,
    #[serde(default)]
    pub mode: Option<String>,
    /// Either an id or, when expanded, the customer object.
    #[serde(default)]
    pub customer: Option<Value>,
    #[serde(default)]
    pub subscription: Option<Value>,
    #[serde(default)]
    pub success_url: Option<String>,
    #[serde(default)]
    pub cancel_url: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Session {
    /// Customer id whether or not the field was expanded.
    pub fn customer_id(&self) -> Option<&str> {
        expandable_id(self.customer.as_ref())
    }

    pub fn subscription_id(&self) -> Option<&str> {
        expandable_id(self.subscription.as_ref())
    }
}

fn expandable_id(value: Option<&Value>) -> Option<&str> {
    match value? {
        Value::String(id) => Some(id),
        Value::Object(object) => object.get("id").and_then(Value::as_str),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub deleted: bool,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Outcome of an id lookup that may legitimately find nothing.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    Found(T),
    Missing,
}

impl<T> Lookup<T> {
    pub fn into_option(self) -> Option<T> {
        match self {
            Lookup::Found(value) => Some(value),
            Lookup::Missing => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub price: String,
    pub quantity: u64,
}

/// Attributes for a new checkout session.
///
/// `success_url`/`cancel_url` are filled in by the gateway; anything the
/// caller puts in `extra` under those keys is dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreateSessionParams {
    pub success_url: Option<String>,
    pub cancel_url: Option<String>,
    pub mode: Option<String>,
    pub line_items: Vec<LineItem>,
    pub customer: Option<String>,
    pub customer_email: Option<String>,
    pub client_reference_id: Option<String>,
    pub metadata: BTreeMap<String, String>,
    /// Raw form fields passed through as-is.
    pub extra: BTreeMap<String, String>,
}

impl CreateSessionParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = Some(mode.into());
        self
    }

    pub fn line_item(mut self, price: impl Into<String>, quantity: u64) -> Self {
        self.line_items.push(LineItem {
            price: price.into(),
            quantity,
        });
        self
    }

    pub fn customer(mut self, customer: impl Into<String>) -> Self {
        self.customer = Some(customer.into());
        self
    }

    pub fn customer_email(mut self, email: impl Into<String>) -> Self {
        self.customer_email = Some(email.into());
        self
    }

    pub fn client_reference_id(mut self, id: impl Into<String>) -> Self {
        self.client_reference_id = Some(id.into());
        self
    }

    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    pub fn to_form(&self) -> FormParams {
        let mut form = FormParams::new();
        form.push_opt("success_url", self.success_url.as_deref());
        form.push_opt("cancel_url", self.cancel_url.as_deref());
        form.push_opt("mode", self.mode.as_deref());
        for (index, item) in self.line_items.iter().enumerate() {
            form.push(format!("line_items[{index}][price]"), &item.price);
            form.push(
                format!("line_items[{index}][quantity]"),
                item.quantity.to_string(),
            );
        }
        form.push_opt("customer", self.customer.as_deref());
        form.push_opt("customer_email", self.customer_email.as_deref());
        form.push_opt("client_reference_id", self.client_reference_id.as_deref());
        form.push_map("metadata", &self.metadata);
        for (key, value) in &self.extra {
            if key == "success_url" || key == "cancel_url" || form.contains(key) {
                continue;
            }
            form.push(key.clone(), value);
        }
        form
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreateCustomerParams {
    /// Always sent as a string; the provider rejects numeric ids.
    pub id: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub metadata: BTreeMap<String, String>,
}

impl CreateCustomerParams {
    pub fn to_form(&self) -> FormParams {
        let mut form = FormParams::new();
        form.push_opt("id", self.id.as_deref());
        form.push_opt("name", self.name.as_deref());
        form.push_opt("email", self.email.as_deref());
        form.push_map("metadata", &self.metadata);
        form
    }
}
