use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Verified webhook envelope. Only `type` and `data.object` are required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookEvent {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
    #[serde(default)]
    pub created: Option<i64>,
    #[serde(default)]
    pub livemode: Option<bool>,
    #[serde(default)]
    pub api_version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventData {
    /// The resource the event is about.
    pub object: Value,
    #[serde(default)]
    pub previous_attributes: Option<Value>,
}

impl WebhookEvent {
    pub fn from_slice(payload: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(payload)
    }

    /// `customer.subscription.created` → `customer_subscription_created`.
    pub fn handler_name(&self) -> String {
        handler_name(&self.event_type)
    }

    /// `data.object.id`, when the resource has one.
    pub fn object_id(&self) -> Option<&str> {
        self.data.object.get("id").and_then(Value::as_str)
    }
}

pub fn handler_name(event_type: &str) -> String {
    event_type.replace('.', "_")
}
