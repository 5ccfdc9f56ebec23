use std::time::Duration;

use posthog_rs::Event;
use tracing::warn;

const CAPTURE_TIMEOUT: Duration = Duration::from_secs(5);

fn capture_async(event: Event) {
    tokio::spawn(async move {
        match tokio::time::timeout(CAPTURE_TIMEOUT, posthog_rs::capture(event)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Failed to capture analytics event: {e}"),
            Err(_) => warn!("Analytics event capture timed out"),
        }
    });
}

pub fn track_checkout_session_resolved(reused: bool, has_customer: bool) {
    let mut event = Event::new_anon("checkout_session_resolved");
    event.insert_prop("reused", reused).ok();
    event.insert_prop("has_customer", has_customer).ok();
    capture_async(event);
}

pub fn track_checkout_session_failed(error_kind: &str) {
    let mut event = Event::new_anon("checkout_session_failed");
    event.insert_prop("error_kind", error_kind).ok();
    capture_async(event);
}

pub fn track_checkout_session_shown(status: Option<&str>, state: Option<&str>) {
    let mut event = Event::new_anon("checkout_session_shown");
    event.insert_prop("status", status.unwrap_or("unknown")).ok();
    if let Some(state) = state {
        event.insert_prop("state", state).ok();
    }
    capture_async(event);
}

pub fn track_webhook_handled(event_type: &str) {
    let mut event = Event::new_anon("webhook_handled");
    event.insert_prop("event_type", event_type).ok();
    capture_async(event);
}

pub fn track_webhook_rejected(reason: &str) {
    let mut event = Event::new_anon("webhook_rejected");
    event.insert_prop("reason", reason).ok();
    capture_async(event);
}
