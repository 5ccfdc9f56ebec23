use axum::response::{IntoResponse, Redirect, Response};
use tracing::debug;
use url::Url;

use crate::callback::CallbackCodec;
use crate::error::CheckoutError;
use crate::stripe::Session;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RedirectOptions {
    /// Permit a target whose host differs from the serving host.
    pub allow_other_host: bool,
}

impl RedirectOptions {
    pub fn allow_other_host() -> Self {
        Self {
            allow_other_host: true,
        }
    }
}

/// Redirects to `target`. Relative targets are always allowed; absolute ones
/// must match `own_host` unless the options say otherwise.
pub fn redirect_to(
    target: &str,
    own_host: Option<&str>,
    options: RedirectOptions,
) -> Result<Response, CheckoutError> {
    if !options.allow_other_host {
        match Url::parse(target) {
            Ok(url) => {
                let target_host = url.host_str();
                if target_host.is_none() || !same_host(target_host, own_host) {
                    return Err(CheckoutError::UnsafeRedirect(target.to_string()));
                }
            }
            Err(url::ParseError::RelativeUrlWithoutBase) => {}
            Err(err) => return Err(err.into()),
        }
    }
    Ok(Redirect::to(target).into_response())
}

fn same_host(target: Option<&str>, own: Option<&str>) -> bool {
    let own = own.map(|h| h.split(':').next().unwrap_or(h));
    matches!((target, own), (Some(t), Some(o)) if t.eq_ignore_ascii_case(o))
}

/// Sends the browser to the session's hosted page on the provider's domain.
pub fn respond_with_redirect(session: &Session) -> Result<Response, CheckoutError> {
    let url = session
        .url
        .as_deref()
        .filter(|url| !url.is_empty())
        .ok_or(CheckoutError::MissingField("checkout session URL"))?;
    debug!(session_id = %session.id, "Redirecting to hosted checkout");
    redirect_to(url, None, RedirectOptions::allow_other_host())
}

/// Sends the browser to the local show page of a session whose hosted page
/// is gone. The target must stay on `own_host`.
pub fn respond_with_show_redirect(
    callbacks: &CallbackCodec,
    session: &Session,
    own_host: Option<&str>,
) -> Result<Response, CheckoutError> {
    let target = callbacks.show_url(&session.id)?;
    debug!(session_id = %session.id, "Hosted page closed, redirecting to show");
    redirect_to(&target, own_host, RedirectOptions::default())
}
