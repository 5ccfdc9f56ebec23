use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::gateway::CustomerProfile;

/// The signed-in customer, if the host application identified one.
///
/// Host middleware inserts a [`CustomerProfile`] into the request extensions;
/// without one, checkout proceeds anonymously.
#[derive(Debug, Clone, Default)]
pub struct CheckoutCustomer(pub Option<CustomerProfile>);

impl<S> FromRequestParts<S> for CheckoutCustomer
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let profile = parts
            .extensions
            .get::<CustomerProfile>()
            .filter(|profile| !profile.id.trim().is_empty())
            .cloned();
        Ok(CheckoutCustomer(profile))
    }
}

#[cfg(test)]
mod tests {
    use axum::http::Request;

    use super::*;

    async fn extract(request: Request<()>) -> CheckoutCustomer {
        let (mut parts, _) = request.into_parts();
        CheckoutCustomer::from_request_parts(&mut parts, &())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn reads_the_profile_from_extensions() {
        let mut request = Request::new(());
        request
            .extensions_mut()
            .insert(CustomerProfile::new(42).email("ada@example.com"));

        let CheckoutCustomer(profile) = extract(request).await;
        let profile = profile.unwrap();
        assert_eq!(profile.id, "42");
        assert_eq!(profile.email.as_deref(), Some("ada@example.com"));
    }

    #[tokio::test]
    async fn anonymous_without_a_profile() {
        let CheckoutCustomer(profile) = extract(Request::new(())).await;
        assert!(profile.is_none());
    }

    #[tokio::test]
    async fn blank_ids_count_as_anonymous() {
        let mut request = Request::new(());
        request.extensions_mut().insert(CustomerProfile::new("  "));

        let CheckoutCustomer(profile) = extract(request).await;
        assert!(profile.is_none());
    }
}
