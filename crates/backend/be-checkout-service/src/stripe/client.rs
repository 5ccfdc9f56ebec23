use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use super::form::FormParams;
use super::types::{CreateCustomerParams, CreateSessionParams, Customer, Lookup, Session};
use super::{ApiError, CheckoutProvider, StripeError, is_valid_id};

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

/// REST client for the provider's checkout and customer endpoints.
pub struct StripeClient {
    http: reqwest::Client,
    api_base: Url,
    secret_key: SecretString,
}

impl StripeClient {
    pub fn new(api_base: Url, secret_key: SecretString) -> Self {
        Self::with_http_client(reqwest::Client::new(), api_base, secret_key)
    }

    pub fn with_http_client(http: reqwest::Client, api_base: Url, secret_key: SecretString) -> Self {
        Self {
            http,
            api_base,
            secret_key,
        }
    }

    fn object_endpoint(&self, collection: &[&str], id: &str) -> Result<Url, StripeError> {
        if !is_valid_id(id) {
            return Err(StripeError::InvalidId(id.to_string()));
        }
        let mut url = self.endpoint(collection);
        if let Ok(mut path) = url.path_segments_mut() {
            path.push(id);
        }
        Ok(url)
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.api_base.clone();
        // api_base is validated as a base URL at config time.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().push("v1").extend(segments);
        }
        url
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.http
            .request(method, url)
            .bearer_auth(self.secret_key.expose_secret())
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, StripeError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            return Ok(serde_json::from_str(&body)?);
        }

        let mut error = match serde_json::from_str::<ErrorEnvelope>(&body) {
            Ok(envelope) => envelope.error,
            Err(_) => ApiError {
                status: 0,
                kind: None,
                code: None,
                message: Some(body),
                param: None,
            },
        };
        error.status = status.as_u16();
        debug!(status = error.status, code = ?error.code, "Stripe request failed");
        Err(StripeError::Api(error))
    }
}

impl std::fmt::Debug for StripeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeClient")
            .field("api_base", &self.api_base.as_str())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl CheckoutProvider for StripeClient {
    async fn create_session(&self, params: &CreateSessionParams) -> Result<Session, StripeError> {
        let url = self.endpoint(&["checkout", "sessions"]);
        self.send(self.request(Method::POST, url).form(&params.to_form()))
            .await
    }

    async fn retrieve_session(&self, id: &str, expand: &[String]) -> Result<Session, StripeError> {
        let url = self.object_endpoint(&["checkout", "sessions"], id)?;
        let mut query = FormParams::new();
        query.push_list("expand", expand);
        self.send(self.request(Method::GET, url).query(&query)).await
    }

    async fn retrieve_customer(&self, id: &str) -> Result<Lookup<Customer>, StripeError> {
        let url = self.object_endpoint(&["customers"], id)?;
        match self.send(self.request(Method::GET, url)).await {
            Ok(customer) => Ok(Lookup::Found(customer)),
            Err(err) if err.is_resource_missing() => Ok(Lookup::Missing),
            Err(err) => Err(err),
        }
    }

    async fn create_customer(
        &self,
        params: &CreateCustomerParams,
    ) -> Result<Customer, StripeError> {
        let url = self.endpoint(&["customers"]);
        self.send(self.request(Method::POST, url).form(&params.to_form()))
            .await
    }
}
