//! JSON-over-HTTP plumbing shared by the REST adapters.

use crate::config::ProviderConfig;
use crate::errors::{ProviderError, ProviderResult, SuggestedAction};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

const BODY_EXCERPT: usize = 256;

/// Build the shared `reqwest::Client` for a config.
///
/// Only sets a timeout if the config names one.
pub fn build_client(config: &ProviderConfig) -> ProviderResult<Client> {
    let mut builder = Client::builder();
    if let Some(timeout) = config.timeout {
        builder = builder.timeout(timeout);
    }
    builder
        .build()
        .map_err(|e| ProviderError::activation(format!("Failed to build HTTP client: {}", e)))
}

/// A base URL plus a client handle. Cheap to clone.
#[derive(Debug, Clone)]
pub struct HttpJson {
    client: Client,
    base: String,
    api_key: Option<String>,
}

impl HttpJson {
    pub fn new(client: Client, base: impl Into<String>) -> Self {
        Self {
            client,
            base: base.into().trim_end_matches('/').to_string(),
            api_key: None,
        }
    }

    /// Send `x-api-key` on every request.
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn url(&self, path: &str) -> String {
        if path.is_empty() || path == "/" {
            return format!("{}/", self.base);
        }
        if path.starts_with('/') {
            format!("{}{}", self.base, path)
        } else {
            format!("{}/{}", self.base, path)
        }
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => req.header("x-api-key", key),
            None => req,
        }
    }

    /// GET without status checks. Transport failures still map to errors.
    pub async fn get_raw(&self, path: &str) -> ProviderResult<Response> {
        let url = self.url(path);
        tracing::debug!(target: "chain_providers::http", %url, "GET");
        self.authorize(self.client.get(&url))
            .send()
            .await
            .map_err(ProviderError::from)
    }

    /// POST a JSON body without status checks.
    pub async fn post_raw<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> ProviderResult<Response> {
        let url = self.url(path);
        tracing::debug!(target: "chain_providers::http", %url, "POST");
        self.authorize(self.client.post(&url).json(body))
            .send()
            .await
            .map_err(ProviderError::from)
    }

    /// GET and return the body bytes of a 2xx response.
    pub async fn get_bytes(&self, path: &str, what: &str) -> ProviderResult<Vec<u8>> {
        let resp = self.get_raw(path).await?;
        read_success(resp, what).await
    }

    /// POST and return the body bytes of a 2xx response.
    pub async fn post_bytes<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        what: &str,
    ) -> ProviderResult<Vec<u8>> {
        let resp = self.post_raw(path, body).await?;
        read_success(resp, what).await
    }

    /// GET and decode a typed JSON response.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str, what: &str) -> ProviderResult<T> {
        let bytes = self.get_bytes(path, what).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// POST and decode a typed JSON response.
    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        what: &str,
    ) -> ProviderResult<T> {
        let bytes = self.post_bytes(path, body, what).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Check the status and read the body.
///
/// 404 is a `NotFound` for `what`; any other non-2xx is a transport
/// failure carrying the status and a body excerpt.
pub async fn read_success(resp: Response, what: &str) -> ProviderResult<Vec<u8>> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp.bytes().await?.to_vec());
    }

    let body = resp.text().await.unwrap_or_default();
    Err(status_error(status, what, &body))
}

/// Map a non-2xx status to a provider error.
pub fn status_error(status: StatusCode, what: &str, body: &str) -> ProviderError {
    let excerpt: String = body.chars().take(BODY_EXCERPT).collect();
    if status == StatusCode::NOT_FOUND {
        return ProviderError::not_found(what).with_context("http_status", status.as_u16());
    }

    let mut err = ProviderError::transport(format!("{} request failed: {}", what, status))
        .with_context("http_status", status.as_u16());
    if !excerpt.is_empty() {
        err = err.with_context("body", excerpt);
    }
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        err = err.with_suggestion(SuggestedAction::Retry { after_ms: 1000 });
    }
    err
}
