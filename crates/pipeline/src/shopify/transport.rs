//! HTTP transport for Admin API GraphQL requests.

use std::time::Duration;

use async_trait::async_trait;
use graphql_client::QueryBody;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use tracing::warn;
use url::Url;

use super::ShopifyError;
use crate::config::ShopifyConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const DEFAULT_RETRY_AFTER_SECS: u64 = 2;
const ERROR_BODY_PREVIEW: usize = 300;

/// Sends one GraphQL request and returns the raw response body.
///
/// Implementations report transport failures (connection, timeout, non-2xx,
/// 429) as errors and hand every 2xx body back untouched; classifying the
/// body is the fetcher's job.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, body: &QueryBody<serde_json::Value>) -> Result<String, ShopifyError>;
}

/// `reqwest`-backed transport for the Admin API GraphQL endpoint.
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpTransport {
    /// Create a transport for the configured shop.
    ///
    /// # Errors
    ///
    /// Returns `ShopifyError::Setup` if the access token is not a valid header
    /// value, or `ShopifyError::Http` if the client fails to build.
    pub fn new(config: &ShopifyConfig) -> Result<Self, ShopifyError> {
        let mut headers = HeaderMap::new();

        let mut token = HeaderValue::from_str(config.access_token.expose_secret())
            .map_err(|e| ShopifyError::Setup(format!("Invalid access token format: {e}")))?;
        token.set_sensitive(true);
        headers.insert("X-Shopify-Access-Token", token);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, body: &QueryBody<serde_json::Value>) -> Result<String, ShopifyError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<f64>().ok())
                .map_or(DEFAULT_RETRY_AFTER_SECS, retry_after_secs);
            return Err(ShopifyError::RateLimited(retry_after));
        }

        let text = response.text().await?;
        if !status.is_success() {
            let preview = truncate(&text, ERROR_BODY_PREVIEW);
            warn!(
                status = status.as_u16(),
                operation = body.operation_name,
                body = %preview,
                "Shopify returned an error status"
            );
            return Err(ShopifyError::Status {
                status: status.as_u16(),
                body: preview.to_string(),
            });
        }

        Ok(text)
    }
}

/// Shopify sends fractional `Retry-After` values such as `2.0`.
fn retry_after_secs(value: f64) -> u64 {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // clamped to a small positive range
    let secs = value.clamp(1.0, 3600.0).ceil() as u64;
    secs
}

/// First `max_chars` characters of `text`, cut on a char boundary.
fn truncate(text: &str, max_chars: usize) -> &str {
    text.char_indices()
        .nth(max_chars)
        .and_then(|(idx, _)| text.get(..idx))
        .unwrap_or(text)
}
