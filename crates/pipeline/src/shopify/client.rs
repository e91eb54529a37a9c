//! Rate-limited, retrying GraphQL fetcher.

use std::time::Duration;

use graphql_client::Response;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use super::queries::Operation;
use super::throttle::QueryCost;
use super::transport::Transport;
use super::{GraphQLError, ShopifyError};

const MAX_ATTEMPTS: u32 = 3;

/// Classified result of one successful exchange with the API.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome<D> {
    /// `data` decoded into the operation's response type.
    Data(D),
    /// No errors, but `data` was null or absent.
    NoData,
    /// The server answered with GraphQL-level errors.
    QueryError(Vec<GraphQLError>),
}

/// Executes GraphQL operations over a [`Transport`].
///
/// Transient transport failures and 2xx bodies that are not a GraphQL
/// response envelope are retried up to three attempts with exponential
/// backoff (1s, then 2s). After every response that carries
/// cost telemetry the fetcher pauses if the throttle bucket is running low,
/// before handing the outcome back.
pub struct ShopifyFetcher<T> {
    transport: T,
}

impl<T: Transport> ShopifyFetcher<T> {
    /// Create a fetcher over the given transport.
    pub const fn new(transport: T) -> Self {
        Self { transport }
    }

    /// The underlying transport.
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Run `operation` with `variables` and classify the response.
    ///
    /// # Errors
    ///
    /// Returns the last transport or envelope error once retries are
    /// exhausted, `ShopifyError::Parse` without retry if `data` does not
    /// decode into `D`.
    #[instrument(skip_all, fields(operation = operation.name))]
    pub async fn fetch<V, D>(
        &self,
        operation: &Operation,
        variables: &V,
    ) -> Result<FetchOutcome<D>, ShopifyError>
    where
        V: Serialize + Sync,
        D: DeserializeOwned,
    {
        let body = operation.body(serde_json::to_value(variables)?);
        let response = self.send_with_retry(&body).await?;

        if let Some(cost) = QueryCost::from_extensions(response.extensions.as_ref()) {
            throttle(&cost).await;
        }

        if let Some(errors) = response.errors.filter(|errors| !errors.is_empty()) {
            return Ok(FetchOutcome::QueryError(
                errors.into_iter().map(GraphQLError::from).collect(),
            ));
        }

        match response.data {
            None | Some(serde_json::Value::Null) => Ok(FetchOutcome::NoData),
            Some(data) => Ok(FetchOutcome::Data(serde_json::from_value(data)?)),
        }
    }

    async fn send_with_retry(
        &self,
        body: &graphql_client::QueryBody<serde_json::Value>,
    ) -> Result<Response<serde_json::Value>, ShopifyError> {
        let mut attempt = 0;
        loop {
            let result = match self.transport.send(body).await {
                Ok(text) => serde_json::from_str(&text).map_err(ShopifyError::from),
                Err(e) => Err(e),
            };
            match result {
                Ok(response) => return Ok(response),
                Err(e) if is_retryable(&e) && attempt + 1 < MAX_ATTEMPTS => {
                    let delay = backoff(attempt, &e);
                    warn!(
                        attempt = attempt + 1,
                        max_attempts = MAX_ATTEMPTS,
                        delay_secs = delay.as_secs(),
                        error = %e,
                        "Shopify request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// A truncated or non-JSON envelope is retried like a transport failure.
const fn is_retryable(error: &ShopifyError) -> bool {
    error.is_transient() || matches!(error, ShopifyError::Parse(_))
}

/// `2^attempt` seconds, stretched to the server's `Retry-After` on 429.
fn backoff(attempt: u32, error: &ShopifyError) -> Duration {
    let exponential = Duration::from_secs(2_u64.pow(attempt));
    match error {
        ShopifyError::RateLimited(retry_after) => exponential.max(Duration::from_secs(*retry_after)),
        _ => exponential,
    }
}

async fn throttle(cost: &QueryCost) {
    let status = cost.throttle_status.unwrap_or_default();
    debug!(
        actual_cost = cost.actual_query_cost,
        available = status.currently_available,
        restore_rate = status.restore_rate,
        "Query cost"
    );

    if let Some(delay) = cost.throttle_delay() {
        debug!(delay_secs = delay.as_secs(), "Throttle capacity low, pausing");
        tokio::time::sleep(delay).await;
    }
}
