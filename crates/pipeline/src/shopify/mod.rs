//! Shopify Admin API access for the sync stage.
//!
//! # Architecture
//!
//! - [`Transport`] sends one GraphQL request body and returns the raw
//!   response text. [`HttpTransport`] is the `reqwest` implementation.
//! - [`ShopifyFetcher`] wraps a transport with retry/backoff and cost-based
//!   throttling, and classifies each response as a [`FetchOutcome`].
//! - [`queries`] holds the four named operations the backup issues, and
//!   [`types`] the response shapes they decode into.
//!
//! Queries are sent as `graphql_client::QueryBody` values built from static
//! documents, so no schema file is needed at build time.

mod client;
pub mod queries;
mod throttle;
mod transport;
pub mod types;

pub use client::{FetchOutcome, ShopifyFetcher};
pub use throttle::{QueryCost, ThrottleStatus};
pub use transport::{HttpTransport, Transport};

use thiserror::Error;

/// Errors that can occur when talking to the Shopify Admin API.
#[derive(Debug, Error)]
pub enum ShopifyError {
    /// HTTP request failed (connection, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status other than 429.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Rate limited by Shopify.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The HTTP client could not be built from the configuration.
    #[error("Client setup failed: {0}")]
    Setup(String),

    /// GraphQL query returned errors.
    #[error("GraphQL errors: {}", format_graphql_errors(.0))]
    GraphQL(Vec<GraphQLError>),
}

impl ShopifyError {
    /// Whether the request may succeed if sent again.
    ///
    /// Transport failures, non-2xx statuses and rate limiting are transient.
    /// Parse and GraphQL errors are not; the fetcher separately retries a
    /// 2xx body that is not a response envelope.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Http(_) | Self::Status { .. } | Self::RateLimited(_)
        )
    }
}

/// A GraphQL error returned by the Shopify Admin API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphQLError {
    /// Error message.
    pub message: String,
    /// Source locations in the query.
    pub locations: Vec<GraphQLErrorLocation>,
    /// Path to the error in the response.
    pub path: Vec<serde_json::Value>,
}

/// Location in a GraphQL query where an error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphQLErrorLocation {
    /// Line number (1-indexed).
    pub line: i64,
    /// Column number (1-indexed).
    pub column: i64,
}

impl From<graphql_client::Error> for GraphQLError {
    fn from(error: graphql_client::Error) -> Self {
        Self {
            message: error.message,
            locations: error
                .locations
                .unwrap_or_default()
                .into_iter()
                .map(|l| GraphQLErrorLocation {
                    line: i64::from(l.line),
                    column: i64::from(l.column),
                })
                .collect(),
            path: error
                .path
                .unwrap_or_default()
                .into_iter()
                .map(|fragment| match fragment {
                    graphql_client::PathFragment::Key(key) => serde_json::Value::from(key),
                    graphql_client::PathFragment::Index(index) => serde_json::Value::from(index),
                })
                .collect(),
        }
    }
}

pub(crate) fn format_graphql_errors(errors: &[GraphQLError]) -> String {
    errors
        .iter()
        .map(|e| e.message.clone())
        .collect::<Vec<_>>()
        .join("; ")
}
