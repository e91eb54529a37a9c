//! Query-cost telemetry and the throttle delay derived from it.
//!
//! Shopify meters the Admin API with a leaky bucket of cost points. Every
//! response reports what the query cost and how much capacity is left in
//! `extensions.cost`.

use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;

/// Minimum capacity to keep in the bucket before issuing the next query.
const MIN_AVAILABLE: f64 = 50.0;

/// `extensions.cost` of a response.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryCost {
    pub requested_query_cost: Option<f64>,
    pub actual_query_cost: Option<f64>,
    pub throttle_status: Option<ThrottleStatus>,
}

/// `extensions.cost.throttleStatus` of a response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThrottleStatus {
    pub maximum_available: Option<f64>,
    pub currently_available: Option<f64>,
    pub restore_rate: Option<f64>,
}

impl QueryCost {
    /// Read the cost block out of a response's `extensions` map.
    ///
    /// Returns `None` when the block is absent or malformed; throttling is
    /// then skipped for that response.
    pub(crate) fn from_extensions(
        extensions: Option<&HashMap<String, serde_json::Value>>,
    ) -> Option<Self> {
        let cost = extensions?.get("cost")?;
        serde_json::from_value(cost.clone()).ok()
    }

    /// How long to pause before the next request.
    ///
    /// When fewer than `max(50, actualQueryCost)` points are available and
    /// the bucket refills at a positive rate, waits long enough for the
    /// shortfall to be restored (whole seconds, at least one).
    #[must_use]
    pub fn throttle_delay(&self) -> Option<Duration> {
        let actual = self.actual_query_cost?;
        let status = self.throttle_status?;
        let available = status.currently_available?;
        let restore_rate = status.restore_rate?;

        let margin = MIN_AVAILABLE.max(actual);
        if restore_rate <= 0.0 || available >= margin {
            return None;
        }

        let shortfall = margin - available;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // floor of a positive ratio
        let seconds = (shortfall / restore_rate).floor() as u64 + 1;
        Some(Duration::from_secs(seconds.max(1)))
    }
}
