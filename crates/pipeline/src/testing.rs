//! Test doubles for the sync and load stages.
//!
//! [`ScriptedTransport`] replays canned Admin API responses in order and
//! records every request body it receives. Together with
//! [`MemoryWarehouse`] it lets a whole run execute without a network or a
//! database.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use graphql_client::QueryBody;
use serde_json::{Value, json};

use crate::shopify::{ShopifyError, Transport};

pub use crate::warehouse::MemoryWarehouse;

/// A request the scripted transport received.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub operation_name: String,
    pub variables: Value,
}

/// Transport that answers from a queue of scripted responses.
///
/// Once the script runs out every request fails with a non-transient
/// error, so a collector that asks for more pages than scripted stops
/// instead of retrying.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<String, ShopifyError>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a JSON response body.
    pub fn push_json(&self, body: Value) {
        self.push_raw(body.to_string());
    }

    /// Queue a response body verbatim.
    pub fn push_raw(&self, body: impl Into<String>) {
        self.lock_responses().push_back(Ok(body.into()));
    }

    /// Queue a transport failure.
    pub fn push_error(&self, error: ShopifyError) {
        self.lock_responses().push_back(Err(error));
    }

    /// Requests received so far, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of scripted responses not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.lock_responses().len()
    }

    fn lock_responses(&self) -> std::sync::MutexGuard<'_, VecDeque<Result<String, ShopifyError>>> {
        self.responses.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, body: &QueryBody<Value>) -> Result<String, ShopifyError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedRequest {
                operation_name: body.operation_name.to_string(),
                variables: body.variables.clone(),
            });

        self.lock_responses().pop_front().unwrap_or_else(|| {
            Err(ShopifyError::Setup(format!(
                "no scripted response left for {}",
                body.operation_name
            )))
        })
    }
}

/// A successful response envelope with plenty of throttle capacity.
#[must_use]
pub fn data_response(data: Value) -> Value {
    with_cost(json!({ "data": data }), 10.0, 1990.0, 100.0)
}

/// A response envelope carrying GraphQL errors and no data.
#[must_use]
pub fn error_response(messages: &[&str]) -> Value {
    let errors: Vec<Value> = messages
        .iter()
        .map(|message| json!({ "message": message, "locations": [{"line": 1, "column": 1}] }))
        .collect();
    json!({ "data": null, "errors": errors })
}

/// Attach `extensions.cost` telemetry to a response envelope.
#[must_use]
pub fn with_cost(mut response: Value, actual: f64, available: f64, restore_rate: f64) -> Value {
    response["extensions"] = json!({
        "cost": {
            "requestedQueryCost": actual,
            "actualQueryCost": actual,
            "throttleStatus": {
                "maximumAvailable": 2000.0,
                "currentlyAvailable": available,
                "restoreRate": restore_rate
            }
        }
    });
    response
}

/// A connection of `nodes` with the given pagination state.
#[must_use]
pub fn connection(nodes: Vec<Value>, has_next_page: bool, end_cursor: Option<&str>) -> Value {
    let edges: Vec<Value> = nodes.into_iter().map(|node| json!({ "node": node })).collect();
    json!({
        "edges": edges,
        "pageInfo": { "hasNextPage": has_next_page, "endCursor": end_cursor }
    })
}

/// A product node with variants given as `(variant_id, sku, inventory_item_id)`.
#[must_use]
pub fn product_node(id: u64, title: &str, variants: &[(u64, &str, u64)]) -> Value {
    let variant_nodes: Vec<Value> = variants
        .iter()
        .map(|(variant_id, sku, item_id)| {
            json!({
                "id": format!("gid://shopify/ProductVariant/{variant_id}"),
                "title": sku,
                "sku": sku,
                "price": "10.00",
                "inventoryItem": { "id": format!("gid://shopify/InventoryItem/{item_id}") }
            })
        })
        .collect();

    json!({
        "id": format!("gid://shopify/Product/{id}"),
        "title": title,
        "vendor": "Acme",
        "status": "ACTIVE",
        "createdAt": "2024-01-01T00:00:00Z",
        "updatedAt": "2024-06-01T00:00:00Z",
        "variants": connection(variant_nodes, false, None)
    })
}

/// A location node.
#[must_use]
pub fn location_node(id: u64, name: &str, active: bool) -> Value {
    json!({
        "id": format!("gid://shopify/Location/{id}"),
        "name": name,
        "isActive": active
    })
}

/// An inventory level node with `(available, incoming, committed)`.
#[must_use]
pub fn level_node(item_id: u64, sku: &str, quantities: (i64, i64, i64)) -> Value {
    let (available, incoming, committed) = quantities;
    json!({
        "id": format!("gid://shopify/InventoryLevel/{item_id}"),
        "item": { "id": format!("gid://shopify/InventoryItem/{item_id}"), "sku": sku },
        "quantities": [
            { "name": "available", "quantity": available },
            { "name": "incoming", "quantity": incoming },
            { "name": "committed", "quantity": committed }
        ]
    })
}

/// `data` of an inventory levels page.
#[must_use]
pub fn levels_page(levels: Vec<Value>, has_next_page: bool, end_cursor: Option<&str>) -> Value {
    json!({
        "location": {
            "inventoryLevels": connection(levels, has_next_page, end_cursor)
        }
    })
}

/// An order node with line items given as `(line_item_id, variant_id, sku, quantity)`.
#[must_use]
pub fn order_node(id: u64, created_at: &str, line_items: &[(u64, Option<u64>, &str, i64)]) -> Value {
    let items: Vec<Value> = line_items
        .iter()
        .map(|(line_id, variant_id, sku, quantity)| {
            let variant = variant_id.map(|v| {
                json!({
                    "id": format!("gid://shopify/ProductVariant/{v}"),
                    "product": { "vendor": "Acme" }
                })
            });
            json!({
                "id": format!("gid://shopify/LineItem/{line_id}"),
                "title": format!("Item {sku}"),
                "sku": sku,
                "quantity": quantity,
                "variant": variant
            })
        })
        .collect();

    json!({
        "id": format!("gid://shopify/Order/{id}"),
        "name": format!("#{id}"),
        "createdAt": created_at,
        "cancelledAt": null,
        "test": false,
        "lineItems": connection(items, false, None)
    })
}
