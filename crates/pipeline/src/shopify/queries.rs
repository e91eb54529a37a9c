//! GraphQL operations issued by the backup.
//!
//! Each document is a named operation so the request body can carry an
//! `operationName` and log lines can say which resource was being read.

use chrono::{DateTime, SecondsFormat, Utc};
use graphql_client::QueryBody;
use serde::Serialize;

/// A static GraphQL document plus its operation name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operation {
    pub name: &'static str,
    pub query: &'static str,
}

impl Operation {
    /// Build the request body for this operation.
    #[must_use]
    pub fn body(&self, variables: serde_json::Value) -> QueryBody<serde_json::Value> {
        QueryBody {
            variables,
            query: self.query,
            operation_name: self.name,
        }
    }
}

/// Products with their first 100 variants, 50 per page.
pub const SYNC_PRODUCTS: Operation = Operation {
    name: "SyncProducts",
    query: r"
query SyncProducts($cursor: String) {
  products(first: 50, after: $cursor) {
    edges {
      node {
        id
        title
        vendor
        status
        createdAt
        updatedAt
        variants(first: 100) {
          edges {
            node {
              id
              title
              sku
              price
              inventoryItem { id }
            }
          }
        }
      }
    }
    pageInfo { hasNextPage endCursor }
  }
}
",
};

/// All locations in one request.
pub const SYNC_LOCATIONS: Operation = Operation {
    name: "SyncLocations",
    query: r"
query SyncLocations {
  locations(first: 50) {
    edges {
      node {
        id
        name
        isActive
      }
    }
  }
}
",
};

/// Inventory levels of one location, 250 per page.
///
/// `InventoryLevel` exposes its inventory item as `item`, not
/// `inventoryItem`.
pub const SYNC_INVENTORY_LEVELS: Operation = Operation {
    name: "SyncInventoryLevels",
    query: r#"
query SyncInventoryLevels($locationId: ID!, $cursor: String) {
  location(id: $locationId) {
    inventoryLevels(first: 250, after: $cursor) {
      edges {
        node {
          id
          item {
            id
            sku
          }
          quantities(names: ["available", "incoming", "committed"]) {
            name
            quantity
          }
        }
      }
      pageInfo { hasNextPage endCursor }
    }
  }
}
"#,
};

/// Orders matching a search filter, 250 per page, with their line items.
pub const SYNC_ORDERS: Operation = Operation {
    name: "SyncOrders",
    query: r"
query SyncOrders($query: String!, $cursor: String) {
  orders(first: 250, query: $query, after: $cursor) {
    edges {
      node {
        id
        name
        createdAt
        cancelledAt
        test
        lineItems(first: 250) {
          edges {
            node {
              id
              title
              sku
              quantity
              variant {
                id
                product { vendor }
              }
            }
          }
        }
      }
    }
    pageInfo { hasNextPage endCursor }
  }
}
",
};

/// Variables of an operation that only pages.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PageVariables {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

/// Variables of [`SYNC_INVENTORY_LEVELS`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryLevelsVariables {
    pub location_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

/// Variables of [`SYNC_ORDERS`].
#[derive(Debug, Clone, Serialize)]
pub struct OrdersVariables {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

/// Order search filter: `created_at:>=YYYY-MM-DDTHH:MM:SSZ`.
#[must_use]
pub fn orders_filter(since: DateTime<Utc>) -> String {
    format!(
        "created_at:>={}",
        since.to_rfc3339_opts(SecondsFormat::Secs, true)
    )
}
