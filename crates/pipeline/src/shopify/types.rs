//! Response shapes of the backup's GraphQL operations.
//!
//! Everything the server might leave out is optional or defaulted, so a
//! sparse node decodes and the row builders apply the documented fallbacks.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use shopify_backup_core::ProductStatus;

/// A Relay-style connection.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection<N> {
    #[serde(default = "Vec::new")]
    pub edges: Vec<Edge<N>>,
    #[serde(default)]
    pub page_info: Option<PageInfo>,
}

impl<N> Connection<N> {
    /// Nodes in server order.
    pub fn into_nodes(self) -> impl Iterator<Item = N> {
        self.edges.into_iter().map(|edge| edge.node)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Edge<N> {
    pub node: N,
}

/// Pagination state of a connection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    #[serde(default)]
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

impl PageInfo {
    /// Cursor of the next page, if there is one to fetch.
    #[must_use]
    pub fn next_cursor(self) -> Option<String> {
        if self.has_next_page { self.end_cursor } else { None }
    }
}

/// Object carrying only a GID.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Node {
    pub id: Option<String>,
}

// =============================================================================
// Products
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct ProductsData {
    pub products: Option<Connection<ProductNode>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductNode {
    pub id: String,
    pub title: Option<String>,
    pub vendor: Option<String>,
    pub status: Option<ProductStatus>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub variants: Option<Connection<VariantNode>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantNode {
    pub id: Option<String>,
    pub title: Option<String>,
    pub sku: Option<String>,
    pub price: Option<Decimal>,
    pub inventory_item: Option<Node>,
}

// =============================================================================
// Locations
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct LocationsData {
    pub locations: Option<Connection<LocationNode>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationNode {
    pub id: String,
    pub name: Option<String>,
    pub is_active: Option<bool>,
}

// =============================================================================
// Inventory levels
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct InventoryLevelsData {
    pub location: Option<LocationLevels>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationLevels {
    pub inventory_levels: Option<Connection<InventoryLevelNode>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InventoryLevelNode {
    pub id: Option<String>,
    pub item: Option<LevelItem>,
    pub quantities: Option<Vec<QuantityNode>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LevelItem {
    pub id: Option<String>,
    pub sku: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuantityNode {
    pub name: String,
    pub quantity: Option<i64>,
}

impl InventoryLevelNode {
    /// Quantity reported under `name`, 0 when absent.
    #[must_use]
    pub fn quantity(&self, name: &str) -> i64 {
        self.quantities
            .iter()
            .flatten()
            .find(|q| q.name == name)
            .and_then(|q| q.quantity)
            .unwrap_or(0)
    }
}

// =============================================================================
// Orders
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct OrdersData {
    pub orders: Option<Connection<OrderNode>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderNode {
    pub id: String,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub test: Option<bool>,
    pub line_items: Option<Connection<LineItemNode>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LineItemNode {
    pub id: Option<String>,
    pub title: Option<String>,
    pub sku: Option<String>,
    pub quantity: Option<i64>,
    pub variant: Option<LineItemVariant>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LineItemVariant {
    pub id: Option<String>,
    pub product: Option<VendorNode>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VendorNode {
    pub vendor: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_page_info_next_cursor() {
        let more = PageInfo {
            has_next_page: true,
            end_cursor: Some("c1".to_string()),
        };
        assert_eq!(more.next_cursor(), Some("c1".to_string()));

        let last = PageInfo {
            has_next_page: false,
            end_cursor: Some("c2".to_string()),
        };
        assert_eq!(last.next_cursor(), None);

        let no_cursor = PageInfo {
            has_next_page: true,
            end_cursor: None,
        };
        assert_eq!(no_cursor.next_cursor(), None);
    }

    #[test]
    fn test_products_page_decodes() {
        let data: ProductsData = serde_json::from_value(serde_json::json!({
            "products": {
                "edges": [{"node": {
                    "id": "gid://shopify/Product/1",
                    "title": "Tee",
                    "vendor": null,
                    "status": "ACTIVE",
                    "createdAt": "2024-01-01T00:00:00Z",
                    "updatedAt": "2024-02-01T00:00:00Z",
                    "variants": {"edges": [{"node": {
                        "id": "gid://shopify/ProductVariant/10",
                        "title": "S",
                        "sku": null,
                        "price": "19.99",
                        "inventoryItem": {"id": "gid://shopify/InventoryItem/100"}
                    }}]}
                }}],
                "pageInfo": {"hasNextPage": false, "endCursor": "abc"}
            }
        }))
        .unwrap();

        let products = data.products.unwrap();
        assert_eq!(products.page_info.clone().unwrap().end_cursor.as_deref(), Some("abc"));
        let product = products.into_nodes().next().unwrap();
        let variant = product.variants.unwrap().into_nodes().next().unwrap();
        assert_eq!(variant.price, Some(Decimal::new(1999, 2)));
        assert!(variant.sku.is_none());
    }

    #[test]
    fn test_level_quantity_defaults_to_zero() {
        let level: InventoryLevelNode = serde_json::from_value(serde_json::json!({
            "id": "gid://shopify/InventoryLevel/1",
            "item": {"id": "gid://shopify/InventoryItem/100", "sku": "A"},
            "quantities": [
                {"name": "available", "quantity": 5},
                {"name": "committed", "quantity": 1}
            ]
        }))
        .unwrap();

        assert_eq!(level.quantity("available"), 5);
        assert_eq!(level.quantity("incoming"), 0);
        assert_eq!(level.quantity("committed"), 1);
    }

    #[test]
    fn test_null_location_decodes() {
        let data: InventoryLevelsData =
            serde_json::from_value(serde_json::json!({"location": null})).unwrap();
        assert!(data.location.is_none());
    }
}
