//! The intermediate document handed from `sync` to `load`.

use serde::{Deserialize, Serialize};

use super::{InventorySnapshot, LocationRow, ProductRow, SaleLineItem, VariantRow};

/// Everything one sync run produced, in server order.
///
/// Serialized as a single JSON object with five arrays. Arrays missing from
/// the document read back as empty, so a partially written upstream file
/// never fails the loader on shape alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncDocument {
    /// Products (full refresh).
    #[serde(default)]
    pub products: Vec<ProductRow>,
    /// Variants (full refresh).
    #[serde(default)]
    pub variants: Vec<VariantRow>,
    /// Locations without their GIDs (full refresh).
    #[serde(default)]
    pub locations: Vec<LocationRow>,
    /// Inventory snapshots (staged and merged).
    #[serde(default)]
    pub inventory: Vec<InventorySnapshot>,
    /// Sale line items (staged and merged).
    #[serde(default)]
    pub sales: Vec<SaleLineItem>,
}

impl SyncDocument {
    /// Whether the document carries no rows at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
            && self.variants.is_empty()
            && self.locations.is_empty()
            && self.inventory.is_empty()
            && self.sales.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};
    use rust_decimal::Decimal;

    use super::*;
    use crate::types::{
        InventoryItemId, LocationId, OrderId, ProductId, SaleId, SnapshotId, VariantId,
    };

    fn sample() -> SyncDocument {
        let date = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();
        let ts = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();

        SyncDocument {
            products: vec![ProductRow {
                product_id: ProductId::new("1"),
                title: Some("Tee".to_string()),
                vendor: Some("Acme".to_string()),
                status: None,
                created_at: Some(ts),
                updated_at: None,
            }],
            variants: vec![VariantRow {
                variant_id: VariantId::new("10"),
                product_id: ProductId::new("1"),
                sku: "TEE-S".to_string(),
                title: Some("S".to_string()),
                price: Decimal::new(1999, 2),
                inventory_item_id: InventoryItemId::new("100"),
            }],
            locations: vec![LocationRow {
                location_id: LocationId::new("7"),
                location_gid: "gid://shopify/Location/7".to_string(),
                name: Some("Main".to_string()),
                active: true,
            }],
            inventory: vec![InventorySnapshot {
                snapshot_id: SnapshotId::for_inventory(
                    &VariantId::new("10"),
                    &LocationId::new("7"),
                    date,
                ),
                variant_id: VariantId::new("10"),
                sku: "TEE-S".to_string(),
                location_id: LocationId::new("7"),
                available_qty: 4,
                incoming_qty: 0,
                committed_qty: 1,
                snapshot_date: date,
                snapshot_timestamp: ts,
            }],
            sales: vec![SaleLineItem {
                sale_id: SaleId::new("55_66"),
                order_id: OrderId::new("55"),
                order_name: "#1001".to_string(),
                variant_id: VariantId::new("10"),
                sku: "TEE-S".to_string(),
                product_title: Some("Tee".to_string()),
                quantity_sold: 2,
                sale_date: date,
                sale_timestamp: ts,
                vendor: "Acme".to_string(),
            }],
        }
    }

    #[test]
    fn test_document_has_five_named_sequences() {
        let value = serde_json::to_value(sample()).unwrap();
        let object = value.as_object().unwrap();

        let mut keys: Vec<&str> = object.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            vec!["inventory", "locations", "products", "sales", "variants"]
        );
    }

    #[test]
    fn test_document_field_formats() {
        let value = serde_json::to_value(sample()).unwrap();

        assert_eq!(value["inventory"][0]["snapshot_id"], "10_7_2025-01-02");
        assert_eq!(value["inventory"][0]["snapshot_date"], "2025-01-02");
        assert_eq!(value["variants"][0]["price"], "19.99");
        assert!(value["locations"][0].get("location_gid").is_none());
    }

    #[test]
    fn test_missing_sequences_read_as_empty() {
        let doc: SyncDocument = serde_json::from_str(r#"{"products": []}"#).unwrap();
        assert!(doc.is_empty());
    }

    #[test]
    fn test_document_reads_back_without_location_gids() {
        let json = serde_json::to_string(&sample()).unwrap();
        let doc: SyncDocument = serde_json::from_str(&json).unwrap();

        assert_eq!(doc.inventory, sample().inventory);
        assert_eq!(doc.sales, sample().sales);
        assert_eq!(doc.locations[0].location_id.as_str(), "7");
        assert!(doc.locations[0].location_gid.is_empty());
    }
}
