//! Catalog rows: products and their variants.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{InventoryItemId, ProductId, VariantId};
use super::status::ProductStatus;

/// A product as written to the `products` dimension table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRow {
    /// Short product id.
    pub product_id: ProductId,
    /// Product title.
    pub title: Option<String>,
    /// Vendor name.
    pub vendor: Option<String>,
    /// Publication status.
    pub status: Option<ProductStatus>,
    /// Creation timestamp.
    pub created_at: Option<DateTime<Utc>>,
    /// Last update timestamp.
    pub updated_at: Option<DateTime<Utc>>,
}

/// A product variant as written to the `variants` dimension table.
///
/// `inventory_item_id` is the link between the catalog and inventory levels;
/// it is empty when Shopify returned no inventory item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantRow {
    /// Short variant id.
    pub variant_id: VariantId,
    /// Owning product.
    pub product_id: ProductId,
    /// SKU, empty when unset.
    pub sku: String,
    /// Variant title.
    pub title: Option<String>,
    /// Unit price, zero when unset.
    pub price: Decimal,
    /// Inventory item backing this variant.
    pub inventory_item_id: InventoryItemId,
}
