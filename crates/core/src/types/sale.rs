//! Sale line item rows.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::id::{OrderId, SaleId, VariantId};

/// One order line, flattened for the sales history tables.
///
/// Fact row: staged into `sales_history_stg`, then merged into the
/// `sales_history_raw` backup table partitioned by `sale_date`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleLineItem {
    /// `{order_id}_{line_item_id}`.
    pub sale_id: SaleId,
    /// Short order id.
    pub order_id: OrderId,
    /// Human order name (e.g. `#1001`).
    pub order_name: String,
    /// Variant sold.
    pub variant_id: VariantId,
    /// SKU on the line item, empty when unset.
    pub sku: String,
    /// Line item title.
    pub product_title: Option<String>,
    /// Units sold.
    pub quantity_sold: i64,
    /// Partition date: UTC date of order creation.
    pub sale_date: NaiveDate,
    /// Order creation time (UTC).
    pub sale_timestamp: DateTime<Utc>,
    /// Vendor of the variant's product, empty when unset.
    pub vendor: String,
}
