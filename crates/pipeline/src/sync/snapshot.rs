//! Row builders: API nodes in, immutable rows out.
//!
//! Every builder is pure. Keys are concatenations of component ids, so the
//! same input always yields the same rows.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use shopify_backup_core::{
    InventoryItemId, InventorySnapshot, LineItemId, LocationId, LocationRow, OrderId, ProductId,
    ProductRow, SaleId, SaleLineItem, SnapshotId, VariantId, VariantRow,
};

use crate::shopify::types::{InventoryLevelNode, LineItemNode, LocationNode, OrderNode, ProductNode, VariantNode};

/// The single date and time stamped on every inventory row of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotStamp {
    pub date: NaiveDate,
    pub timestamp: DateTime<Utc>,
}

impl SnapshotStamp {
    /// Stamp for the UTC instant `timestamp`.
    #[must_use]
    pub fn at(timestamp: DateTime<Utc>) -> Self {
        Self {
            date: timestamp.date_naive(),
            timestamp,
        }
    }
}

#[must_use]
pub fn product_row(node: &ProductNode) -> ProductRow {
    ProductRow {
        product_id: ProductId::from_gid(&node.id),
        title: node.title.clone(),
        vendor: node.vendor.clone(),
        status: node.status.clone(),
        created_at: node.created_at,
        updated_at: node.updated_at,
    }
}

/// Variant row; sku defaults to empty, price to zero.
#[must_use]
pub fn variant_row(product_id: &ProductId, node: &VariantNode) -> VariantRow {
    let inventory_item_gid = node
        .inventory_item
        .as_ref()
        .and_then(|item| item.id.as_deref())
        .unwrap_or_default();

    VariantRow {
        variant_id: VariantId::from_gid(node.id.as_deref().unwrap_or_default()),
        product_id: product_id.clone(),
        sku: node.sku.clone().unwrap_or_default(),
        title: node.title.clone(),
        price: node.price.unwrap_or(Decimal::ZERO),
        inventory_item_id: InventoryItemId::from_gid(inventory_item_gid),
    }
}

/// Location row; keeps the GID for the inventory queries of this run.
#[must_use]
pub fn location_row(node: &LocationNode) -> LocationRow {
    LocationRow {
        location_id: LocationId::from_gid(&node.id),
        location_gid: node.id.clone(),
        name: node.name.clone(),
        active: node.is_active.unwrap_or(false),
    }
}

/// Inventory snapshot of one level at one location.
///
/// Quantity names missing from the level count as 0.
#[must_use]
pub fn inventory_snapshot(
    level: &InventoryLevelNode,
    variant_id: &VariantId,
    location_id: &LocationId,
    stamp: SnapshotStamp,
) -> InventorySnapshot {
    let sku = level
        .item
        .as_ref()
        .and_then(|item| item.sku.clone())
        .unwrap_or_default();

    InventorySnapshot {
        snapshot_id: SnapshotId::for_inventory(variant_id, location_id, stamp.date),
        variant_id: variant_id.clone(),
        sku,
        location_id: location_id.clone(),
        available_qty: level.quantity("available"),
        incoming_qty: level.quantity("incoming"),
        committed_qty: level.quantity("committed"),
        snapshot_date: stamp.date,
        snapshot_timestamp: stamp.timestamp,
    }
}

/// Sale row of one line item; `None` when the line item has no variant.
#[must_use]
pub fn sale_line_item(order: &OrderNode, line_item: &LineItemNode) -> Option<SaleLineItem> {
    let variant = line_item.variant.as_ref()?;
    let variant_id = VariantId::from_gid(variant.id.as_deref()?);
    if variant_id.is_empty() {
        return None;
    }

    let order_id = OrderId::from_gid(&order.id);
    let line_item_id = LineItemId::from_gid(line_item.id.as_deref().unwrap_or_default());
    let vendor = variant
        .product
        .as_ref()
        .and_then(|product| product.vendor.clone())
        .unwrap_or_default();

    Some(SaleLineItem {
        sale_id: SaleId::for_line_item(&order_id, &line_item_id),
        order_id,
        order_name: order.name.clone().unwrap_or_default(),
        variant_id,
        sku: line_item.sku.clone().unwrap_or_default(),
        product_title: line_item.title.clone(),
        quantity_sold: line_item.quantity.unwrap_or(0),
        sale_date: order.created_at.date_naive(),
        sale_timestamp: order.created_at,
        vendor,
    })
}
