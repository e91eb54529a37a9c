//! Inventory snapshot rows.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::id::{LocationId, SnapshotId, VariantId};

/// One variant's stock at one location, as of the run's snapshot stamp.
///
/// Fact row: staged into `inventory_snapshots_stg`, then merged into the
/// `inventory_snapshots_raw` backup table partitioned by `snapshot_date`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventorySnapshot {
    /// `{variant_id}_{location_id}_{snapshot_date}`.
    pub snapshot_id: SnapshotId,
    /// Variant resolved from the inventory item.
    pub variant_id: VariantId,
    /// SKU reported on the inventory item.
    pub sku: String,
    /// Location the quantities belong to.
    pub location_id: LocationId,
    /// Quantity available for sale.
    pub available_qty: i64,
    /// Quantity on incoming transfers/purchase orders.
    pub incoming_qty: i64,
    /// Quantity committed to unfulfilled orders.
    pub committed_qty: i64,
    /// Partition date of the snapshot (UTC).
    pub snapshot_date: NaiveDate,
    /// Moment the inventory sync started (UTC).
    pub snapshot_timestamp: DateTime<Utc>,
}
