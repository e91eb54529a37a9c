//! How each row type maps onto its table.

use chrono::{DateTime, NaiveDate, Utc};
use shopify_backup_core::{InventorySnapshot, LocationRow, ProductRow, SaleLineItem, VariantRow};
use sqlx::Postgres;
use sqlx::query_builder::Separated;

use super::schema::{self, Column};

/// A row that can be bound into a multi-row `INSERT`.
///
/// Binds must follow the order of [`WarehouseRow::COLUMNS`].
pub trait WarehouseRow: Clone + Send + Sync {
    const COLUMNS: &'static [Column];

    fn bind_into<'args>(&self, row: &mut Separated<'_, 'args, Postgres, &'static str>);
}

/// A fact row: keyed, dated and timestamped.
pub trait FactRecord: WarehouseRow {
    fn key(&self) -> &str;
    fn date(&self) -> NaiveDate;
    fn timestamp(&self) -> DateTime<Utc>;
}

impl WarehouseRow for ProductRow {
    const COLUMNS: &'static [Column] = schema::PRODUCTS;

    fn bind_into<'args>(&self, row: &mut Separated<'_, 'args, Postgres, &'static str>) {
        row.push_bind(self.product_id.clone())
            .push_bind(self.title.clone())
            .push_bind(self.vendor.clone())
            .push_bind(self.status.as_ref().map(|status| status.as_str().to_string()))
            .push_bind(self.created_at)
            .push_bind(self.updated_at);
    }
}

impl WarehouseRow for VariantRow {
    const COLUMNS: &'static [Column] = schema::VARIANTS;

    fn bind_into<'args>(&self, row: &mut Separated<'_, 'args, Postgres, &'static str>) {
        row.push_bind(self.variant_id.clone())
            .push_bind(self.product_id.clone())
            .push_bind(self.sku.clone())
            .push_bind(self.title.clone())
            .push_bind(self.price)
            .push_bind(self.inventory_item_id.clone());
    }
}

impl WarehouseRow for LocationRow {
    const COLUMNS: &'static [Column] = schema::LOCATIONS;

    fn bind_into<'args>(&self, row: &mut Separated<'_, 'args, Postgres, &'static str>) {
        row.push_bind(self.location_id.clone())
            .push_bind(self.name.clone())
            .push_bind(self.active);
    }
}

impl WarehouseRow for InventorySnapshot {
    const COLUMNS: &'static [Column] = schema::INVENTORY_SNAPSHOTS;

    fn bind_into<'args>(&self, row: &mut Separated<'_, 'args, Postgres, &'static str>) {
        row.push_bind(self.snapshot_id.clone())
            .push_bind(self.variant_id.clone())
            .push_bind(self.sku.clone())
            .push_bind(self.location_id.clone())
            .push_bind(self.available_qty)
            .push_bind(self.incoming_qty)
            .push_bind(self.committed_qty)
            .push_bind(self.snapshot_date)
            .push_bind(self.snapshot_timestamp);
    }
}

impl FactRecord for InventorySnapshot {
    fn key(&self) -> &str {
        self.snapshot_id.as_str()
    }

    fn date(&self) -> NaiveDate {
        self.snapshot_date
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.snapshot_timestamp
    }
}

impl WarehouseRow for SaleLineItem {
    const COLUMNS: &'static [Column] = schema::SALES_HISTORY;

    fn bind_into<'args>(&self, row: &mut Separated<'_, 'args, Postgres, &'static str>) {
        row.push_bind(self.sale_id.clone())
            .push_bind(self.order_id.clone())
            .push_bind(self.order_name.clone())
            .push_bind(self.variant_id.clone())
            .push_bind(self.sku.clone())
            .push_bind(self.product_title.clone())
            .push_bind(self.quantity_sold)
            .push_bind(self.sale_date)
            .push_bind(self.sale_timestamp)
            .push_bind(self.vendor.clone());
    }
}

impl FactRecord for SaleLineItem {
    fn key(&self) -> &str {
        self.sale_id.as_str()
    }

    fn date(&self) -> NaiveDate {
        self.sale_date
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.sale_timestamp
    }
}
