//! The load stage: [`SyncDocument`] to warehouse.
//!
//! Dimensions are refreshed in full, facts are staged and merged. An empty
//! dimension set leaves its table alone; an empty fact set clears staging so
//! rows left by an earlier failed run are never merged.

use shopify_backup_core::SyncDocument;
use tracing::{info, instrument, warn};

use crate::warehouse::{
    DateBounds, Dimension, DimensionRows, Fact, FactRows, MergeOutcome, Warehouse, WarehouseError,
    schema,
};

/// What happened to one dimension table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DimensionLoad {
    Replaced(u64),
    /// No rows in the document; the table was not touched.
    Skipped,
}

/// What happened to one fact table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactLoad {
    Merged {
        staged: u64,
        bounds: DateBounds,
        outcome: MergeOutcome,
    },
    /// No rows in the document; staging was cleared and nothing merged.
    Empty,
}

impl FactLoad {
    /// Merge counts, zero when nothing was merged.
    #[must_use]
    pub fn outcome(&self) -> MergeOutcome {
        match self {
            Self::Merged { outcome, .. } => *outcome,
            Self::Empty => MergeOutcome::default(),
        }
    }
}

/// Result of a load run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadReport {
    pub products: DimensionLoad,
    pub variants: DimensionLoad,
    pub locations: DimensionLoad,
    pub inventory: FactLoad,
    pub sales: FactLoad,
}

/// Load a sync document into the warehouse.
///
/// # Errors
///
/// Returns the first `WarehouseError`. Steps already completed stay
/// applied; staging left behind is overwritten by the next run.
#[instrument(skip_all)]
pub async fn run_load<W: Warehouse + ?Sized>(
    warehouse: &W,
    document: &SyncDocument,
) -> Result<LoadReport, WarehouseError> {
    warehouse.ensure_tables().await?;

    let products = refresh_dimension(warehouse, DimensionRows::Products(&document.products)).await?;
    let variants = refresh_dimension(warehouse, DimensionRows::Variants(&document.variants)).await?;
    let locations =
        refresh_dimension(warehouse, DimensionRows::Locations(&document.locations)).await?;

    let inventory = stage_and_merge(warehouse, FactRows::Inventory(&document.inventory)).await?;
    let sales = stage_and_merge(warehouse, FactRows::Sales(&document.sales)).await?;

    info!(
        inventory_updated = inventory.outcome().updated,
        inventory_inserted = inventory.outcome().inserted,
        sales_updated = sales.outcome().updated,
        sales_inserted = sales.outcome().inserted,
        "Load complete"
    );

    Ok(LoadReport {
        products,
        variants,
        locations,
        inventory,
        sales,
    })
}

async fn refresh_dimension<W: Warehouse + ?Sized>(
    warehouse: &W,
    rows: DimensionRows<'_>,
) -> Result<DimensionLoad, WarehouseError> {
    let table = rows.dimension().table();
    if rows.is_empty() {
        warn!(table, "No rows to load, keeping existing table");
        return Ok(DimensionLoad::Skipped);
    }

    let written = warehouse.replace_dimension(rows).await?;
    info!(table, rows = written, "Replaced table");
    Ok(DimensionLoad::Replaced(written))
}

async fn stage_and_merge<W: Warehouse + ?Sized>(
    warehouse: &W,
    rows: FactRows<'_>,
) -> Result<FactLoad, WarehouseError> {
    let fact = rows.fact();
    if rows.is_empty() {
        warehouse.clear_staging(fact).await?;
        warn!(
            table = fact.staging_table(),
            "No rows to stage, cleared staging and skipped merge"
        );
        return Ok(FactLoad::Empty);
    }

    let staged = warehouse.stage_facts(rows).await?;
    info!(table = fact.staging_table(), rows = staged, "Staged rows");

    let Some(bounds) = warehouse.staged_bounds(fact).await? else {
        return Ok(FactLoad::Empty);
    };

    let outcome = warehouse.merge_staged(fact, bounds).await?;
    info!(
        table = fact.backup_table(),
        min_date = %bounds.min,
        max_date = %bounds.max,
        updated = outcome.updated,
        inserted = outcome.inserted,
        "Merged staged rows"
    );

    Ok(FactLoad::Merged {
        staged,
        bounds,
        outcome,
    })
}

/// Create the schema and every table.
///
/// # Errors
///
/// Returns `WarehouseError` if any statement fails.
pub async fn setup<W: Warehouse + ?Sized>(warehouse: &W) -> Result<(), WarehouseError> {
    warehouse.ensure_tables().await?;
    let dimensions = [Dimension::Products, Dimension::Variants, Dimension::Locations]
        .map(Dimension::table);
    let facts = [Fact::Inventory, Fact::Sales].map(Fact::backup_table);
    info!(
        ?dimensions,
        ?facts,
        reference = schema::VENDORS_TABLE,
        "Warehouse tables ready"
    );
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{DateTime, NaiveDate, TimeZone, Utc};
    use rust_decimal::Decimal;
    use shopify_backup_core::{
        InventoryItemId, InventorySnapshot, LocationId, OrderId, ProductId, ProductRow, SaleId,
        SaleLineItem, SnapshotId, VariantId, VariantRow,
    };

    use super::*;
    use crate::warehouse::MemoryWarehouse;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, day, 4, 0, 0).unwrap()
    }

    fn snapshot(variant: &str, location: &str, day: u32, available: i64) -> InventorySnapshot {
        let ts = at(day);
        let variant_id = VariantId::new(variant);
        let location_id = LocationId::new(location);
        InventorySnapshot {
            snapshot_id: SnapshotId::for_inventory(&variant_id, &location_id, ts.date_naive()),
            variant_id,
            sku: format!("SKU-{variant}"),
            location_id,
            available_qty: available,
            incoming_qty: 0,
            committed_qty: 0,
            snapshot_date: ts.date_naive(),
            snapshot_timestamp: ts,
        }
    }

    fn sale(order: &str, line: &str, day: u32) -> SaleLineItem {
        let ts = at(day);
        SaleLineItem {
            sale_id: SaleId::new(format!("{order}_{line}")),
            order_id: OrderId::new(order),
            order_name: format!("#{order}"),
            variant_id: VariantId::new("10"),
            sku: "SKU-10".to_string(),
            product_title: Some("Tee".to_string()),
            quantity_sold: 1,
            sale_date: ts.date_naive(),
            sale_timestamp: ts,
            vendor: "Acme".to_string(),
        }
    }

    fn document() -> SyncDocument {
        SyncDocument {
            products: vec![ProductRow {
                product_id: ProductId::new("1"),
                title: Some("Tee".to_string()),
                vendor: Some("Acme".to_string()),
                status: None,
                created_at: None,
                updated_at: None,
            }],
            variants: vec![VariantRow {
                variant_id: VariantId::new("10"),
                product_id: ProductId::new("1"),
                sku: "SKU-10".to_string(),
                title: None,
                price: Decimal::new(1999, 2),
                inventory_item_id: InventoryItemId::new("100"),
            }],
            locations: vec![],
            inventory: vec![snapshot("10", "7", 15, 5), snapshot("11", "7", 15, 2)],
            sales: vec![sale("900", "1", 3), sale("901", "1", 14)],
        }
    }

    #[tokio::test]
    async fn test_second_load_only_updates() {
        let warehouse = MemoryWarehouse::new();
        let doc = document();

        let first = run_load(&warehouse, &doc).await.unwrap();
        let after_first = warehouse.inspect(|s| (s.inventory_backup.clone(), s.sales_backup.clone()));
        let second = run_load(&warehouse, &doc).await.unwrap();
        let after_second = warehouse.inspect(|s| (s.inventory_backup.clone(), s.sales_backup.clone()));

        assert_eq!(first.inventory.outcome(), MergeOutcome { updated: 0, inserted: 2 });
        assert_eq!(second.inventory.outcome(), MergeOutcome { updated: 2, inserted: 0 });
        assert_eq!(second.sales.outcome(), MergeOutcome { updated: 2, inserted: 0 });
        assert_eq!(after_first, after_second);
    }

    #[tokio::test]
    async fn test_merge_bounded_to_staged_dates() {
        let warehouse = MemoryWarehouse::new();
        let old = sale("800", "1", 1);
        warehouse.update(|state| {
            state
                .sales_backup
                .insert((old.sale_id.to_string(), old.sale_date), old.clone());
        });

        let report = run_load(&warehouse, &document()).await.unwrap();

        let FactLoad::Merged { bounds, .. } = report.sales else {
            panic!("sales were not merged");
        };
        assert_eq!(bounds.min, NaiveDate::from_ymd_opt(2025, 5, 3).unwrap());
        assert_eq!(bounds.max, NaiveDate::from_ymd_opt(2025, 5, 14).unwrap());
        warehouse.inspect(|state| {
            assert_eq!(state.sales_backup.len(), 3);
            let kept = state
                .sales_backup
                .get(&(old.sale_id.to_string(), old.sale_date))
                .unwrap();
            assert_eq!(kept, &old);
        });
    }

    #[tokio::test]
    async fn test_empty_dimension_keeps_table() {
        let warehouse = MemoryWarehouse::new();
        run_load(&warehouse, &document()).await.unwrap();

        let report = run_load(&warehouse, &SyncDocument::default()).await.unwrap();

        assert_eq!(report.products, DimensionLoad::Skipped);
        warehouse.inspect(|state| {
            assert_eq!(state.products.len(), 1);
            assert_eq!(state.variants.len(), 1);
        });
    }

    #[tokio::test]
    async fn test_empty_facts_clear_stale_staging() {
        let warehouse = MemoryWarehouse::new();
        warehouse.update(|state| state.sales_staging = vec![sale("700", "1", 2)]);

        let report = run_load(&warehouse, &SyncDocument::default()).await.unwrap();

        assert_eq!(report.sales, FactLoad::Empty);
        warehouse.inspect(|state| {
            assert!(state.sales_staging.is_empty());
            assert!(state.sales_backup.is_empty());
            assert!(!state.operations.iter().any(|op| op.starts_with("merge:")));
            assert!(state.operations.contains(&"clear:sales_history_stg".to_string()));
        });
    }

    #[tokio::test]
    async fn test_operation_order() {
        let warehouse = MemoryWarehouse::new();
        run_load(&warehouse, &document()).await.unwrap();

        let operations = warehouse.inspect(|state| state.operations.clone());
        assert_eq!(
            operations,
            vec![
                "ensure_tables",
                "replace:products",
                "replace:variants",
                "stage:inventory_snapshots_stg",
                "bounds:inventory_snapshots_stg",
                "merge:inventory_snapshots_raw",
                "stage:sales_history_stg",
                "bounds:sales_history_stg",
                "merge:sales_history_raw",
            ]
        );
    }

    #[tokio::test]
    async fn test_warehouse_failure_aborts_load() {
        let warehouse = MemoryWarehouse::new();
        warehouse.fail_on("merge:inventory_snapshots_raw");

        let err = run_load(&warehouse, &document()).await.unwrap_err();

        assert!(matches!(err, WarehouseError::Database(_)));
        warehouse.inspect(|state| {
            assert!(state.sales_staging.is_empty());
            assert_eq!(state.inventory_staging.len(), 2);
        });
    }

    #[tokio::test]
    async fn test_setup_creates_tables() {
        let warehouse = MemoryWarehouse::new();
        setup(&warehouse).await.unwrap();
        warehouse.inspect(|state| assert!(state.tables_ensured));
    }
}
