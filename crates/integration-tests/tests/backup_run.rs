//! Integration tests for a whole backup run.
//!
//! The Admin API is replaced by a scripted transport and the warehouse by
//! the in-memory implementation, so these run offline while exercising the
//! same sync, sync document and load code as the binary.

#![allow(clippy::unwrap_used)]

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::json;
use shopify_backup_pipeline::document::{read_document, write_document};
use shopify_backup_pipeline::load::{DimensionLoad, FactLoad, run_load};
use shopify_backup_pipeline::shopify::ShopifyFetcher;
use shopify_backup_pipeline::sync::{
    DiscardReason, QueryErrorPolicy, SyncOptions, SyncOutput, run_sync,
};
use shopify_backup_pipeline::testing::{
    MemoryWarehouse, ScriptedTransport, connection, data_response, level_node, levels_page,
    location_node, order_node, product_node, with_cost,
};
use shopify_backup_pipeline::warehouse::MergeOutcome;
use tempfile::TempDir;

// =============================================================================
// Fixtures
// =============================================================================

fn may_15() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 5, 15, 4, 0, 0).unwrap()
}

fn options() -> SyncOptions {
    SyncOptions {
        orders_days_back: 14,
        query_error_policy: QueryErrorPolicy::StopResource,
        clock: may_15,
    }
}

/// Two product pages, one active and one inactive location, two inventory
/// pages and one orders page.
fn script_store(transport: &ScriptedTransport) {
    transport.push_json(data_response(json!({
        "products": connection(
            vec![product_node(1, "Tee", &[(11, "TEE-S", 101), (12, "TEE-M", 102)])],
            true,
            Some("products-1"),
        )
    })));
    transport.push_json(data_response(json!({
        "products": connection(vec![product_node(2, "Cap", &[(21, "CAP", 201)])], false, None)
    })));

    transport.push_json(data_response(json!({
        "locations": connection(
            vec![location_node(7, "Main", true), location_node(8, "Closed", false)],
            false,
            None,
        )
    })));

    transport.push_json(with_cost(
        json!({
            "data": levels_page(
                vec![level_node(101, "TEE-S", (5, 0, 1)), level_node(999, "GHOST", (1, 0, 0))],
                true,
                Some("levels-1"),
            )
        }),
        250.0,
        1500.0,
        100.0,
    ));
    transport.push_json(data_response(levels_page(
        vec![level_node(201, "CAP", (3, 2, 0))],
        false,
        None,
    )));

    let mut test_order = order_node(902, "2025-05-13T09:00:00Z", &[(1, Some(21), "CAP", 9)]);
    test_order["test"] = json!(true);
    let mut cancelled = order_node(903, "2025-05-13T10:00:00Z", &[(1, Some(21), "CAP", 4)]);
    cancelled["cancelledAt"] = json!("2025-05-13T11:00:00Z");
    transport.push_json(data_response(json!({
        "orders": connection(
            vec![
                order_node(900, "2025-05-02T12:00:00Z", &[(1, Some(11), "TEE-S", 2), (2, None, "GIFT", 1)]),
                order_node(901, "2025-05-14T08:30:00Z", &[(1, Some(21), "CAP", 1)]),
                test_order,
                cancelled,
            ],
            false,
            None,
        )
    })));
}

async fn sync_store() -> SyncOutput {
    let transport = ScriptedTransport::new();
    script_store(&transport);
    let fetcher = ShopifyFetcher::new(transport);

    let output = run_sync(&fetcher, &options()).await.unwrap();
    assert_eq!(fetcher.transport().remaining(), 0);
    output
}

// =============================================================================
// Sync
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_sync_follows_every_page() {
    let transport = ScriptedTransport::new();
    script_store(&transport);
    let fetcher = ShopifyFetcher::new(transport);

    run_sync(&fetcher, &options()).await.unwrap();

    let requests = fetcher.transport().requests();
    let operations: Vec<&str> = requests.iter().map(|r| r.operation_name.as_str()).collect();
    assert_eq!(
        operations,
        vec![
            "SyncProducts",
            "SyncProducts",
            "SyncLocations",
            "SyncInventoryLevels",
            "SyncInventoryLevels",
            "SyncOrders",
        ]
    );
    assert_eq!(requests[1].variables["cursor"], "products-1");
    assert_eq!(requests[4].variables["cursor"], "levels-1");
    assert_eq!(requests[3].variables["locationId"], "gid://shopify/Location/7");
}

#[tokio::test(start_paused = true)]
async fn test_sync_document_contents() {
    let output = sync_store().await;
    let document = &output.document;

    assert_eq!(document.products.len(), 2);
    assert_eq!(document.variants.len(), 3);
    assert_eq!(document.locations.len(), 2);

    let skus: Vec<&str> = document.inventory.iter().map(|r| r.sku.as_str()).collect();
    assert_eq!(skus, vec!["TEE-S", "CAP"]);
    assert!(document
        .inventory
        .iter()
        .all(|r| r.snapshot_date == NaiveDate::from_ymd_opt(2025, 5, 15).unwrap()));

    let sale_ids: Vec<&str> = document.sales.iter().map(|r| r.sale_id.as_str()).collect();
    assert_eq!(sale_ids, vec!["900_1", "901_1"]);
}

#[tokio::test(start_paused = true)]
async fn test_sync_summary_counts_discards() {
    let summary = sync_store().await.summary;

    assert_eq!(summary.active_locations, 1);
    assert_eq!(summary.discards.count(DiscardReason::UnmappedInventoryItem), 1);
    assert_eq!(summary.discards.count(DiscardReason::LineItemWithoutVariant), 1);
    assert_eq!(summary.discards.count(DiscardReason::TestOrder), 1);
    assert_eq!(summary.discards.count(DiscardReason::CancelledOrder), 1);
    assert_eq!(summary.discards.total(), 4);
    assert!(summary.incomplete.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_keys_unique_within_run() {
    let document = sync_store().await.document;

    let mut snapshot_ids: Vec<&str> = document.inventory.iter().map(|r| r.snapshot_id.as_str()).collect();
    snapshot_ids.sort_unstable();
    snapshot_ids.dedup();
    assert_eq!(snapshot_ids.len(), document.inventory.len());

    let mut sale_ids: Vec<&str> = document.sales.iter().map(|r| r.sale_id.as_str()).collect();
    sale_ids.sort_unstable();
    sale_ids.dedup();
    assert_eq!(sale_ids.len(), document.sales.len());
}

// =============================================================================
// Sync document -> Load
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_document_handoff_then_load() {
    let output = sync_store().await;
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sync_data.json");

    write_document(&path, &output.document).await.unwrap();
    let document = read_document(&path).await.unwrap();
    assert_eq!(document.inventory, output.document.inventory);
    assert_eq!(document.sales, output.document.sales);

    let warehouse = MemoryWarehouse::new();
    let report = run_load(&warehouse, &document).await.unwrap();

    assert_eq!(report.products, DimensionLoad::Replaced(2));
    assert_eq!(report.variants, DimensionLoad::Replaced(3));
    assert_eq!(report.locations, DimensionLoad::Replaced(2));
    assert_eq!(report.inventory.outcome(), MergeOutcome { updated: 0, inserted: 2 });
    assert_eq!(report.sales.outcome(), MergeOutcome { updated: 0, inserted: 2 });

    let FactLoad::Merged { bounds, .. } = report.sales else {
        panic!("sales were not merged");
    };
    assert_eq!(bounds.min, NaiveDate::from_ymd_opt(2025, 5, 2).unwrap());
    assert_eq!(bounds.max, NaiveDate::from_ymd_opt(2025, 5, 14).unwrap());
}

#[tokio::test(start_paused = true)]
async fn test_rerun_is_a_fixed_point() {
    let warehouse = MemoryWarehouse::new();

    let first = sync_store().await.document;
    run_load(&warehouse, &first).await.unwrap();
    let backup_after_first = warehouse.inspect(|s| (s.inventory_backup.clone(), s.sales_backup.clone()));

    let second = sync_store().await.document;
    let report = run_load(&warehouse, &second).await.unwrap();
    let backup_after_second = warehouse.inspect(|s| (s.inventory_backup.clone(), s.sales_backup.clone()));

    assert_eq!(report.inventory.outcome(), MergeOutcome { updated: 2, inserted: 0 });
    assert_eq!(report.sales.outcome(), MergeOutcome { updated: 2, inserted: 0 });
    assert_eq!(backup_after_first, backup_after_second);
}
