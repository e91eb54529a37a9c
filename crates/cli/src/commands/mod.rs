//! Command implementations.
//!
//! # Environment Variables
//!
//! - `SHOPIFY_SHOP_NAME`, `SHOPIFY_ACCESS_TOKEN` - Admin API access (sync)
//! - `WAREHOUSE_DATABASE_URL` or `WAREHOUSE_DATABASE_URL_FILE`,
//!   `WAREHOUSE_DATASET` - warehouse access (setup, load)

use std::path::Path;

use shopify_backup_core::SyncDocument;
use shopify_backup_pipeline::PipelineError;
use shopify_backup_pipeline::config::{ShopifyConfig, SyncSettings, WarehouseConfig};
use shopify_backup_pipeline::document::{read_document, write_document};
use shopify_backup_pipeline::load::{self, run_load};
use shopify_backup_pipeline::shopify::{HttpTransport, ShopifyFetcher};
use shopify_backup_pipeline::sync::{SyncOptions, run_sync};
use shopify_backup_pipeline::warehouse::PgWarehouse;
use tracing::info;

async fn connect_warehouse() -> Result<PgWarehouse, PipelineError> {
    let config = WarehouseConfig::from_env()?;
    info!(dataset = %config.dataset, "Connecting to warehouse...");
    Ok(PgWarehouse::connect(&config).await?)
}

/// Create the schema and every table.
pub async fn setup() -> Result<(), PipelineError> {
    let warehouse = connect_warehouse().await?;
    load::setup(&warehouse).await?;
    Ok(())
}

/// Sync the store and write the sync document.
pub async fn sync(settings: &SyncSettings) -> Result<SyncDocument, PipelineError> {
    let config = ShopifyConfig::from_env()?;
    info!(
        shop = %config.shop_name,
        api_version = %config.api_version,
        days_back = settings.orders_days_back,
        "Starting sync"
    );

    let fetcher = ShopifyFetcher::new(HttpTransport::new(&config)?);
    let output = run_sync(&fetcher, &SyncOptions::from(settings)).await?;

    write_document(&settings.data_path, &output.document).await?;
    info!(path = %settings.data_path.display(), "Sync document written");
    Ok(output.document)
}

/// Read the sync document at `path` and load it.
pub async fn load(path: &Path) -> Result<(), PipelineError> {
    let document = read_document(path).await?;
    info!(path = %path.display(), "Sync document read");
    load_document(&document).await
}

/// Load an in-memory sync document.
pub async fn load_document(document: &SyncDocument) -> Result<(), PipelineError> {
    let warehouse = connect_warehouse().await?;
    run_load(&warehouse, document).await?;
    Ok(())
}
