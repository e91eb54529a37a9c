//! Shopify Backup pipeline library.
//!
//! The daily backup runs in two batch stages joined by a JSON document:
//!
//! - [`sync`] pulls products, locations, inventory levels and recent orders
//!   from the Shopify Admin GraphQL API, throttled by the server's cost
//!   telemetry, and assembles row records.
//! - [`load`] refreshes the dimension tables and stages-then-merges the fact
//!   rows into date-partitioned backup tables, so re-runs are idempotent.
//!
//! Both stages are single-threaded: every request, sleep and statement is
//! awaited in sequence.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::path::Path;
//!
//! use shopify_backup_pipeline::{config, document, load, shopify, sync, warehouse};
//!
//! let shopify_config = config::ShopifyConfig::from_env()?;
//! let fetcher = shopify::ShopifyFetcher::new(shopify::HttpTransport::new(&shopify_config)?);
//! let output = sync::run_sync(&fetcher, &sync::SyncOptions::default()).await?;
//! document::write_document(Path::new("sync_data.json"), &output.document).await?;
//!
//! let warehouse_config = config::WarehouseConfig::from_env()?;
//! let warehouse = warehouse::PgWarehouse::connect(&warehouse_config).await?;
//! let report = load::run_load(&warehouse, &output.document).await?;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod document;
pub mod error;
pub mod load;
pub mod shopify;
pub mod sync;
pub mod warehouse;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use error::PipelineError;
