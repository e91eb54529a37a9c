//! Unified error handling for the backup pipeline.

use thiserror::Error;

use crate::config::ConfigError;
use crate::document::DocumentError;
use crate::shopify::ShopifyError;
use crate::sync::SyncError;
use crate::warehouse::WarehouseError;

/// Pipeline-level error type.
///
/// Every variant is fatal for the run. There is no partial-success
/// bookkeeping: a failed run is simply re-run, which is safe because
/// dimension loads replace whole tables and fact loads merge by key.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Required configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The Shopify client could not be set up.
    #[error("Shopify error: {0}")]
    Shopify(#[from] ShopifyError),

    /// The sync stage failed.
    #[error("Sync failed: {0}")]
    Sync(#[from] SyncError),

    /// Warehouse statement failed.
    #[error("Warehouse error: {0}")]
    Warehouse(#[from] WarehouseError),

    /// The sync document could not be read or written.
    #[error("Sync document error: {0}")]
    Document(#[from] DocumentError),
}

impl PipelineError {
    /// Short name of the failing stage, used as a log field.
    #[must_use]
    pub const fn stage(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Shopify(_) | Self::Sync(_) => "sync",
            Self::Warehouse(_) => "load",
            Self::Document(_) => "document",
        }
    }
}
