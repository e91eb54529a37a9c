//! The warehouse: dimension tables, staging tables and partitioned backups.
//!
//! Dimensions (`products`, `variants`, `locations`) are replaced wholesale.
//! Facts (inventory snapshots, sale line items) go through a staging table
//! and are merged into their backup table on `(key, date)`, limited to the
//! date range actually staged. A merge never deletes.

#[cfg(any(test, feature = "testing"))]
mod memory;
mod postgres;
mod rows;
pub mod schema;

#[cfg(any(test, feature = "testing"))]
pub use memory::{Backup, MemoryState, MemoryWarehouse};
pub use postgres::{PgWarehouse, create_pool, merge_statement};
pub use rows::{FactRecord, WarehouseRow};

use async_trait::async_trait;
use chrono::NaiveDate;
use shopify_backup_core::{InventorySnapshot, LocationRow, ProductRow, SaleLineItem, VariantRow};
use thiserror::Error;

use crate::config::ConfigError;
use schema::Column;

/// Warehouse errors. Every one of them fails the load.
#[derive(Debug, Error)]
pub enum WarehouseError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Full-refresh tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    Products,
    Variants,
    Locations,
}

impl Dimension {
    #[must_use]
    pub const fn table(self) -> &'static str {
        match self {
            Self::Products => "products",
            Self::Variants => "variants",
            Self::Locations => "locations",
        }
    }

    #[must_use]
    pub const fn columns(self) -> &'static [Column] {
        match self {
            Self::Products => schema::PRODUCTS,
            Self::Variants => schema::VARIANTS,
            Self::Locations => schema::LOCATIONS,
        }
    }
}

/// Incrementally merged tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fact {
    Inventory,
    Sales,
}

impl Fact {
    #[must_use]
    pub const fn staging_table(self) -> &'static str {
        match self {
            Self::Inventory => "inventory_snapshots_stg",
            Self::Sales => "sales_history_stg",
        }
    }

    /// Backup table, partitioned by month on [`Fact::date_column`].
    #[must_use]
    pub const fn backup_table(self) -> &'static str {
        match self {
            Self::Inventory => "inventory_snapshots_raw",
            Self::Sales => "sales_history_raw",
        }
    }

    #[must_use]
    pub const fn key_column(self) -> &'static str {
        match self {
            Self::Inventory => "snapshot_id",
            Self::Sales => "sale_id",
        }
    }

    #[must_use]
    pub const fn date_column(self) -> &'static str {
        match self {
            Self::Inventory => "snapshot_date",
            Self::Sales => "sale_date",
        }
    }

    /// Breaks ties between staged rows sharing a key: the latest wins.
    #[must_use]
    pub const fn timestamp_column(self) -> &'static str {
        match self {
            Self::Inventory => "snapshot_timestamp",
            Self::Sales => "sale_timestamp",
        }
    }

    #[must_use]
    pub const fn columns(self) -> &'static [Column] {
        match self {
            Self::Inventory => schema::INVENTORY_SNAPSHOTS,
            Self::Sales => schema::SALES_HISTORY,
        }
    }
}

/// Rows of one dimension table.
#[derive(Debug, Clone, Copy)]
pub enum DimensionRows<'a> {
    Products(&'a [ProductRow]),
    Variants(&'a [VariantRow]),
    Locations(&'a [LocationRow]),
}

impl DimensionRows<'_> {
    #[must_use]
    pub const fn dimension(&self) -> Dimension {
        match self {
            Self::Products(_) => Dimension::Products,
            Self::Variants(_) => Dimension::Variants,
            Self::Locations(_) => Dimension::Locations,
        }
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        match self {
            Self::Products(rows) => rows.len(),
            Self::Variants(rows) => rows.len(),
            Self::Locations(rows) => rows.len(),
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Rows of one fact table.
#[derive(Debug, Clone, Copy)]
pub enum FactRows<'a> {
    Inventory(&'a [InventorySnapshot]),
    Sales(&'a [SaleLineItem]),
}

impl FactRows<'_> {
    #[must_use]
    pub const fn fact(&self) -> Fact {
        match self {
            Self::Inventory(_) => Fact::Inventory,
            Self::Sales(_) => Fact::Sales,
        }
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        match self {
            Self::Inventory(rows) => rows.len(),
            Self::Sales(rows) => rows.len(),
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Smallest and largest date among the rows.
    #[must_use]
    pub fn bounds(&self) -> Option<DateBounds> {
        match self {
            Self::Inventory(rows) => DateBounds::of(rows.iter().map(FactRecord::date)),
            Self::Sales(rows) => DateBounds::of(rows.iter().map(FactRecord::date)),
        }
    }
}

/// Inclusive date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateBounds {
    pub min: NaiveDate,
    pub max: NaiveDate,
}

impl DateBounds {
    /// Bounds of `dates`, `None` when there are none.
    pub fn of(dates: impl IntoIterator<Item = NaiveDate>) -> Option<Self> {
        dates.into_iter().fold(None, |bounds, date| {
            Some(match bounds {
                None => Self {
                    min: date,
                    max: date,
                },
                Some(Self { min, max }) => Self {
                    min: min.min(date),
                    max: max.max(date),
                },
            })
        })
    }

    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.min <= date && date <= self.max
    }
}

/// Rows touched by one merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    pub updated: u64,
    pub inserted: u64,
}

/// Storage the loader writes to.
///
/// Every method is atomic: on error nothing it started is left applied.
#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Create the schema and every table if missing.
    async fn ensure_tables(&self) -> Result<(), WarehouseError>;

    /// Replace the whole contents of a dimension table with `rows`.
    ///
    /// Returns the number of rows written.
    async fn replace_dimension(&self, rows: DimensionRows<'_>) -> Result<u64, WarehouseError>;

    /// Replace the contents of a fact's staging table with `rows`.
    async fn stage_facts(&self, rows: FactRows<'_>) -> Result<u64, WarehouseError>;

    /// Empty a fact's staging table.
    async fn clear_staging(&self, fact: Fact) -> Result<(), WarehouseError>;

    /// Date range of what is currently staged, `None` when staging is empty.
    async fn staged_bounds(&self, fact: Fact) -> Result<Option<DateBounds>, WarehouseError>;

    /// Upsert staged rows dated within `bounds` into the backup table.
    ///
    /// Staged rows sharing a key collapse to the one with the latest
    /// timestamp first. Matching backup rows are updated in full, the rest
    /// inserted.
    async fn merge_staged(&self, fact: Fact, bounds: DateBounds)
    -> Result<MergeOutcome, WarehouseError>;
}
