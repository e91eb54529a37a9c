//! In-memory warehouse with the same semantics as [`super::PgWarehouse`].

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::NaiveDate;
use shopify_backup_core::{InventorySnapshot, LocationRow, ProductRow, SaleLineItem, VariantRow};

use super::rows::FactRecord;
use super::{
    DateBounds, DimensionRows, Fact, FactRows, MergeOutcome, Warehouse, WarehouseError,
};

/// Backup table contents keyed by `(key, date)`.
pub type Backup<R> = BTreeMap<(String, NaiveDate), R>;

/// Everything the in-memory warehouse holds.
#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    pub tables_ensured: bool,
    pub products: Vec<ProductRow>,
    pub variants: Vec<VariantRow>,
    pub locations: Vec<LocationRow>,
    pub inventory_staging: Vec<InventorySnapshot>,
    pub sales_staging: Vec<SaleLineItem>,
    pub inventory_backup: Backup<InventorySnapshot>,
    pub sales_backup: Backup<SaleLineItem>,
    /// Calls in order, e.g. `stage:sales_history_stg`.
    pub operations: Vec<String>,
}

/// Warehouse double for tests.
#[derive(Debug, Default)]
pub struct MemoryWarehouse {
    state: Mutex<MemoryState>,
    fail_on: Mutex<Option<String>>,
}

impl MemoryWarehouse {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the current state.
    pub fn inspect<R>(&self, f: impl FnOnce(&MemoryState) -> R) -> R {
        f(&self.lock())
    }

    /// Modify the state directly, e.g. to seed backup rows.
    pub fn update(&self, f: impl FnOnce(&mut MemoryState)) {
        f(&mut self.lock());
    }

    /// Make the operation named `operation` fail from now on.
    pub fn fail_on(&self, operation: &str) {
        *self
            .fail_on
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(operation.to_string());
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record `operation`, failing if it was marked with [`Self::fail_on`].
    fn enter(&self, operation: String) -> Result<MutexGuard<'_, MemoryState>, WarehouseError> {
        let failing = self
            .fail_on
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_deref()
            == Some(operation.as_str());
        if failing {
            return Err(WarehouseError::Database(sqlx::Error::Protocol(format!(
                "injected failure in {operation}"
            ))));
        }

        let mut state = self.lock();
        state.operations.push(operation);
        Ok(state)
    }
}

/// Latest timestamp per key and date wins, the later staged row on ties.
fn merge_into<R: FactRecord>(
    backup: &mut Backup<R>,
    staged: &[R],
    bounds: DateBounds,
) -> MergeOutcome {
    let mut latest: BTreeMap<(String, NaiveDate), &R> = BTreeMap::new();
    for row in staged.iter().filter(|row| bounds.contains(row.date())) {
        let key = (row.key().to_string(), row.date());
        match latest.get(&key) {
            Some(current) if current.timestamp() > row.timestamp() => {}
            _ => {
                latest.insert(key, row);
            }
        }
    }

    let mut outcome = MergeOutcome::default();
    for (key, row) in latest {
        if backup.insert(key, row.clone()).is_some() {
            outcome.updated += 1;
        } else {
            outcome.inserted += 1;
        }
    }
    outcome
}

fn staged_dates<R: FactRecord>(rows: &[R]) -> Option<DateBounds> {
    DateBounds::of(rows.iter().map(FactRecord::date))
}

#[async_trait]
impl Warehouse for MemoryWarehouse {
    async fn ensure_tables(&self) -> Result<(), WarehouseError> {
        let mut state = self.enter("ensure_tables".to_string())?;
        state.tables_ensured = true;
        Ok(())
    }

    async fn replace_dimension(&self, rows: DimensionRows<'_>) -> Result<u64, WarehouseError> {
        let mut state = self.enter(format!("replace:{}", rows.dimension().table()))?;
        match rows {
            DimensionRows::Products(rows) => state.products = rows.to_vec(),
            DimensionRows::Variants(rows) => state.variants = rows.to_vec(),
            DimensionRows::Locations(rows) => state.locations = rows.to_vec(),
        }
        Ok(rows.len() as u64)
    }

    async fn stage_facts(&self, rows: FactRows<'_>) -> Result<u64, WarehouseError> {
        let mut state = self.enter(format!("stage:{}", rows.fact().staging_table()))?;
        match rows {
            FactRows::Inventory(rows) => state.inventory_staging = rows.to_vec(),
            FactRows::Sales(rows) => state.sales_staging = rows.to_vec(),
        }
        Ok(rows.len() as u64)
    }

    async fn clear_staging(&self, fact: Fact) -> Result<(), WarehouseError> {
        let mut state = self.enter(format!("clear:{}", fact.staging_table()))?;
        match fact {
            Fact::Inventory => state.inventory_staging.clear(),
            Fact::Sales => state.sales_staging.clear(),
        }
        Ok(())
    }

    async fn staged_bounds(&self, fact: Fact) -> Result<Option<DateBounds>, WarehouseError> {
        let state = self.enter(format!("bounds:{}", fact.staging_table()))?;
        Ok(match fact {
            Fact::Inventory => staged_dates(&state.inventory_staging),
            Fact::Sales => staged_dates(&state.sales_staging),
        })
    }

    async fn merge_staged(
        &self,
        fact: Fact,
        bounds: DateBounds,
    ) -> Result<MergeOutcome, WarehouseError> {
        let mut state = self.enter(format!("merge:{}", fact.backup_table()))?;
        let state = &mut *state;
        Ok(match fact {
            Fact::Inventory => {
                merge_into(&mut state.inventory_backup, &state.inventory_staging, bounds)
            }
            Fact::Sales => merge_into(&mut state.sales_backup, &state.sales_staging, bounds),
        })
    }
}
