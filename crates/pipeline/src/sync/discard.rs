//! Counters for records dropped during sync.

use std::collections::BTreeMap;
use std::fmt;

/// Why a fetched record did not become a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DiscardReason {
    /// Inventory level whose item is not the inventory item of any variant.
    UnmappedInventoryItem,
    /// Inventory level without an `item`.
    LevelWithoutItem,
    /// Order line item without a variant (custom or deleted product).
    LineItemWithoutVariant,
    /// Order flagged as a test order.
    TestOrder,
    /// Order with a cancellation time.
    CancelledOrder,
}

impl DiscardReason {
    /// Stable name used as a log field.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::UnmappedInventoryItem => "unmapped_inventory_item",
            Self::LevelWithoutItem => "level_without_item",
            Self::LineItemWithoutVariant => "line_item_without_variant",
            Self::TestOrder => "test_order",
            Self::CancelledOrder => "cancelled_order",
        }
    }
}

impl fmt::Display for DiscardReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-reason counts of dropped records for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscardLog {
    counts: BTreeMap<DiscardReason, u64>,
}

impl DiscardLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one dropped record.
    pub fn record(&mut self, reason: DiscardReason) {
        *self.counts.entry(reason).or_insert(0) += 1;
    }

    /// Records dropped for `reason`.
    #[must_use]
    pub fn count(&self, reason: DiscardReason) -> u64 {
        self.counts.get(&reason).copied().unwrap_or(0)
    }

    /// Records dropped for any reason.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Non-zero counts in reason order.
    pub fn iter(&self) -> impl Iterator<Item = (DiscardReason, u64)> + '_ {
        self.counts.iter().map(|(reason, count)| (*reason, *count))
    }
}

impl fmt::Display for DiscardLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        let parts: Vec<String> = self
            .iter()
            .map(|(reason, count)| format!("{reason}={count}"))
            .collect();
        f.write_str(&parts.join(", "))
    }
}
