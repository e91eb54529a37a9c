//! Inventory item to variant resolution.
//!
//! Inventory levels only name their inventory item, so the variant behind
//! each level is looked up in a map built from the variants synced earlier
//! in the same run.

use std::collections::HashMap;

use shopify_backup_core::{InventoryItemId, VariantId, VariantRow};
use tracing::debug;

/// `inventory_item_id -> variant_id` for one run.
#[derive(Debug, Clone, Default)]
pub struct IdentityMap {
    variants: HashMap<InventoryItemId, VariantId>,
    collisions: usize,
}

impl IdentityMap {
    /// Build the map from every variant of a completed product sync.
    ///
    /// Variants with an empty inventory item id or variant id are skipped.
    /// When two variants share an inventory item, the one seen last wins and
    /// the collision is counted.
    #[must_use]
    pub fn from_variants(variants: &[VariantRow]) -> Self {
        let mut map = Self::default();

        for variant in variants {
            if variant.inventory_item_id.is_empty() || variant.variant_id.is_empty() {
                continue;
            }
            let previous = map
                .variants
                .insert(variant.inventory_item_id.clone(), variant.variant_id.clone());
            if let Some(previous) = previous
                && previous != variant.variant_id
            {
                debug!(
                    inventory_item_id = %variant.inventory_item_id,
                    replaced = %previous,
                    variant_id = %variant.variant_id,
                    "Inventory item shared by several variants, keeping the last"
                );
                map.collisions += 1;
            }
        }

        map
    }

    /// Variant owning `inventory_item_id`, if it was synced.
    #[must_use]
    pub fn resolve(&self, inventory_item_id: &InventoryItemId) -> Option<&VariantId> {
        self.variants.get(inventory_item_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.variants.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    /// How many entries were overwritten by a later variant.
    #[must_use]
    pub const fn collisions(&self) -> usize {
        self.collisions
    }
}
