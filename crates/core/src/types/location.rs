//! Location rows.

use serde::{Deserialize, Serialize};

use super::id::LocationId;

/// A location as written to the `locations` dimension table.
///
/// `location_gid` is only needed while syncing (inventory is queried by GID)
/// and is never serialized into the sync document or the warehouse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationRow {
    /// Short location id.
    pub location_id: LocationId,
    /// Full GID used for API calls during the run.
    #[serde(skip)]
    pub location_gid: String,
    /// Location name.
    pub name: Option<String>,
    /// Whether the location is active.
    pub active: bool,
}
