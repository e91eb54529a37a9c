//! The sync stage: Shopify Admin API to [`SyncDocument`].
//!
//! Resources are synced in a fixed order: products (which also yields the
//! identity map), locations, inventory of active locations, then recent
//! orders. Each resource is walked page by page; nothing runs concurrently.

mod collector;
mod discard;
mod identity;
mod snapshot;

pub use collector::{Collected, Collector, PAGE_DELAY, ProductCatalog, WalkReport};
pub use discard::{DiscardLog, DiscardReason};
pub use identity::IdentityMap;
pub use snapshot::SnapshotStamp;

use chrono::{DateTime, Duration, Utc};
use shopify_backup_core::SyncDocument;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::config::SyncSettings;
use crate::shopify::{GraphQLError, ShopifyError, ShopifyFetcher, Transport, format_graphql_errors};

/// What to do when a page comes back with GraphQL errors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QueryErrorPolicy {
    /// Log the errors and treat the resource as fully read.
    #[default]
    StopResource,
    /// Fail the run.
    Abort,
}

/// Errors that end a sync run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A request failed after retries, or its response was unreadable.
    #[error(transparent)]
    Shopify(#[from] ShopifyError),

    /// GraphQL errors under [`QueryErrorPolicy::Abort`].
    #[error("GraphQL errors while syncing {resource}: {}", format_graphql_errors(.errors))]
    QueryAborted {
        resource: &'static str,
        errors: Vec<GraphQLError>,
    },
}

/// Options of one sync run.
#[derive(Debug, Clone, Copy)]
pub struct SyncOptions {
    /// Orders created within this many days are synced.
    pub orders_days_back: u32,
    pub query_error_policy: QueryErrorPolicy,
    /// Source of the run's timestamps.
    pub clock: fn() -> DateTime<Utc>,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self::from(&SyncSettings::default())
    }
}

impl From<&SyncSettings> for SyncOptions {
    fn from(settings: &SyncSettings) -> Self {
        Self {
            orders_days_back: settings.orders_days_back,
            query_error_policy: if settings.abort_on_query_error {
                QueryErrorPolicy::Abort
            } else {
                QueryErrorPolicy::StopResource
            },
            clock: Utc::now,
        }
    }
}

/// Counts reported at the end of a sync run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub products: usize,
    pub variants: usize,
    pub locations: usize,
    pub active_locations: usize,
    pub inventory: usize,
    pub sales: usize,
    pub identity_collisions: usize,
    pub discards: DiscardLog,
    /// Resources whose walk ended on a GraphQL error.
    pub incomplete: Vec<&'static str>,
}

/// Result of a sync run.
#[derive(Debug, Clone)]
pub struct SyncOutput {
    pub document: SyncDocument,
    pub summary: SyncSummary,
}

/// Sync every resource and assemble the document.
///
/// # Errors
///
/// Returns `SyncError::Shopify` when a request fails after retries and
/// `SyncError::QueryAborted` on GraphQL errors under
/// [`QueryErrorPolicy::Abort`].
#[instrument(skip_all, fields(days_back = options.orders_days_back))]
pub async fn run_sync<T: Transport>(
    fetcher: &ShopifyFetcher<T>,
    options: &SyncOptions,
) -> Result<SyncOutput, SyncError> {
    let collector = Collector::new(fetcher, options.query_error_policy);
    let mut summary = SyncSummary::default();
    let mut discards = DiscardLog::new();

    info!("Syncing products");
    let catalog = collector.collect_products().await?;
    note_incomplete(&mut summary, "products", catalog.report);
    let identity = IdentityMap::from_variants(&catalog.variants);

    info!("Syncing locations");
    let locations = collector.collect_locations().await?;
    note_incomplete(&mut summary, "locations", locations.report);

    info!("Syncing inventory");
    let stamp = SnapshotStamp::at((options.clock)());
    let inventory = collector
        .collect_inventory(&locations.rows, &identity, stamp, &mut discards)
        .await?;
    note_incomplete(&mut summary, "inventory", inventory.report);

    info!(days_back = options.orders_days_back, "Syncing orders");
    let since = (options.clock)() - Duration::days(i64::from(options.orders_days_back));
    let sales = collector.collect_sales(since, &mut discards).await?;
    note_incomplete(&mut summary, "orders", sales.report);

    summary.products = catalog.products.len();
    summary.variants = catalog.variants.len();
    summary.locations = locations.rows.len();
    summary.active_locations = locations.rows.iter().filter(|l| l.active).count();
    summary.inventory = inventory.rows.len();
    summary.sales = sales.rows.len();
    summary.identity_collisions = identity.collisions();
    summary.discards = discards;

    info!(
        products = summary.products,
        variants = summary.variants,
        locations = summary.locations,
        active_locations = summary.active_locations,
        inventory = summary.inventory,
        sales = summary.sales,
        identity_collisions = summary.identity_collisions,
        discarded = %summary.discards,
        "Sync complete"
    );
    if !summary.incomplete.is_empty() {
        warn!(resources = ?summary.incomplete, "Some resources ended early on GraphQL errors");
    }

    Ok(SyncOutput {
        document: SyncDocument {
            products: catalog.products,
            variants: catalog.variants,
            locations: locations.rows,
            inventory: inventory.rows,
            sales: sales.rows,
        },
        summary,
    })
}

fn note_incomplete(summary: &mut SyncSummary, resource: &'static str, report: WalkReport) {
    if report.stopped_on_query_error {
        summary.incomplete.push(resource);
    }
}
