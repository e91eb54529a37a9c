//! Cursor-paginated collection of each synced resource.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use shopify_backup_core::{
    InventoryItemId, InventorySnapshot, LocationRow, ProductId, ProductRow, SaleLineItem, VariantRow,
};
use tracing::{debug, info, instrument, warn};

use super::discard::{DiscardLog, DiscardReason};
use super::identity::IdentityMap;
use super::snapshot::{self, SnapshotStamp};
use super::{QueryErrorPolicy, SyncError};
use crate::shopify::queries::{
    self, InventoryLevelsVariables, Operation, OrdersVariables, PageVariables,
};
use crate::shopify::types::{
    InventoryLevelsData, LocationsData, OrdersData, PageInfo, ProductsData,
};
use crate::shopify::{FetchOutcome, ShopifyFetcher, Transport, format_graphql_errors};

/// Pause between consecutive pages of one resource.
pub const PAGE_DELAY: Duration = Duration::from_millis(250);

/// How one resource walk went.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkReport {
    /// Pages that returned data.
    pub pages: u32,
    /// The walk ended on a GraphQL error rather than the last page.
    pub stopped_on_query_error: bool,
}

impl WalkReport {
    fn absorb(&mut self, other: Self) {
        self.pages += other.pages;
        self.stopped_on_query_error |= other.stopped_on_query_error;
    }
}

/// Products and their flattened variants.
#[derive(Debug, Clone, Default)]
pub struct ProductCatalog {
    pub products: Vec<ProductRow>,
    pub variants: Vec<VariantRow>,
    pub report: WalkReport,
}

/// Rows of one resource plus how the walk went.
#[derive(Debug, Clone, Default)]
pub struct Collected<R> {
    pub rows: Vec<R>,
    pub report: WalkReport,
}

/// Drives paginated fetches for every synced resource.
pub struct Collector<'a, T> {
    fetcher: &'a ShopifyFetcher<T>,
    policy: QueryErrorPolicy,
    page_delay: Duration,
}

impl<'a, T: Transport> Collector<'a, T> {
    #[must_use]
    pub const fn new(fetcher: &'a ShopifyFetcher<T>, policy: QueryErrorPolicy) -> Self {
        Self {
            fetcher,
            policy,
            page_delay: PAGE_DELAY,
        }
    }

    /// Walk every page of `operation`.
    ///
    /// `variables` builds the variables for a cursor (`None` on the first
    /// page). `on_page` consumes a page of data and returns its pagination
    /// state, or `None` when the connection itself was absent. The walk ends
    /// on the last page, on a missing cursor, on no data, or on a query error
    /// (which fails the walk under [`QueryErrorPolicy::Abort`]).
    async fn walk<D, V>(
        &self,
        resource: &'static str,
        operation: &Operation,
        mut variables: impl FnMut(Option<String>) -> V,
        mut on_page: impl FnMut(D) -> Option<PageInfo>,
    ) -> Result<WalkReport, SyncError>
    where
        D: DeserializeOwned,
        V: Serialize + Sync,
    {
        let mut report = WalkReport::default();
        let mut cursor: Option<String> = None;

        loop {
            let vars = variables(cursor.take());
            match self.fetcher.fetch::<V, D>(operation, &vars).await? {
                FetchOutcome::Data(data) => {
                    report.pages += 1;
                    debug!(resource, page = report.pages, "Fetched page");

                    let Some(next) = on_page(data).and_then(PageInfo::next_cursor) else {
                        break;
                    };
                    cursor = Some(next);
                    tokio::time::sleep(self.page_delay).await;
                }
                FetchOutcome::NoData => {
                    debug!(resource, "No data returned, ending walk");
                    break;
                }
                FetchOutcome::QueryError(errors) => {
                    if self.policy == QueryErrorPolicy::Abort {
                        return Err(SyncError::QueryAborted { resource, errors });
                    }
                    warn!(
                        resource,
                        errors = %format_graphql_errors(&errors),
                        "GraphQL errors, skipping the rest of this resource"
                    );
                    report.stopped_on_query_error = true;
                    break;
                }
            }
        }

        Ok(report)
    }

    /// Every product, with up to 100 variants each.
    ///
    /// # Errors
    ///
    /// Returns `SyncError` if a fetch fails after retries, or on a GraphQL
    /// error under [`QueryErrorPolicy::Abort`].
    #[instrument(skip(self))]
    pub async fn collect_products(&self) -> Result<ProductCatalog, SyncError> {
        let mut products = Vec::new();
        let mut variants = Vec::new();

        let report = self
            .walk(
                "products",
                &queries::SYNC_PRODUCTS,
                |cursor| PageVariables { cursor },
                |data: ProductsData| {
                    let connection = data.products?;
                    let page_info = connection.page_info.clone();
                    for node in connection.into_nodes() {
                        let product = snapshot::product_row(&node);
                        let product_id: &ProductId = &product.product_id;
                        if let Some(nested) = &node.variants {
                            variants.extend(
                                nested
                                    .edges
                                    .iter()
                                    .map(|edge| snapshot::variant_row(product_id, &edge.node)),
                            );
                        }
                        products.push(product);
                    }
                    page_info
                },
            )
            .await?;

        info!(
            products = products.len(),
            variants = variants.len(),
            pages = report.pages,
            "Synced products"
        );
        Ok(ProductCatalog {
            products,
            variants,
            report,
        })
    }

    /// Every location, in a single request.
    ///
    /// # Errors
    ///
    /// Same as [`Self::collect_products`].
    #[instrument(skip(self))]
    pub async fn collect_locations(&self) -> Result<Collected<LocationRow>, SyncError> {
        let mut rows = Vec::new();

        let report = self
            .walk(
                "locations",
                &queries::SYNC_LOCATIONS,
                |cursor| PageVariables { cursor },
                |data: LocationsData| {
                    let connection = data.locations?;
                    let page_info = connection.page_info.clone();
                    rows.extend(connection.into_nodes().map(|node| snapshot::location_row(&node)));
                    page_info
                },
            )
            .await?;

        info!(locations = rows.len(), "Synced locations");
        Ok(Collected { rows, report })
    }

    /// Inventory snapshots of every active location.
    ///
    /// Levels whose item does not resolve through `identity` are dropped and
    /// counted in `discards`.
    ///
    /// # Errors
    ///
    /// Same as [`Self::collect_products`].
    #[instrument(skip_all, fields(locations = locations.len(), stamp = %stamp.date))]
    pub async fn collect_inventory(
        &self,
        locations: &[LocationRow],
        identity: &IdentityMap,
        stamp: SnapshotStamp,
        discards: &mut DiscardLog,
    ) -> Result<Collected<InventorySnapshot>, SyncError> {
        let mut rows = Vec::new();
        let mut report = WalkReport::default();

        for location in locations.iter().filter(|location| location.active) {
            let before = rows.len();
            let location_report = self
                .walk(
                    "inventory",
                    &queries::SYNC_INVENTORY_LEVELS,
                    |cursor| InventoryLevelsVariables {
                        location_id: location.location_gid.clone(),
                        cursor,
                    },
                    |data: InventoryLevelsData| {
                        let connection = data.location?.inventory_levels?;
                        let page_info = connection.page_info.clone();
                        for level in connection.into_nodes() {
                            let Some(item) = &level.item else {
                                discards.record(DiscardReason::LevelWithoutItem);
                                continue;
                            };
                            let item_id = InventoryItemId::from_gid(item.id.as_deref().unwrap_or_default());
                            let Some(variant_id) = identity.resolve(&item_id) else {
                                discards.record(DiscardReason::UnmappedInventoryItem);
                                continue;
                            };
                            rows.push(snapshot::inventory_snapshot(
                                &level,
                                variant_id,
                                &location.location_id,
                                stamp,
                            ));
                        }
                        page_info
                    },
                )
                .await?;

            debug!(
                location_id = %location.location_id,
                name = location.name.as_deref().unwrap_or("Unknown"),
                records = rows.len() - before,
                "Synced location inventory"
            );
            report.absorb(location_report);
        }

        info!(records = rows.len(), "Synced inventory");
        Ok(Collected { rows, report })
    }

    /// Sale line items of orders created at or after `since`.
    ///
    /// Test and cancelled orders, and line items without a variant, are
    /// dropped and counted in `discards`.
    ///
    /// # Errors
    ///
    /// Same as [`Self::collect_products`].
    #[instrument(skip_all, fields(since = %since))]
    pub async fn collect_sales(
        &self,
        since: DateTime<Utc>,
        discards: &mut DiscardLog,
    ) -> Result<Collected<SaleLineItem>, SyncError> {
        let filter = queries::orders_filter(since);
        let mut rows = Vec::new();

        let report = self
            .walk(
                "orders",
                &queries::SYNC_ORDERS,
                |cursor| OrdersVariables {
                    query: filter.clone(),
                    cursor,
                },
                |data: OrdersData| {
                    let connection = data.orders?;
                    let page_info = connection.page_info.clone();
                    for order in connection.into_nodes() {
                        if order.test.unwrap_or(false) {
                            discards.record(DiscardReason::TestOrder);
                            continue;
                        }
                        if order.cancelled_at.is_some() {
                            discards.record(DiscardReason::CancelledOrder);
                            continue;
                        }
                        let Some(line_items) = &order.line_items else {
                            continue;
                        };
                        for edge in &line_items.edges {
                            match snapshot::sale_line_item(&order, &edge.node) {
                                Some(row) => rows.push(row),
                                None => discards.record(DiscardReason::LineItemWithoutVariant),
                            }
                        }
                    }
                    page_info
                },
            )
            .await?;

        info!(sales = rows.len(), pages = report.pages, "Synced orders");
        Ok(Collected { rows, report })
    }
}
