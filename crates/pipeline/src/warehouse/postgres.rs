//! `PostgreSQL` warehouse.
//!
//! The configured project names the database and the dataset names the
//! schema. Backup tables are range-partitioned by month; partitions are
//! created on demand right before a merge touches them. `MERGE` needs
//! `PostgreSQL` 15 or newer.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use pg_escape::quote_identifier;
use secrecy::{ExposeSecret, SecretString};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use tracing::{debug, instrument};

use super::rows::WarehouseRow;
use super::schema::{
    column_list, create_partition_statement, create_statements, month_partitions, qualified,
};
use super::{
    DateBounds, DimensionRows, Fact, FactRows, MergeOutcome, Warehouse, WarehouseError,
};
use crate::config::WarehouseConfig;

/// Rows per `INSERT`, well below the bind parameter limit for every table.
const INSERT_CHUNK: usize = 1_000;

/// Create a `PostgreSQL` connection pool.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(4)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Warehouse backed by one `PostgreSQL` schema.
#[derive(Debug, Clone)]
pub struct PgWarehouse {
    pool: PgPool,
    schema: String,
}

impl PgWarehouse {
    /// Connect using the warehouse configuration.
    ///
    /// # Errors
    ///
    /// Returns `WarehouseError::Config` if the connection URL cannot be
    /// built and `WarehouseError::Database` if connecting fails.
    pub async fn connect(config: &WarehouseConfig) -> Result<Self, WarehouseError> {
        let pool = create_pool(&config.connect_url()?).await?;
        Ok(Self::new(pool, &config.dataset))
    }

    #[must_use]
    pub fn new(pool: PgPool, schema: &str) -> Self {
        Self {
            pool,
            schema: schema.to_string(),
        }
    }

    #[must_use]
    pub fn schema(&self) -> &str {
        &self.schema
    }

    fn table(&self, name: &str) -> String {
        qualified(&self.schema, name)
    }

    /// Truncate `table` and insert `rows`, in one transaction.
    async fn replace_rows<R: WarehouseRow>(
        &self,
        table: &str,
        rows: &[R],
    ) -> Result<u64, WarehouseError> {
        let table = self.table(table);
        let mut tx = self.pool.begin().await?;

        sqlx::query(&format!("TRUNCATE TABLE {table}"))
            .execute(&mut *tx)
            .await?;
        let written = insert_rows(&mut tx, &table, rows).await?;

        tx.commit().await?;
        Ok(written)
    }
}

async fn insert_rows<R: WarehouseRow>(
    tx: &mut Transaction<'_, Postgres>,
    table: &str,
    rows: &[R],
) -> Result<u64, WarehouseError> {
    let mut written = 0;

    for chunk in rows.chunks(INSERT_CHUNK) {
        let mut builder: QueryBuilder<'_, Postgres> = QueryBuilder::new(format!(
            "INSERT INTO {table} ({}) ",
            column_list(R::COLUMNS)
        ));
        builder.push_values(chunk, |mut row, record| record.bind_into(&mut row));
        written += builder.build().execute(&mut **tx).await?.rows_affected();
    }

    Ok(written)
}

/// `MERGE` of staged rows within `$1..=$2` into the backup table of `fact`.
///
/// Staged duplicates collapse to the latest timestamp; on equal timestamps
/// the row staged last wins, since staging is truncated before every insert.
/// Key and date are never updated.
#[must_use]
pub fn merge_statement(schema: &str, fact: Fact) -> String {
    let key = quote_identifier(fact.key_column());
    let date = quote_identifier(fact.date_column());
    let timestamp = quote_identifier(fact.timestamp_column());
    let columns = column_list(fact.columns());

    let updates = fact
        .columns()
        .iter()
        .filter(|c| c.name != fact.key_column() && c.name != fact.date_column())
        .map(|c| {
            let name = quote_identifier(c.name);
            format!("{name} = s.{name}")
        })
        .collect::<Vec<_>>()
        .join(", ");

    let values = fact
        .columns()
        .iter()
        .map(|c| format!("s.{}", quote_identifier(c.name)))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "MERGE INTO {backup} AS t \
         USING (SELECT DISTINCT ON ({key}, {date}) {columns} FROM {staging} \
         WHERE {date} BETWEEN $1 AND $2 \
         ORDER BY {key}, {date}, {timestamp} DESC, ctid DESC) AS s \
         ON t.{key} = s.{key} AND t.{date} = s.{date} AND t.{date} BETWEEN $1 AND $2 \
         WHEN MATCHED THEN UPDATE SET {updates} \
         WHEN NOT MATCHED THEN INSERT ({columns}) VALUES ({values})",
        backup = qualified(schema, fact.backup_table()),
        staging = qualified(schema, fact.staging_table()),
    )
}

/// Number of distinct staged keys within `$1..=$2` already in the backup.
#[must_use]
pub fn matched_count_statement(schema: &str, fact: Fact) -> String {
    let key = quote_identifier(fact.key_column());
    let date = quote_identifier(fact.date_column());

    format!(
        "SELECT COUNT(*) FROM (SELECT DISTINCT {key}, {date} FROM {staging} \
         WHERE {date} BETWEEN $1 AND $2) AS s \
         JOIN {backup} AS t ON t.{key} = s.{key} AND t.{date} = s.{date} \
         AND t.{date} BETWEEN $1 AND $2",
        backup = qualified(schema, fact.backup_table()),
        staging = qualified(schema, fact.staging_table()),
    )
}

#[async_trait]
impl Warehouse for PgWarehouse {
    #[instrument(skip(self), fields(schema = %self.schema))]
    async fn ensure_tables(&self) -> Result<(), WarehouseError> {
        let mut tx = self.pool.begin().await?;
        for statement in create_statements(&self.schema) {
            debug!(%statement, "Ensuring table");
            sqlx::query(&statement).execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    #[instrument(skip_all, fields(table = rows.dimension().table(), rows = rows.len()))]
    async fn replace_dimension(&self, rows: DimensionRows<'_>) -> Result<u64, WarehouseError> {
        let table = rows.dimension().table();
        match rows {
            DimensionRows::Products(rows) => self.replace_rows(table, rows).await,
            DimensionRows::Variants(rows) => self.replace_rows(table, rows).await,
            DimensionRows::Locations(rows) => self.replace_rows(table, rows).await,
        }
    }

    #[instrument(skip_all, fields(table = rows.fact().staging_table(), rows = rows.len()))]
    async fn stage_facts(&self, rows: FactRows<'_>) -> Result<u64, WarehouseError> {
        let table = rows.fact().staging_table();
        match rows {
            FactRows::Inventory(rows) => self.replace_rows(table, rows).await,
            FactRows::Sales(rows) => self.replace_rows(table, rows).await,
        }
    }

    #[instrument(skip(self))]
    async fn clear_staging(&self, fact: Fact) -> Result<(), WarehouseError> {
        sqlx::query(&format!(
            "TRUNCATE TABLE {}",
            self.table(fact.staging_table())
        ))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn staged_bounds(&self, fact: Fact) -> Result<Option<DateBounds>, WarehouseError> {
        let date = quote_identifier(fact.date_column());
        let (min, max): (Option<NaiveDate>, Option<NaiveDate>) = sqlx::query_as(&format!(
            "SELECT MIN({date}), MAX({date}) FROM {}",
            self.table(fact.staging_table())
        ))
        .fetch_one(&self.pool)
        .await?;

        Ok(min.zip(max).map(|(min, max)| DateBounds { min, max }))
    }

    #[instrument(skip(self), fields(min = %bounds.min, max = %bounds.max))]
    async fn merge_staged(
        &self,
        fact: Fact,
        bounds: DateBounds,
    ) -> Result<MergeOutcome, WarehouseError> {
        let mut tx = self.pool.begin().await?;

        for partition in month_partitions(bounds) {
            let statement = create_partition_statement(&self.schema, fact, &partition);
            debug!(%statement, "Ensuring partition");
            sqlx::query(&statement).execute(&mut *tx).await?;
        }

        let matched: i64 = sqlx::query_scalar(&matched_count_statement(&self.schema, fact))
            .bind(bounds.min)
            .bind(bounds.max)
            .fetch_one(&mut *tx)
            .await?;

        let affected = sqlx::query(&merge_statement(&self.schema, fact))
            .bind(bounds.min)
            .bind(bounds.max)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;

        let updated = u64::try_from(matched).unwrap_or_default();
        Ok(MergeOutcome {
            updated,
            inserted: affected.saturating_sub(updated),
        })
    }
}
