//! Table layouts and DDL.
//!
//! Column lists here are the single source for `CREATE TABLE`, `INSERT`
//! column order and the `MERGE` update list.

use chrono::{Datelike, Months, NaiveDate};
use pg_escape::quote_identifier;

use super::{DateBounds, Dimension, Fact};

/// One column of a warehouse table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub sql_type: &'static str,
    pub not_null: bool,
}

const fn col(name: &'static str, sql_type: &'static str) -> Column {
    Column {
        name,
        sql_type,
        not_null: false,
    }
}

const fn required(name: &'static str, sql_type: &'static str) -> Column {
    Column {
        name,
        sql_type,
        not_null: true,
    }
}

pub const PRODUCTS: &[Column] = &[
    required("product_id", "TEXT"),
    col("title", "TEXT"),
    col("vendor", "TEXT"),
    col("status", "TEXT"),
    col("created_at", "TIMESTAMPTZ"),
    col("updated_at", "TIMESTAMPTZ"),
];

pub const VARIANTS: &[Column] = &[
    required("variant_id", "TEXT"),
    col("product_id", "TEXT"),
    col("sku", "TEXT"),
    col("title", "TEXT"),
    col("price", "NUMERIC"),
    col("inventory_item_id", "TEXT"),
];

pub const LOCATIONS: &[Column] = &[
    required("location_id", "TEXT"),
    col("name", "TEXT"),
    col("active", "BOOLEAN"),
];

/// Supplier reference data, maintained outside the backup run.
pub const VENDORS_TABLE: &str = "vendors";

pub const VENDORS: &[Column] = &[
    required("vendor_id", "BIGINT"),
    col("vendor_name", "TEXT"),
    col("lead_time_days", "BIGINT"),
    col("moq", "BIGINT"),
    col("pack_size", "BIGINT"),
];

pub const INVENTORY_SNAPSHOTS: &[Column] = &[
    required("snapshot_id", "TEXT"),
    col("variant_id", "TEXT"),
    col("sku", "TEXT"),
    col("location_id", "TEXT"),
    col("available_qty", "BIGINT"),
    col("incoming_qty", "BIGINT"),
    col("committed_qty", "BIGINT"),
    required("snapshot_date", "DATE"),
    col("snapshot_timestamp", "TIMESTAMPTZ"),
];

pub const SALES_HISTORY: &[Column] = &[
    required("sale_id", "TEXT"),
    col("order_id", "TEXT"),
    col("order_name", "TEXT"),
    col("variant_id", "TEXT"),
    col("sku", "TEXT"),
    col("product_title", "TEXT"),
    col("quantity_sold", "BIGINT"),
    required("sale_date", "DATE"),
    col("sale_timestamp", "TIMESTAMPTZ"),
    col("vendor", "TEXT"),
];

/// `"schema"."table"`
#[must_use]
pub fn qualified(schema: &str, table: &str) -> String {
    format!("{}.{}", quote_identifier(schema), quote_identifier(table))
}

/// Comma-separated quoted column names.
#[must_use]
pub fn column_list(columns: &[Column]) -> String {
    columns
        .iter()
        .map(|c| quote_identifier(c.name).into_owned())
        .collect::<Vec<_>>()
        .join(", ")
}

fn column_defs(columns: &[Column], enforce_not_null: bool) -> String {
    columns
        .iter()
        .map(|c| {
            let null = if enforce_not_null && c.not_null { " NOT NULL" } else { "" };
            format!("{} {}{null}", quote_identifier(c.name), c.sql_type)
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Every statement needed to create the schema and its tables.
///
/// All statements are idempotent.
#[must_use]
pub fn create_statements(schema: &str) -> Vec<String> {
    let mut statements = vec![format!(
        "CREATE SCHEMA IF NOT EXISTS {}",
        quote_identifier(schema)
    )];

    for dimension in [Dimension::Products, Dimension::Variants, Dimension::Locations] {
        statements.push(format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            qualified(schema, dimension.table()),
            column_defs(dimension.columns(), true)
        ));
    }
    statements.push(format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        qualified(schema, VENDORS_TABLE),
        column_defs(VENDORS, true)
    ));

    for fact in [Fact::Inventory, Fact::Sales] {
        statements.push(format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            qualified(schema, fact.staging_table()),
            column_defs(fact.columns(), false)
        ));
        statements.push(format!(
            "CREATE TABLE IF NOT EXISTS {} ({}, PRIMARY KEY ({}, {})) PARTITION BY RANGE ({})",
            qualified(schema, fact.backup_table()),
            column_defs(fact.columns(), true),
            quote_identifier(fact.key_column()),
            quote_identifier(fact.date_column()),
            quote_identifier(fact.date_column())
        ));
        statements.push(format!(
            "CREATE INDEX IF NOT EXISTS {} ON {} ({})",
            quote_identifier(&format!("{}_sku_idx", fact.backup_table())),
            qualified(schema, fact.backup_table()),
            quote_identifier("sku")
        ));
    }

    statements
}

/// A monthly partition of a backup table: `[from, to)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthPartition {
    pub suffix: String,
    pub from: NaiveDate,
    pub to: NaiveDate,
}

/// Monthly partitions covering every date in `bounds`.
#[must_use]
pub fn month_partitions(bounds: DateBounds) -> Vec<MonthPartition> {
    let mut partitions = Vec::new();
    let Some(mut from) = bounds.min.with_day(1) else {
        return partitions;
    };

    while from <= bounds.max {
        let Some(to) = from.checked_add_months(Months::new(1)) else {
            break;
        };
        partitions.push(MonthPartition {
            suffix: format!("p{}", from.format("%Y%m")),
            from,
            to,
        });
        from = to;
    }

    partitions
}

/// `CREATE TABLE IF NOT EXISTS` for one monthly partition of `fact`.
#[must_use]
pub fn create_partition_statement(schema: &str, fact: Fact, partition: &MonthPartition) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {} PARTITION OF {} FOR VALUES FROM ('{}') TO ('{}')",
        qualified(
            schema,
            &format!("{}_{}", fact.backup_table(), partition.suffix)
        ),
        qualified(schema, fact.backup_table()),
        partition.from.format("%Y-%m-%d"),
        partition.to.format("%Y-%m-%d")
    )
}
