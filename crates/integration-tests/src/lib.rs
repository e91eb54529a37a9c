//! Integration tests for the Shopify backup pipeline.
//!
//! # Running Tests
//!
//! ```bash
//! # Offline end-to-end runs (scripted Admin API, in-memory warehouse)
//! cargo test -p shopify-backup-integration-tests
//!
//! # Against a real PostgreSQL 15+ warehouse
//! WAREHOUSE_DATABASE_URL=postgres://localhost/backup_test \
//!     cargo test -p shopify-backup-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `backup_run` - sync, sync document and load wired together
//! - `postgres_warehouse` - DDL, staging and `MERGE` on a live database
