//! Shopify Backup Core - Shared row types.
//!
//! This crate provides the records exchanged between the two halves of the
//! backup pipeline:
//! - `sync` - pulls products, locations, inventory and orders from Shopify
//! - `load` - refreshes dimension tables and merges facts into backup tables
//!
//! # Architecture
//!
//! The core crate contains only types and pure helpers - no I/O, no database
//! access, no HTTP clients. The `postgres` feature adds `sqlx` encoding for
//! the id newtypes so the warehouse layer can bind them directly.
//!
//! # Modules
//!
//! - [`types`] - Newtype ids, row records and the intermediate sync document

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
