//! Core types for the Shopify backup pipeline.
//!
//! Every record here is an immutable snapshot: built once during sync,
//! serialized into the sync document, and read back unchanged by the loader.

pub mod document;
pub mod gid;
pub mod id;
pub mod inventory;
pub mod location;
pub mod product;
pub mod sale;
pub mod status;

pub use document::SyncDocument;
pub use gid::gid_to_id;
pub use id::*;
pub use inventory::InventorySnapshot;
pub use location::LocationRow;
pub use product::{ProductRow, VariantRow};
pub use sale::SaleLineItem;
pub use status::ProductStatus;
