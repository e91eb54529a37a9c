//! Newtype IDs for type-safe entity references.
//!
//! Shopify identifies everything with GIDs (`gid://shopify/Product/123`).
//! The backup tables store only the trailing numeric segment, as a string.
//! Use the `define_id!` macro to create wrappers that keep product, variant,
//! location and order ids from being mixed up.

use chrono::NaiveDate;

/// Macro to define a type-safe string ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `Default`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - Conversion methods: `new()`, `from_gid()`, `as_str()`, `is_empty()`
/// - `From<String>` and `From<&str>` implementations
/// - `sqlx` `Type`, `Encode`, and `Decode` implementations (with `postgres` feature)
///
/// # Example
///
/// ```rust
/// # use shopify_backup_core::define_id;
/// define_id!(ProductId);
/// define_id!(OrderId);
///
/// let product_id = ProductId::from_gid("gid://shopify/Product/42");
/// assert_eq!(product_id.as_str(), "42");
///
/// // These are different types, so this won't compile:
/// // let _: OrderId = product_id;
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            Default,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new ID from a short id string.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Create an ID from a GID, keeping only the last path segment.
            #[must_use]
            pub fn from_gid(gid: &str) -> Self {
                Self($crate::gid::gid_to_id(gid).to_string())
            }

            /// Get the underlying id string.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Whether the id is empty (the source record had no GID).
            #[must_use]
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::Type<::sqlx::Postgres> for $name {
            fn type_info() -> ::sqlx::postgres::PgTypeInfo {
                <String as ::sqlx::Type<::sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &::sqlx::postgres::PgTypeInfo) -> bool {
                <String as ::sqlx::Type<::sqlx::Postgres>>::compatible(ty)
            }
        }

        #[cfg(feature = "postgres")]
        impl<'r> ::sqlx::Decode<'r, ::sqlx::Postgres> for $name {
            fn decode(
                value: ::sqlx::postgres::PgValueRef<'r>,
            ) -> ::core::result::Result<Self, ::sqlx::error::BoxDynError> {
                let id = <String as ::sqlx::Decode<::sqlx::Postgres>>::decode(value)?;
                Ok(Self(id))
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::Encode<'_, ::sqlx::Postgres> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut ::sqlx::postgres::PgArgumentBuffer,
            ) -> ::std::result::Result<::sqlx::encode::IsNull, ::sqlx::error::BoxDynError> {
                <String as ::sqlx::Encode<::sqlx::Postgres>>::encode_by_ref(&self.0, buf)
            }
        }
    };
}

// Define Shopify entity IDs
define_id!(ProductId);
define_id!(VariantId);
define_id!(InventoryItemId);
define_id!(LocationId);
define_id!(OrderId);
define_id!(LineItemId);

// Synthetic keys of the fact tables
define_id!(SnapshotId);
define_id!(SaleId);

impl SnapshotId {
    /// Key of an inventory snapshot: `{variant_id}_{location_id}_{YYYY-MM-DD}`.
    ///
    /// Unique per variant, location and day, so re-running the same day
    /// produces the same keys.
    #[must_use]
    pub fn for_inventory(variant_id: &VariantId, location_id: &LocationId, date: NaiveDate) -> Self {
        Self(format!("{variant_id}_{location_id}_{}", date.format("%Y-%m-%d")))
    }
}

impl SaleId {
    /// Key of a sale line item: `{order_id}_{line_item_id}`.
    #[must_use]
    pub fn for_line_item(order_id: &OrderId, line_item_id: &LineItemId) -> Self {
        Self(format!("{order_id}_{line_item_id}"))
    }
}
