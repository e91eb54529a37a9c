//! Status enums for catalog entities.

use serde::{Deserialize, Serialize};

/// Product publication status.
///
/// Maps to Shopify's `ProductStatus` values. Values this build does not know
/// about are kept verbatim in [`ProductStatus::Other`] so the warehouse
/// stores what Shopify sent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(from = "String", into = "String")]
pub enum ProductStatus {
    #[default]
    Active,
    Draft,
    Archived,
    Unlisted,
    Other(String),
}

impl ProductStatus {
    /// The status as stored in the warehouse.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Active => "ACTIVE",
            Self::Draft => "DRAFT",
            Self::Archived => "ARCHIVED",
            Self::Unlisted => "UNLISTED",
            Self::Other(raw) => raw,
        }
    }
}

impl From<String> for ProductStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "ACTIVE" => Self::Active,
            "DRAFT" => Self::Draft,
            "ARCHIVED" => Self::Archived,
            "UNLISTED" => Self::Unlisted,
            _ => Self::Other(raw),
        }
    }
}

impl From<ProductStatus> for String {
    fn from(status: ProductStatus) -> Self {
        match status {
            ProductStatus::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
