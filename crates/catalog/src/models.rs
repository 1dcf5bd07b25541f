//! Wire and domain models for the API Explorer catalog.
//!
//! The remote service is loose about which fields it sends, so every string field defaults to
//! empty and every list defaults to empty rather than failing deserialization. An explicit
//! `null` is treated the same as an absent key.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A single cloud product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    /// Opaque product identifier required by every per-product endpoint.
    #[serde(rename = "productshort", default, deserialize_with = "null_as_default")]
    pub short_code: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Presentation-only grouping of products (compute, storage, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductGroup {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub products: Vec<Product>,
}

/// Body of `GET v5/products`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductsResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub groups: Vec<ProductGroup>,
}

/// One row of a product's API listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiSummary {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    /// Stable identifier used to fetch the API detail.
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub alias_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub method: String,
    /// Human-readable label; user input is matched against this.
    #[serde(default, deserialize_with = "null_as_default")]
    pub summary: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub product_short: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub info_version: String,
}

/// One page of `GET v3/apis`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiPage {
    /// Server-reported total number of APIs for the product.
    #[serde(default, deserialize_with = "null_as_default")]
    pub count: usize,
    #[serde(default, deserialize_with = "null_as_default")]
    pub api_basic_infos: Vec<ApiSummary>,
}

/// Everything resolved from a `(product name, interface name)` pair.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedApi {
    pub product_name: String,
    pub product_short: String,
    pub summary: ApiSummary,
    /// Raw detail document as returned by the service (key order preserved).
    pub detail: Value,
}

impl ResolvedApi {
    /// Name of the API as reported by the detail document, falling back to the listing name.
    #[must_use]
    pub fn detail_name(&self) -> &str {
        self.detail
            .get("name")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.summary.name)
    }
}
