//! YAML snapshot documents and the writer that places them in the output directory.
//!
//! Every document starts with a `metadata` header. Field order follows the struct definitions
//! below, detail documents keep the key order returned by the service, and non-ASCII text is
//! written unescaped.

use crate::error::{Result, SnapshotError};
use apiscan_catalog::{ApiSummary, ProductGroup, ResolvedApi};
use apiscan_schema::normalize_detail;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

pub const PRODUCTS_FILE: &str = "huawei_cloud_products.yml";
pub const BATCH_FILE: &str = "multiple_apis.yml";
pub const GENERATOR: &str = "apiscan";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Metadata {
    pub title: String,
    pub description: String,
    /// RFC 3339, UTC.
    pub generated_at: String,
    pub generator: &'static str,
    pub version: &'static str,
}

impl Metadata {
    #[must_use]
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            generator: GENERATOR,
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

#[derive(Serialize)]
struct Counted<T> {
    count: usize,
    items: Vec<T>,
}

impl<T> From<Vec<T>> for Counted<T> {
    fn from(items: Vec<T>) -> Self {
        Self {
            count: items.len(),
            items,
        }
    }
}

#[derive(Serialize)]
struct ProductRow<'a> {
    name: &'a str,
    product_short: &'a str,
    description: &'a str,
    group: &'a str,
}

#[derive(Serialize)]
struct ProductsDocument<'a> {
    metadata: Metadata,
    products: Counted<ProductRow<'a>>,
}

#[derive(Serialize)]
struct ProductHeader<'a> {
    name: &'a str,
    short: &'a str,
    api_count: usize,
}

#[derive(Serialize)]
struct ApiListDocument<'a> {
    metadata: Metadata,
    product: ProductHeader<'a>,
    apis: &'a [ApiSummary],
}

#[derive(Serialize)]
struct ProductRef<'a> {
    name: &'a str,
    short: &'a str,
}

#[derive(Serialize)]
struct ApiEntry<'a> {
    product: ProductRef<'a>,
    basic_info: &'a ApiSummary,
    detail: Value,
}

impl<'a> From<&'a ResolvedApi> for ApiEntry<'a> {
    fn from(api: &'a ResolvedApi) -> Self {
        Self {
            product: ProductRef {
                name: &api.product_name,
                short: &api.product_short,
            },
            basic_info: &api.summary,
            detail: normalize_detail(&api.detail),
        }
    }
}

#[derive(Serialize)]
struct ApiDetailDocument<'a> {
    metadata: Metadata,
    api: ApiEntry<'a>,
}

#[derive(Serialize)]
struct BatchDocument<'a> {
    metadata: Metadata,
    apis: Counted<ApiEntry<'a>>,
}

/// Replace characters that are awkward in file names (space, `/`, `-`) with `_`.
#[must_use]
pub fn safe_file_component(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return "unknown".to_string();
    }
    trimmed
        .chars()
        .map(|c| match c {
            ' ' | '/' | '-' => '_',
            other => other,
        })
        .collect()
}

/// File name of an API detail snapshot: `<short>_<detail name>.yml`.
#[must_use]
pub fn api_detail_file_name(api: &ResolvedApi) -> String {
    format!(
        "{}_{}.yml",
        safe_file_component(&api.product_short),
        safe_file_component(api.detail_name())
    )
}

/// Writes snapshot documents into one output directory, creating it on first use.
#[derive(Debug, Clone)]
pub struct SnapshotWriter {
    output_dir: PathBuf,
}

impl SnapshotWriter {
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Write the whole product catalog to [`PRODUCTS_FILE`].
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_products(&self, groups: &[ProductGroup]) -> Result<PathBuf> {
        let rows: Vec<ProductRow<'_>> = groups
            .iter()
            .flat_map(|g| {
                g.products.iter().map(move |p| ProductRow {
                    name: &p.name,
                    product_short: &p.short_code,
                    description: p.description.as_deref().unwrap_or_default(),
                    group: &g.name,
                })
            })
            .collect();

        let doc = ProductsDocument {
            metadata: Metadata::new(
                "Huawei Cloud product catalog",
                "Every product and service listed by the Huawei Cloud API Explorer",
            ),
            products: rows.into(),
        };
        self.write(PRODUCTS_FILE, &doc)
    }

    /// Write one product's API listing to `<short>_apis.yml`.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_api_list(
        &self,
        product_name: &str,
        product_short: &str,
        apis: &[ApiSummary],
    ) -> Result<PathBuf> {
        let doc = ApiListDocument {
            metadata: Metadata::new(
                format!("{product_name} APIs"),
                format!("All API operations of the Huawei Cloud product {product_name}"),
            ),
            product: ProductHeader {
                name: product_name,
                short: product_short,
                api_count: apis.len(),
            },
            apis,
        };
        let file = format!("{}_apis.yml", safe_file_component(product_short));
        self.write(&file, &doc)
    }

    /// Write one API with its normalized detail to `<short>_<name>.yml`.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_api_detail(&self, api: &ResolvedApi) -> Result<PathBuf> {
        let doc = ApiDetailDocument {
            metadata: Metadata::new(
                format!("{} - {}", api.product_name, api.summary.summary),
                format!(
                    "Details of the '{}' interface of the Huawei Cloud product {}",
                    api.summary.summary, api.product_name
                ),
            ),
            api: ApiEntry::from(api),
        };
        self.write(&api_detail_file_name(api), &doc)
    }

    /// Write several APIs into a single [`BATCH_FILE`].
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_batch(&self, apis: &[ResolvedApi]) -> Result<PathBuf> {
        let doc = BatchDocument {
            metadata: Metadata::new(
                "Huawei Cloud API details",
                format!("Details of {} Huawei Cloud APIs", apis.len()),
            ),
            apis: apis.iter().map(ApiEntry::from).collect::<Vec<_>>().into(),
        };
        self.write(BATCH_FILE, &doc)
    }

    fn write<T: Serialize>(&self, file_name: &str, doc: &T) -> Result<PathBuf> {
        let yaml = serde_yaml::to_string(doc)?;
        std::fs::create_dir_all(&self.output_dir)
            .map_err(|e| SnapshotError::io(&self.output_dir, e))?;
        let path = self.output_dir.join(file_name);
        std::fs::write(&path, yaml).map_err(|e| SnapshotError::io(&path, e))?;
        tracing::debug!(path = %path.display(), "snapshot written");
        Ok(path)
    }
}
