//! Raw access to the three API Explorer endpoints.
//!
//! `CatalogSource` is the seam between the lookup/pagination logic in [`crate::Catalog`] and the
//! network. `HttpCatalogSource` is the production implementation; tests substitute in-memory
//! sources.

use crate::config::CatalogConfig;
use crate::error::{CatalogError, Result};
use crate::models::{ApiPage, ProductGroup, ProductsResponse};
use crate::redact::{redact_url, sanitize_reqwest_error};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

const PRODUCTS_PATH: &str = "v5/products";
const APIS_PATH: &str = "v3/apis";
const API_DETAIL_PATH: &str = "v4/apis/detail";

#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Fetch the full grouped product catalog.
    async fn fetch_products(&self) -> Result<Vec<ProductGroup>>;

    /// Fetch one page of a product's API listing.
    async fn fetch_api_page(&self, short_code: &str, offset: usize, limit: usize)
    -> Result<ApiPage>;

    /// Fetch the raw detail document of one API.
    async fn fetch_api_detail(&self, short_code: &str, api_name: &str) -> Result<Value>;
}

#[async_trait]
impl<T: CatalogSource + ?Sized> CatalogSource for std::sync::Arc<T> {
    async fn fetch_products(&self) -> Result<Vec<ProductGroup>> {
        (**self).fetch_products().await
    }

    async fn fetch_api_page(
        &self,
        short_code: &str,
        offset: usize,
        limit: usize,
    ) -> Result<ApiPage> {
        (**self).fetch_api_page(short_code, offset, limit).await
    }

    async fn fetch_api_detail(&self, short_code: &str, api_name: &str) -> Result<Value> {
        (**self).fetch_api_detail(short_code, api_name).await
    }
}

/// `CatalogSource` backed by the real HTTP service.
#[derive(Debug, Clone)]
pub struct HttpCatalogSource {
    base_url: Url,
    client: Client,
}

impl HttpCatalogSource {
    /// Build an HTTP source from a config. The configured timeout applies to every request.
    ///
    /// # Errors
    ///
    /// Returns an error if the config is invalid or the HTTP client cannot be built.
    pub fn new(config: &CatalogConfig) -> Result<Self> {
        config.validate()?;
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| CatalogError::Config(sanitize_reqwest_error(&e)))?;
        Ok(Self {
            base_url: config.base_url()?,
            client,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url.join(path).map_err(|e| {
            CatalogError::Config(format!("Failed to join '{path}' onto {}: {e}", self.base_url))
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url, query: &[(&str, String)]) -> Result<T> {
        let target = redact_url(&url);
        tracing::debug!(url = %target, "catalog request");

        let resp = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| CatalogError::Upstream(sanitize_reqwest_error(&e)))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(CatalogError::Upstream(format!(
                "GET {target} returned HTTP {status}"
            )));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| CatalogError::Upstream(sanitize_reqwest_error(&e)))?;

        serde_json::from_slice(&bytes).map_err(|e| {
            CatalogError::Upstream(format!("GET {target} returned a malformed body: {e}"))
        })
    }
}

#[async_trait]
impl CatalogSource for HttpCatalogSource {
    async fn fetch_products(&self) -> Result<Vec<ProductGroup>> {
        let url = self.endpoint(PRODUCTS_PATH)?;
        let body: ProductsResponse = self.get_json(url, &[]).await?;
        Ok(body.groups)
    }

    async fn fetch_api_page(
        &self,
        short_code: &str,
        offset: usize,
        limit: usize,
    ) -> Result<ApiPage> {
        let url = self.endpoint(APIS_PATH)?;
        self.get_json(
            url,
            &[
                ("offset", offset.to_string()),
                ("limit", limit.to_string()),
                ("product_short", short_code.to_string()),
            ],
        )
        .await
    }

    async fn fetch_api_detail(&self, short_code: &str, api_name: &str) -> Result<Value> {
        let url = self.endpoint(API_DETAIL_PATH)?;
        self.get_json(
            url,
            &[
                ("product_short", short_code.to_string()),
                ("name", api_name.to_string()),
            ],
        )
        .await
    }
}
