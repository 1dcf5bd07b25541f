//! Catalog lookups layered over a [`CatalogSource`].

use crate::config::{CatalogConfig, DEFAULT_PAGE_SIZE};
use crate::error::{CatalogError, Result};
use crate::models::{ApiSummary, ProductGroup, ResolvedApi};
use crate::source::{CatalogSource, HttpCatalogSource};
use serde_json::Value;

/// Product/API lookups over a catalog source.
///
/// Every operation issues its requests strictly in sequence; nothing is cached between calls.
#[derive(Debug, Clone)]
pub struct Catalog<S> {
    source: S,
    page_size: usize,
}

impl Catalog<HttpCatalogSource> {
    /// Build a catalog talking to the HTTP service described by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the config is invalid.
    pub fn from_config(config: &CatalogConfig) -> Result<Self> {
        let source = HttpCatalogSource::new(config)?;
        Ok(Self::new(source).with_page_size(config.page_size))
    }
}

impl<S: CatalogSource> Catalog<S> {
    #[must_use]
    pub fn new(source: S) -> Self {
        Self {
            source,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Override the listing page size (zero is clamped to one).
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    #[must_use]
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Fetch the full grouped product catalog.
    ///
    /// # Errors
    ///
    /// Returns `Upstream` if the request fails.
    pub async fn list_products(&self) -> Result<Vec<ProductGroup>> {
        self.source.fetch_products().await
    }

    /// Resolve a product's short code from its exact display name.
    ///
    /// Groups and products are scanned in server order; the first match wins.
    ///
    /// # Errors
    ///
    /// Returns `ProductNotFound` if no product has this name, `Upstream` if the listing fails.
    pub async fn resolve_short_code(&self, product_name: &str) -> Result<String> {
        let groups = self.list_products().await?;
        find_short_code(&groups, product_name)
            .map(str::to_string)
            .ok_or_else(|| CatalogError::ProductNotFound(product_name.to_string()))
    }

    /// List every API of a product, following offset/limit pagination to the end.
    ///
    /// Pages are fetched one after another until `offset + page_size` reaches the count the
    /// server reports. A failed page aborts the whole listing.
    ///
    /// # Errors
    ///
    /// Returns `Upstream` if any page fails or the accumulated length disagrees with the
    /// reported count.
    pub async fn list_apis(&self, short_code: &str) -> Result<Vec<ApiSummary>> {
        let limit = self.page_size;
        let mut offset = 0usize;
        let mut page_no = 0usize;
        let mut apis = Vec::new();

        let total = loop {
            let page = self
                .source
                .fetch_api_page(short_code, offset, limit)
                .await?;
            page_no += 1;
            tracing::debug!(
                product_short = %short_code,
                page = page_no,
                offset,
                received = page.api_basic_infos.len(),
                count = page.count,
                "fetched API page"
            );
            apis.extend(page.api_basic_infos);

            if offset + limit < page.count {
                offset += limit;
            } else {
                break page.count;
            }
        };

        if apis.len() != total {
            return Err(CatalogError::Upstream(format!(
                "Inconsistent API listing for '{short_code}': server reported {total} APIs, \
                 received {}",
                apis.len()
            )));
        }
        Ok(apis)
    }

    /// Find the first API whose summary contains `needle` (case-sensitive).
    ///
    /// # Errors
    ///
    /// Returns `ApiNotFound` if nothing matches, `Upstream` if the listing fails.
    pub async fn find_api_by_summary(&self, short_code: &str, needle: &str) -> Result<ApiSummary> {
        let apis = self.list_apis(short_code).await?;
        apis.into_iter()
            .find(|api| api.summary.contains(needle))
            .ok_or_else(|| CatalogError::ApiNotFound {
                product: short_code.to_string(),
                interface: needle.to_string(),
            })
    }

    /// Fetch one API's raw detail document.
    ///
    /// # Errors
    ///
    /// Returns `Upstream` if the request fails.
    pub async fn fetch_api_detail(&self, short_code: &str, api_name: &str) -> Result<Value> {
        self.source.fetch_api_detail(short_code, api_name).await
    }

    /// Resolve user input (product display name + interface summary fragment) to a full API
    /// record: short code, listing row, and detail document.
    ///
    /// # Errors
    ///
    /// Returns `ProductNotFound` / `ApiNotFound` on lookup misses, `Upstream` on transport
    /// failures.
    pub async fn resolve_api_by_user_input(
        &self,
        product_name: &str,
        interface_name: &str,
    ) -> Result<ResolvedApi> {
        let product_short = self.resolve_short_code(product_name).await?;
        let summary = self
            .find_api_by_summary(&product_short, interface_name)
            .await
            .map_err(|e| match e {
                CatalogError::ApiNotFound { interface, .. } => CatalogError::ApiNotFound {
                    product: product_name.to_string(),
                    interface,
                },
                other => other,
            })?;
        let detail = self.fetch_api_detail(&product_short, &summary.name).await?;

        Ok(ResolvedApi {
            product_name: product_name.to_string(),
            product_short,
            summary,
            detail,
        })
    }
}

/// First product named exactly `product_name`, in group order.
#[must_use]
pub fn find_short_code<'a>(groups: &'a [ProductGroup], product_name: &str) -> Option<&'a str> {
    groups
        .iter()
        .flat_map(|g| g.products.iter())
        .find(|p| p.name == product_name)
        .map(|p| p.short_code.as_str())
}
