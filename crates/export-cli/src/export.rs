use crate::batch::BatchEntry;
use crate::error::{Result, SnapshotError};
use crate::snapshot::SnapshotWriter;
use apiscan_catalog::{Catalog, CatalogSource};
use std::path::PathBuf;

/// A batch entry that could not be exported, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFailure {
    pub entry: BatchEntry,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub path: PathBuf,
    pub exported: usize,
    pub failures: Vec<BatchFailure>,
}

/// Fetches from the catalog and writes snapshots.
pub struct Exporter<S> {
    catalog: Catalog<S>,
    writer: SnapshotWriter,
}

impl<S: CatalogSource> Exporter<S> {
    #[must_use]
    pub fn new(catalog: Catalog<S>, writer: SnapshotWriter) -> Self {
        Self { catalog, writer }
    }

    /// # Errors
    ///
    /// Returns catalog failures and snapshot write failures.
    pub async fn export_products(&self) -> Result<PathBuf> {
        let groups = self.catalog.list_products().await?;
        self.writer.write_products(&groups)
    }

    /// # Errors
    ///
    /// Returns `ProductNotFound`, upstream failures, and snapshot write failures.
    pub async fn export_product_apis(&self, product_name: &str) -> Result<PathBuf> {
        let short = self.catalog.resolve_short_code(product_name).await?;
        let apis = self.catalog.list_apis(&short).await?;
        tracing::info!(product_short = %short, count = apis.len(), "fetched API listing");
        self.writer.write_api_list(product_name, &short, &apis)
    }

    /// # Errors
    ///
    /// Returns lookup misses, upstream failures, and snapshot write failures.
    pub async fn export_api_detail(
        &self,
        product_name: &str,
        interface_name: &str,
    ) -> Result<PathBuf> {
        let api = self
            .catalog
            .resolve_api_by_user_input(product_name, interface_name)
            .await?;
        self.writer.write_api_detail(&api)
    }

    /// Resolve every entry in order and write the successes into one batch snapshot. Entries
    /// that fail are recorded in the report and skipped.
    ///
    /// # Errors
    ///
    /// Returns `NothingExported` if no entry resolved, or a snapshot write failure.
    pub async fn export_batch(&self, entries: &[BatchEntry]) -> Result<BatchReport> {
        let mut resolved = Vec::with_capacity(entries.len());
        let mut failures = Vec::new();

        for entry in entries {
            match self
                .catalog
                .resolve_api_by_user_input(&entry.product_name, &entry.interface_name)
                .await
            {
                Ok(api) => resolved.push(api),
                Err(e) => {
                    tracing::warn!(
                        line = entry.line,
                        product = %entry.product_name,
                        interface = %entry.interface_name,
                        error = %e,
                        "skipping batch entry"
                    );
                    failures.push(BatchFailure {
                        entry: entry.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        if resolved.is_empty() {
            return Err(SnapshotError::NothingExported {
                attempted: entries.len(),
            });
        }

        let path = self.writer.write_batch(&resolved)?;
        Ok(BatchReport {
            path,
            exported: resolved.len(),
            failures,
        })
    }
}
