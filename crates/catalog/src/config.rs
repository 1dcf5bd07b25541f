use crate::error::{CatalogError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://console.huaweicloud.com/apiexplorer/new/";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Connection settings for the catalog service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogConfig {
    /// Base URL of the API Explorer; endpoint paths are joined onto it.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Timeout applied to every outbound request (seconds).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Page size used when listing a product's APIs.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl CatalogConfig {
    /// Load a config file (JSON or YAML). A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(CatalogError::ConfigRead {
                    path: path.display().to_string(),
                    source,
                });
            }
        };

        serde_json::from_str(&content)
            .or_else(|_| serde_yaml::from_str(&content))
            .map_err(|e| {
                CatalogError::Config(format!("Failed to parse config {}: {e}", path.display()))
            })
    }

    /// Parse and check the base URL, returning it with a trailing slash so relative endpoint
    /// paths join underneath it rather than replacing its last segment.
    ///
    /// # Errors
    ///
    /// Returns an error for unparseable URLs or non-`http(s)` schemes.
    pub fn base_url(&self) -> Result<Url> {
        let mut raw = self.base_url.trim().to_string();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        let url = Url::parse(&raw).map_err(|e| {
            CatalogError::Config(format!("Invalid baseUrl '{}': {e}", self.base_url))
        })?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(CatalogError::Config(format!(
                "Invalid baseUrl '{}': unsupported scheme '{other}'",
                self.base_url
            ))),
        }
    }

    /// Overlay command-line / environment values onto file values.
    #[must_use]
    pub fn with_overrides(
        mut self,
        base_url: Option<String>,
        timeout_secs: Option<u64>,
        page_size: Option<usize>,
    ) -> Self {
        if let Some(v) = base_url {
            self.base_url = v;
        }
        if let Some(v) = timeout_secs {
            self.timeout_secs = v;
        }
        if let Some(v) = page_size {
            self.page_size = v;
        }
        self
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validate every field.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the timeout / page size is zero.
    pub fn validate(&self) -> Result<()> {
        self.base_url()?;
        if self.timeout_secs == 0 {
            return Err(CatalogError::Config("timeoutSecs must be > 0".to_string()));
        }
        if self.page_size == 0 {
            return Err(CatalogError::Config("pageSize must be > 0".to_string()));
        }
        Ok(())
    }
}
