use anyhow::Context as _;
use apiscan_catalog::CatalogConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_OUTPUT_DIR: &str = "api_exports";

/// Persistent exporter settings: catalog connection plus the default output directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportConfig {
    #[serde(flatten)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
}

/// `$XDG_CONFIG_HOME/apiscan/config.json`, falling back to `~/.config`.
///
/// # Errors
///
/// Returns an error if neither `XDG_CONFIG_HOME` nor `HOME` is set.
pub fn default_config_path() -> anyhow::Result<PathBuf> {
    let base = if let Ok(v) = std::env::var("XDG_CONFIG_HOME") {
        PathBuf::from(v)
    } else {
        let home = std::env::var("HOME").context("HOME is not set")?;
        PathBuf::from(home).join(".config")
    };
    Ok(base.join("apiscan").join("config.json"))
}

/// Load exporter settings from JSON or YAML. A missing file yields the defaults.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed as either format.
pub fn load_config(path: &Path) -> anyhow::Result<ExportConfig> {
    let text = match std::fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(ExportConfig::default()),
        Err(e) => return Err(e).with_context(|| format!("read config {}", path.display())),
    };
    let cfg: ExportConfig = match serde_json::from_str(&text) {
        Ok(cfg) => cfg,
        Err(_) => serde_yaml::from_str(&text)
            .with_context(|| format!("parse {} as JSON or YAML", path.display()))?,
    };
    Ok(cfg)
}
