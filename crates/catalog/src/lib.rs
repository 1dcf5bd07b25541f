//! Client for the Huawei Cloud API Explorer catalog.
//!
//! This crate is used by:
//! - `apiscan-mcp-server` (tool calls over stdio JSON-RPC)
//! - `apiscan-export` (YAML snapshots)
//!
//! It performs no caching and no retries; every call goes to the service.

pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod redact;
pub mod source;

pub use client::Catalog;
pub use config::CatalogConfig;
pub use error::{CatalogError, Result};
pub use models::{ApiPage, ApiSummary, Product, ProductGroup, ResolvedApi};
pub use source::{CatalogSource, HttpCatalogSource};
