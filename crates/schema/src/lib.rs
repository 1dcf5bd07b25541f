//! Schema flattening for API Explorer detail documents.
//!
//! Used by the MCP server (tool results) and the exporter (YAML snapshots). Pure data transform:
//! no I/O and no shared state.

pub mod normalize;

pub use normalize::{normalize, normalize_detail};
