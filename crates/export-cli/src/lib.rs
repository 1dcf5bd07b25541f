//! YAML snapshots of the Huawei Cloud API Explorer catalog.
//!
//! [`Exporter`] pulls from an `apiscan_catalog::Catalog` and hands the results to a
//! [`SnapshotWriter`]; the `apiscan-export` binary wires both to the command line.

pub mod batch;
pub mod config;
pub mod error;
pub mod export;
pub mod logging;
pub mod snapshot;

pub use batch::{BatchEntry, parse_batch, read_batch_file};
pub use error::{Result, SnapshotError};
pub use export::{BatchFailure, BatchReport, Exporter};
pub use snapshot::{SnapshotWriter, safe_file_component};
