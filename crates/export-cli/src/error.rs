use apiscan_catalog::CatalogError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("failed to serialize snapshot as YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("batch file '{}' contains no valid 'product,interface' lines", path.display())]
    EmptyBatch { path: PathBuf },

    #[error("none of the {attempted} requested APIs could be exported")]
    NothingExported { attempted: usize },
}

impl SnapshotError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, SnapshotError>;
