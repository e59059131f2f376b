//! Dataset loaders for the scholarship matcher.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::model::Scholarship;
use crate::error::DatasetError;

/// Source of scholarship records.
///
/// Records are handed out as a shared read-only slice so concurrent lookups
/// never need locking.
#[async_trait]
pub trait DatasetLoader: Send + Sync {
    async fn load(&self) -> Result<Arc<[Scholarship]>, DatasetError>;
}

/// JSON array file on disk, re-read on every lookup.
pub struct JsonFileDataset {
    path: PathBuf,
}

impl JsonFileDataset {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl DatasetLoader for JsonFileDataset {
    async fn load(&self) -> Result<Arc<[Scholarship]>, DatasetError> {
        let shown = self.path.display().to_string();
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|source| DatasetError::Io {
                path: shown.clone(),
                source,
            })?;
        let records = parse_records(&shown, &bytes)?;
        debug!(path = %shown, records = records.len(), "Scholarship dataset loaded");
        Ok(records.into())
    }
}

/// Parse a JSON array of scholarship records.
pub fn parse_records(path: &str, bytes: &[u8]) -> Result<Vec<Scholarship>, DatasetError> {
    serde_json::from_slice(bytes).map_err(|source| DatasetError::Parse {
        path: path.to_string(),
        source,
    })
}

/// Records already in memory.
pub struct StaticDataset {
    records: Arc<[Scholarship]>,
}

impl StaticDataset {
    pub fn new(records: Vec<Scholarship>) -> Self {
        Self {
            records: records.into(),
        }
    }
}

#[async_trait]
impl DatasetLoader for StaticDataset {
    async fn load(&self) -> Result<Arc<[Scholarship]>, DatasetError> {
        Ok(Arc::clone(&self.records))
    }
}
