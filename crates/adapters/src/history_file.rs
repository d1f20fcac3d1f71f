//! JSON file history store with atomic replace

use async_trait::async_trait;
use keyword_relay_domain::{HistoryError, HistoryRecord, HistoryStore};
use std::path::{Path, PathBuf};
use tokio::fs;

/// File-backed history store
///
/// The file holds one pretty-printed JSON object (`lastUpdate`, `sinceId`,
/// `tweets`). Saves go through a sibling temp file and an atomic rename,
/// never an in-place overwrite.
pub struct FileHistoryStore {
    path: PathBuf,
}

impl FileHistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut os_string = self.path.clone().into_os_string();
        os_string.push(".tmp");
        PathBuf::from(os_string)
    }
}

#[async_trait]
impl HistoryStore for FileHistoryStore {
    async fn load(&self) -> Result<HistoryRecord, HistoryError> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "No history file, starting fresh");
                return Ok(HistoryRecord::default());
            }
            Err(error) => return Err(HistoryError::Io(error)),
        };

        serde_json::from_slice(&bytes).map_err(|e| HistoryError::Malformed(e.to_string()))
    }

    async fn save(&self, record: &HistoryRecord) -> Result<(), HistoryError> {
        let mut record = record.clone();
        record.since_id = record.compute_since_id();

        let json = serde_json::to_vec_pretty(&record)
            .map_err(|e| HistoryError::Malformed(e.to_string()))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let temp_path = self.temp_path();
        fs::write(&temp_path, &json).await?;
        fs::rename(&temp_path, &self.path).await?;

        tracing::debug!(
            path = %self.path.display(),
            since_id = %record.since_id,
            remembered = record.len(),
            "Saved history"
        );

        Ok(())
    }
}
