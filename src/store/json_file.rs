use anyhow::{Context, Result};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

use super::MemoryStore;

/// Persists a whole [`MemoryStore`] as one pretty-printed JSON document.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the store; a missing file is an empty store.
    pub async fn load(&self) -> Result<MemoryStore> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(path = %self.path.display(), "no data file yet, starting empty");
                return Ok(MemoryStore::new());
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to read data file '{}'", self.path.display())
                })
            }
        };

        let store: MemoryStore = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse data file '{}'", self.path.display()))?;
        debug!(path = %self.path.display(), "data file loaded");
        Ok(store)
    }

    /// Writes to a sibling temp file first, then renames it over the target.
    pub async fn save(&self, store: &MemoryStore) -> Result<()> {
        let json = serde_json::to_string_pretty(store).context("Failed to serialize store")?;
        let tmp_path = self.path.with_extension("json.tmp");

        fs::write(&tmp_path, json)
            .await
            .with_context(|| format!("Failed to write '{}'", tmp_path.display()))?;
        fs::rename(&tmp_path, &self.path).await.with_context(|| {
            format!(
                "Failed to move '{}' to '{}'",
                tmp_path.display(),
                self.path.display()
            )
        })?;
        debug!(path = %self.path.display(), "data file saved");
        Ok(())
    }
}
