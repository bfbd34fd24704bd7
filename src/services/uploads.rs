//! Local file storage for uploaded documents

use anyhow::{Context, Result};
use std::path::{Component, Path, PathBuf};
use tokio::fs;

/// Stores uploaded files under `<root>/<kind>/<record id>/<document id>`
#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
}

impl UploadStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, kind: &str, record_id: &str, document_id: &str) -> Result<PathBuf> {
        let mut path = self.root.join(kind);
        for part in [record_id, document_id] {
            let mut components = Path::new(part).components();
            match (components.next(), components.next()) {
                (Some(Component::Normal(_)), None) => path.push(part),
                _ => anyhow::bail!("Invalid path segment: {}", part),
            }
        }
        Ok(path)
    }

    pub async fn save(
        &self,
        kind: &str,
        record_id: &str,
        document_id: &str,
        data: &[u8],
    ) -> Result<PathBuf> {
        let path = self.path_for(kind, record_id, document_id)?;
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .await
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        fs::write(&path, data)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;

        tracing::debug!(path = %path.display(), bytes = data.len(), "Stored upload");
        Ok(path)
    }

    pub async fn read(&self, kind: &str, record_id: &str, document_id: &str) -> Result<Vec<u8>> {
        let path = self.path_for(kind, record_id, document_id)?;
        fs::read(&path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))
    }

    /// Best-effort removal of a stored file
    pub async fn remove(&self, kind: &str, record_id: &str, document_id: &str) {
        let Ok(path) = self.path_for(kind, record_id, document_id) else {
            return;
        };
        if let Err(e) = fs::remove_file(&path).await {
            tracing::warn!(error = %e, path = %path.display(), "Failed to remove upload");
        }
    }
}
