//! Trace files in a directory, one pretty-printed JSON document each.

use crate::error::TraceError;
use crate::types::Trace;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

pub struct TraceStore {
    dir: PathBuf,
}

impl TraceStore {
    /// Open a store, creating the directory if needed.
    pub async fn new(dir: impl Into<PathBuf>) -> Result<Self, TraceError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `trace` atomically (.tmp, then rename). Returns `None` without
    /// writing anything when the trace has no user turn.
    pub async fn save(&self, trace: &Trace) -> Result<Option<PathBuf>, TraceError> {
        let Some(name) = trace.file_name() else {
            tracing::debug!("Trace {} has no user turn; not saved", trace.id);
            return Ok(None);
        };
        let path = self.dir.join(name);
        let tmp_path = path.with_extension("tmp");
        let json = serde_json::to_string_pretty(trace)?;
        tokio::fs::write(&tmp_path, json).await?;
        tokio::fs::rename(&tmp_path, &path).await?;
        tracing::info!("Saved trace to {}", path.display());
        Ok(Some(path))
    }

    /// Load one trace file.
    pub async fn load(&self, path: &Path) -> Result<Trace, TraceError> {
        if !path.exists() {
            return Err(TraceError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let data = tokio::fs::read_to_string(path).await?;
        serde_json::from_str(&data).map_err(|source| TraceError::Invalid {
            path: path.to_path_buf(),
            source,
        })
    }

    /// The most recently modified trace file, if any.
    pub async fn latest_path(&self) -> Result<Option<PathBuf>, TraceError> {
        let mut newest: Option<(SystemTime, PathBuf)> = None;
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let modified = match entry.metadata().await.and_then(|m| m.modified()) {
                Ok(modified) => modified,
                Err(e) => {
                    tracing::warn!("Skipping trace {}: {e}", path.display());
                    continue;
                }
            };
            if newest.as_ref().is_none_or(|(t, _)| modified > *t) {
                newest = Some((modified, path));
            }
        }
        Ok(newest.map(|(_, path)| path))
    }

    /// Load the most recently modified trace, if any.
    pub async fn latest(&self) -> Result<Option<Trace>, TraceError> {
        match self.latest_path().await? {
            Some(path) => self.load(&path).await.map(Some),
            None => Ok(None),
        }
    }
}
