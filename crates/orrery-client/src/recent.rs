//! Durable "recent notebooks" list.
//!
//! A JSON array of path strings, most-recently-opened first, deduplicated,
//! capped at [`RECENT_NOTEBOOKS_CAP`]. Updated whenever the authority reports
//! the canonical path for the open notebook; the superseded path (e.g. the
//! temp-dir location before a save-as) is removed in the same write.

use std::fs;
use std::path::PathBuf;

use tracing::warn;

/// Maximum number of entries retained.
pub const RECENT_NOTEBOOKS_CAP: usize = 50;

/// Error reading or writing the recent-notebooks file.
#[derive(Debug, thiserror::Error)]
pub enum RecentError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed recent-notebooks file: {0}")]
    Serde(#[from] serde_json::Error),
}

/// File-backed MRU list of notebook paths.
#[derive(Clone, Debug)]
pub struct RecentNotebooks {
    file: PathBuf,
}

impl RecentNotebooks {
    /// Use an explicit file location (tests point this at a temp dir).
    pub fn at(file: PathBuf) -> Self {
        Self { file }
    }

    /// The platform-default location, `<data_dir>/orrery/recent_notebooks.json`.
    /// `None` when the platform reports no data directory.
    pub fn default_location() -> Option<Self> {
        dirs::data_dir().map(|d| Self::at(d.join("orrery").join("recent_notebooks.json")))
    }

    /// Current list, most recent first. A missing file is an empty list.
    pub fn list(&self) -> Result<Vec<String>, RecentError> {
        match fs::read_to_string(&self.file) {
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Move `path` to the front, dropping any prior occurrence and
    /// `also_remove` (the superseded location), then truncate to the cap.
    /// Returns the new list.
    pub fn insert(
        &self,
        path: &str,
        also_remove: Option<&str>,
    ) -> Result<Vec<String>, RecentError> {
        let old = self.list().unwrap_or_else(|e| {
            // A corrupt file should not make the notebook unusable.
            warn!("resetting unreadable recent-notebooks list: {e}");
            Vec::new()
        });

        let mut list = Vec::with_capacity(old.len() + 1);
        list.push(path.to_string());
        list.extend(
            old.into_iter()
                .filter(|p| p != path && Some(p.as_str()) != also_remove),
        );
        list.truncate(RECENT_NOTEBOOKS_CAP);

        if let Some(parent) = self.file.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.file, serde_json::to_string(&list)?)?;
        Ok(list)
    }
}

// ============================================================================
// Tests
// ============================================================================
