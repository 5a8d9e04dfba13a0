//! Local cache of results produced without an account
//!
//! Stored as a small JSON file so results survive until the next login, when
//! they are attached to the account and the file is cleared.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{QuizError, QuizResult};

const CACHE_FILE: &str = "guest_results.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedResults {
    pub result_ids: Vec<i64>,
    pub saved_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct GuestCache {
    path: PathBuf,
}

impl GuestCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<cache dir>/tsf/guest_results.json`, falling back to the working directory
    pub fn default_path() -> PathBuf {
        dirs::cache_dir()
            .map(|d| d.join("tsf"))
            .unwrap_or_else(|| PathBuf::from("."))
            .join(CACHE_FILE)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the cached results
    pub fn save(&self, result_ids: &[i64]) -> QuizResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let cached = CachedResults {
            result_ids: result_ids.to_vec(),
            saved_at: Utc::now(),
        };
        let json = serde_json::to_vec_pretty(&cached).map_err(|e| QuizError::Cache(e.to_string()))?;

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;

        debug!(count = result_ids.len(), path = %self.path.display(), "Guest results cached");
        Ok(())
    }

    /// Cached result ids; a missing file is an empty cache
    pub fn load(&self) -> QuizResult<Vec<i64>> {
        let content = match std::fs::read(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let cached: CachedResults = serde_json::from_slice(&content).map_err(|e| {
            warn!(path = %self.path.display(), error = %e, "Unreadable guest cache");
            QuizError::Cache(format!("{}: {}", self.path.display(), e))
        })?;
        Ok(cached.result_ids)
    }

    pub fn clear(&self) -> QuizResult<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn is_empty(&self) -> QuizResult<bool> {
        Ok(self.load()?.is_empty())
    }
}
