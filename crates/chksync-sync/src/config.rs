use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{SyncError, SyncResult};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Maximum checksums per `fetch_objects` request.
    pub batch_size: usize,
    /// Recompute every received object's checksum before storing it.
    pub verify_objects: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            batch_size: 64,
            verify_objects: true,
        }
    }
}

impl SyncConfig {
    pub fn from_toml_str(s: &str) -> SyncResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| SyncError::Config(e.to_string()))?;
        if config.batch_size == 0 {
            return Err(SyncError::Config("batch_size must be at least 1".into()));
        }
        Ok(config)
    }

    pub fn load(path: &Path) -> SyncResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| SyncError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }
}
