use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{TreeError, TreeResult};

/// Tuning knobs shared by every node of one tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// Constructions that run longer than this are logged at `warn`.
    /// Zero disables the warning.
    pub slow_construction_warn_ms: u64,
    /// Verify the checksum of every constructed object before caching it.
    pub verify_constructed: bool,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            slow_construction_warn_ms: 1_000,
            verify_constructed: true,
        }
    }
}

impl TreeConfig {
    pub fn from_toml_str(s: &str) -> TreeResult<Self> {
        toml::from_str(s).map_err(|e| TreeError::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> TreeResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| TreeError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    pub fn slow_construction_threshold(&self) -> Option<Duration> {
        (self.slow_construction_warn_ms > 0)
            .then(|| Duration::from_millis(self.slow_construction_warn_ms))
    }
}
