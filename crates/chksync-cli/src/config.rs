use std::fs;
use std::path::Path;

use anyhow::{ensure, Context};
use chksync_sync::SyncConfig;
use chksync_tree::TreeConfig;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub tree: TreeConfig,
    pub sync: SyncConfig,
}

impl CliConfig {
    /// Defaults when no path is given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Self = toml::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        ensure!(config.sync.batch_size > 0, "sync.batch_size must be at least 1");
        Ok(config)
    }

    pub fn to_toml(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
