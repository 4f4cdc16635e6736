//! Locates and loads pkgsync.toml.

use std::path::{Path, PathBuf};

use super::{SyncConfig, parser};

pub const CONFIG_FILE_NAME: &str = "pkgsync.toml";

#[derive(Debug, Clone)]
pub struct ConfigStore {
    config_path: PathBuf,
}

impl ConfigStore {
    /// Project file when present, else the global one.
    pub fn discover(project_root: &Path) -> anyhow::Result<Self> {
        let project_file = project_root.join(CONFIG_FILE_NAME);
        if project_file.exists() {
            return Ok(Self::from_path(project_file));
        }

        let global_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?
            .join("pkgsync");
        Ok(Self::from_path(global_dir.join(CONFIG_FILE_NAME)))
    }

    pub fn from_path(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Missing file yields the defaults.
    pub fn load(&self) -> anyhow::Result<SyncConfig> {
        if !self.config_path.exists() {
            return Ok(SyncConfig::new());
        }
        parser::parse_sync_toml(&self.config_path)
    }
}
