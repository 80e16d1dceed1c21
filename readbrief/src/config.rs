//! readbrief configuration management.

use anyhow::Result;
use brief_api::GenerationMode;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::selection::DOUBLE_CLICK_WINDOW_MS;
use crate::session::{FileStore, STALE_AFTER_MS};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadBriefConfig {
    /// How often a running session re-persists its record
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Records older than this are discarded instead of offered for recovery
    #[serde(default = "default_stale_after_secs")]
    pub stale_after_secs: u64,

    /// Maximum gap between two clicks on the same chapter for a double-click
    #[serde(default = "default_double_click_ms")]
    pub double_click_ms: u64,

    /// Where the session record is kept. None means the platform data dir.
    #[serde(default)]
    pub state_dir: Option<PathBuf>,

    #[serde(default)]
    pub default_mode: GenerationMode,
}

fn default_tick_interval_ms() -> u64 {
    1000
}

fn default_stale_after_secs() -> u64 {
    (STALE_AFTER_MS / 1000) as u64
}

fn default_double_click_ms() -> u64 {
    DOUBLE_CLICK_WINDOW_MS as u64
}

impl Default for ReadBriefConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            stale_after_secs: default_stale_after_secs(),
            double_click_ms: default_double_click_ms(),
            state_dir: None,
            default_mode: GenerationMode::default(),
        }
    }
}

impl ReadBriefConfig {
    /// Get the config file path: ~/.config/cli-programs/readbrief.toml
    pub fn config_path() -> Result<PathBuf> {
        let home = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE"))?;
        Ok(PathBuf::from(home)
            .join(".config")
            .join("cli-programs")
            .join("readbrief.toml"))
    }

    /// Load config from file, returning default if file doesn't exist
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)?;
        let config: ReadBriefConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save config to file
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        // A zero period would make tokio's interval panic
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    pub fn stale_after_ms(&self) -> i64 {
        (self.stale_after_secs as i64).saturating_mul(1000)
    }

    pub fn double_click_window_ms(&self) -> i64 {
        self.double_click_ms as i64
    }

    /// Store for the session record
    pub fn state_store(&self) -> Result<FileStore> {
        match &self.state_dir {
            Some(dir) => Ok(FileStore::new(dir.clone())),
            None => Ok(FileStore::in_data_dir()?),
        }
    }
}
