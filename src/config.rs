use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;
use crate::timing::DispatchRule;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub name: String,
    pub beat_duration_ms: u64,
    /// Beats a track may have queued but not yet consumed
    pub beat_capacity: usize,
    /// Events a track may have forwarded but the sequencer not yet collected
    pub outbox_capacity: usize,
    pub dispatch_rule: DispatchRule,
    pub client_name: String,
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name: "Untitled".to_string(),
            beat_duration_ms: 250,
            beat_capacity: 1,
            outbox_capacity: 64,
            dispatch_rule: DispatchRule::NotBeforeCurrent,
            client_name: "termseq".to_string(),
            log_file: Some(PathBuf::from("termseq.log")),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let ron_string = fs::read_to_string(path)?;
        let config: Config = ron::from_str(&ron_string)?;
        Ok(config)
    }

    /// Loads `path` if it exists, defaults otherwise.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let ron_string = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?;
        fs::write(path, ron_string)?;
        Ok(())
    }

    pub fn beat_duration(&self) -> Duration {
        Duration::from_millis(self.beat_duration_ms)
    }

    pub fn beat_capacity(&self) -> usize {
        self.beat_capacity.max(1)
    }

    pub fn outbox_capacity(&self) -> usize {
        self.outbox_capacity.max(1)
    }
}
