use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::PacekeeperError;
use crate::workout::DEFAULT_DISTANCE_MILESTONE_INTERVAL_M;

use super::{POSITION_POLL_MS, RESUBSCRIBE_DELAY_S};

const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub audio_enabled: bool,
    pub position_poll_ms: u64,
    pub resubscribe_delay_s: u64,
    pub default_distance_interval_m: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            audio_enabled: true,
            position_poll_ms: POSITION_POLL_MS,
            resubscribe_delay_s: RESUBSCRIBE_DELAY_S,
            default_distance_interval_m: DEFAULT_DISTANCE_MILESTONE_INTERVAL_M,
        }
    }
}

impl AppConfig {
    pub fn default_path() -> Result<PathBuf, PacekeeperError> {
        Ok(dirs::config_dir()
            .ok_or(PacekeeperError::NoConfigDir)?
            .join("pacekeeper")
            .join(CONFIG_FILE_NAME))
    }

    /// Config saved by a previous run, `None` on first launch.
    pub fn from_local_file() -> Result<Option<Self>, PacekeeperError> {
        Self::from_file(Self::default_path()?)
    }

    pub fn from_file(config_path: impl AsRef<Path>) -> Result<Option<Self>, PacekeeperError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let file = std::fs::File::open(config_path)
            .map_err(|e| PacekeeperError::ConfigIOError { source: e })?;
        serde_json::from_reader(file)
            .map(Some)
            .map_err(|e| PacekeeperError::ConfigSerializeError { source: e })
    }

    pub fn save(&self) -> Result<(), PacekeeperError> {
        self.save_to(Self::default_path()?)
    }

    pub fn save_to(&self, config_path: impl AsRef<Path>) -> Result<(), PacekeeperError> {
        let config_path = config_path.as_ref();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| PacekeeperError::ConfigIOError { source: e })?;
        }

        let file = std::fs::File::create(config_path)
            .map_err(|e| PacekeeperError::ConfigIOError { source: e })?;
        serde_json::to_writer_pretty(file, self)
            .map_err(|e| PacekeeperError::ConfigSerializeError { source: e })
    }

    pub fn poll_period(&self) -> Duration {
        Duration::from_millis(self.position_poll_ms.max(1))
    }

    pub fn resubscribe_delay(&self) -> Duration {
        Duration::from_secs(self.resubscribe_delay_s)
    }
}
