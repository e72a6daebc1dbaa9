// Named session presets, so a favourite configuration can be started again
// without re-entering it.

pub mod storage;

use serde::{Deserialize, Serialize};

use crate::PacekeeperError;
use crate::workout::SessionConfig;

pub use storage::FileBasedPresetStore;

const MAX_PRESET_NAME_LEN: usize = 64;

/// A session configuration saved under a name.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    pub name: String,
    pub config: SessionConfig,
}

impl Preset {
    /// # Errors
    ///
    /// Returns `InvalidUserInput` for an empty or overly long name and
    /// `InvalidSessionConfig` when the configuration could never start.
    pub fn new(name: &str, config: SessionConfig) -> Result<Self, PacekeeperError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(PacekeeperError::InvalidUserInput {
                field: "name".to_string(),
                reason: "Preset name cannot be empty".to_string(),
            });
        }
        if name.chars().count() > MAX_PRESET_NAME_LEN {
            return Err(PacekeeperError::InvalidUserInput {
                field: "name".to_string(),
                reason: format!("Preset name too long (max {MAX_PRESET_NAME_LEN} characters)"),
            });
        }
        config.validate()?;

        Ok(Self {
            name: name.to_string(),
            config,
        })
    }
}

/// Persistence for presets. Values round trip unchanged.
pub trait PresetStore {
    fn save_preset(&mut self, preset: &Preset) -> Result<(), PacekeeperError>;

    /// Load a preset by name, `None` when it was never saved.
    fn load_preset(&self, name: &str) -> Result<Option<Preset>, PacekeeperError>;

    /// Names of all saved presets, sorted.
    fn list_presets(&self) -> Result<Vec<String>, PacekeeperError>;

    /// Deleting a missing preset is not an error.
    fn delete_preset(&mut self, name: &str) -> Result<(), PacekeeperError>;
}
