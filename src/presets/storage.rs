// File based preset persistence, one pretty printed JSON file per preset

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use super::{Preset, PresetStore};
use crate::errors::PacekeeperError;

pub struct FileBasedPresetStore {
    /// Directory holding one `<normalized name>.json` per preset
    storage_path: PathBuf,
    /// Presets saved or loaded through this instance, by normalized name
    cache: HashMap<String, Preset>,
}

impl FileBasedPresetStore {
    pub fn new(storage_path: PathBuf) -> Result<Self, PacekeeperError> {
        if !storage_path.exists() {
            fs::create_dir_all(&storage_path)
                .map_err(|e| PacekeeperError::ConfigIOError { source: e })?;
        }

        Ok(Self {
            storage_path,
            cache: HashMap::new(),
        })
    }

    /// Store in the default application data directory
    pub fn new_default() -> Result<Self, PacekeeperError> {
        Self::new(Self::default_storage_path()?)
    }

    pub fn default_storage_path() -> Result<PathBuf, PacekeeperError> {
        let app_data_dir = dirs::data_dir().ok_or(PacekeeperError::NoConfigDir)?;
        Ok(app_data_dir.join("pacekeeper").join("presets"))
    }

    pub fn storage_path(&self) -> &Path {
        &self.storage_path
    }

    fn file_path_for_preset(&self, name: &str) -> PathBuf {
        self.storage_path
            .join(format!("{}.json", Self::normalize_preset_name(name)))
    }

    /// Lowercase with every non alphanumeric character replaced by `_`
    fn normalize_preset_name(name: &str) -> String {
        name.trim()
            .to_lowercase()
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '_' })
            .collect()
    }

    fn load_from_file(path: &Path) -> Result<Preset, PacekeeperError> {
        let content = fs::read_to_string(path).map_err(|e| PacekeeperError::PresetStorageError {
            reason: format!("Failed to read {}: {}", path.display(), e),
        })?;
        serde_json::from_str(&content).map_err(|e| PacekeeperError::PresetStorageError {
            reason: format!("Failed to parse {}: {}", path.display(), e),
        })
    }

    /// Write through a temporary file so a crash never leaves half a preset
    fn write_atomically(&self, preset: &Preset) -> Result<(), PacekeeperError> {
        let file_path = self.file_path_for_preset(&preset.name);
        let temp_path = file_path.with_extension("json.tmp");

        let content = serde_json::to_string_pretty(preset)
            .map_err(|e| PacekeeperError::ConfigSerializeError { source: e })?;

        {
            let mut temp_file = fs::File::create(&temp_path)
                .map_err(|e| PacekeeperError::ConfigIOError { source: e })?;
            temp_file
                .write_all(content.as_bytes())
                .map_err(|e| PacekeeperError::ConfigIOError { source: e })?;
            temp_file
                .sync_all()
                .map_err(|e| PacekeeperError::ConfigIOError { source: e })?;
        }

        fs::rename(&temp_path, &file_path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            PacekeeperError::ConfigIOError { source: e }
        })
    }
}

impl PresetStore for FileBasedPresetStore {
    fn save_preset(&mut self, preset: &Preset) -> Result<(), PacekeeperError> {
        preset.config.validate()?;
        if let Ok(Some(existing)) = self.load_preset(&preset.name) {
            if existing.name != preset.name {
                return Err(PacekeeperError::InvalidUserInput {
                    field: "name".to_string(),
                    reason: format!(
                        "'{}' is stored in the same file as existing preset '{}'",
                        preset.name, existing.name
                    ),
                });
            }
        }
        self.write_atomically(preset)?;

        info!("Saved preset '{}'", preset.name);
        self.cache
            .insert(Self::normalize_preset_name(&preset.name), preset.clone());
        Ok(())
    }

    fn load_preset(&self, name: &str) -> Result<Option<Preset>, PacekeeperError> {
        if name.trim().is_empty() {
            return Err(PacekeeperError::InvalidUserInput {
                field: "name".to_string(),
                reason: "Preset name cannot be empty".to_string(),
            });
        }

        if let Some(preset) = self.cache.get(&Self::normalize_preset_name(name)) {
            debug!("Found preset '{}' in cache", name);
            return Ok(Some(preset.clone()));
        }

        let file_path = self.file_path_for_preset(name);
        if !file_path.exists() {
            debug!("No preset file for '{}'", name);
            return Ok(None);
        }
        Self::load_from_file(&file_path).map(Some)
    }

    fn list_presets(&self) -> Result<Vec<String>, PacekeeperError> {
        let entries = fs::read_dir(&self.storage_path)
            .map_err(|e| PacekeeperError::ConfigIOError { source: e })?;

        let mut names = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|e| PacekeeperError::ConfigIOError { source: e })?
                .path();
            if !path.is_file() || path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }

            match Self::load_from_file(&path) {
                Ok(preset) => names.push(preset.name),
                Err(e) => {
                    warn!("Skipping unreadable preset: {}", e);
                    if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                        names.push(stem.to_string());
                    }
                }
            }
        }

        names.sort();
        Ok(names)
    }

    fn delete_preset(&mut self, name: &str) -> Result<(), PacekeeperError> {
        let file_path = self.file_path_for_preset(name);
        if file_path.exists() {
            fs::remove_file(&file_path).map_err(|e| PacekeeperError::ConfigIOError { source: e })?;
            info!("Deleted preset '{}'", name);
        }
        self.cache.remove(&Self::normalize_preset_name(name));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workout::{ActivityType, GoalType, Intensity, MilestoneMode, SessionConfig};
    use tempfile::TempDir;

    fn interval_preset() -> Preset {
        Preset::new(
            "Hill Repeats",
            SessionConfig {
                activity: ActivityType::Running,
                goal: GoalType::MilestoneBound { target_count: 8 },
                milestone_mode: MilestoneMode::Auto {
                    interval_seconds: 90,
                },
                intensity: Intensity::Intense,
                distance_milestone_interval_m: 500,
                track_position: true,
            },
        )
        .unwrap()
    }

    #[test]
    fn test_preset_name_normalization() {
        assert_eq!(
            FileBasedPresetStore::normalize_preset_name("Hill Repeats"),
            "hill_repeats"
        );
        assert_eq!(
            FileBasedPresetStore::normalize_preset_name("5k-Tempo "),
            "5k_tempo"
        );
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = FileBasedPresetStore::new(temp_dir.path().to_path_buf()).unwrap();
        let preset = interval_preset();

        store.save_preset(&preset).unwrap();
        assert!(temp_dir.path().join("hill_repeats.json").exists());

        // a fresh instance reads from disk, not from the cache
        let fresh = FileBasedPresetStore::new(temp_dir.path().to_path_buf()).unwrap();
        assert_eq!(fresh.load_preset("hill repeats").unwrap(), Some(preset));
    }

    #[test]
    fn test_missing_preset_loads_as_none() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileBasedPresetStore::new(temp_dir.path().to_path_buf()).unwrap();

        assert_eq!(store.load_preset("nothing").unwrap(), None);
        assert!(store.load_preset(" ").is_err());
    }

    #[test]
    fn test_list_and_delete() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = FileBasedPresetStore::new(temp_dir.path().to_path_buf()).unwrap();
        assert!(store.list_presets().unwrap().is_empty());

        store.save_preset(&interval_preset()).unwrap();
        store
            .save_preset(&Preset::new("Easy Walk", SessionConfig::default()).unwrap())
            .unwrap();
        assert_eq!(
            store.list_presets().unwrap(),
            vec!["Easy Walk".to_string(), "Hill Repeats".to_string()]
        );

        store.delete_preset("Hill Repeats").unwrap();
        assert_eq!(store.load_preset("Hill Repeats").unwrap(), None);
        assert_eq!(store.list_presets().unwrap(), vec!["Easy Walk".to_string()]);

        // deleting twice is fine
        store.delete_preset("Hill Repeats").unwrap();
    }

    #[test]
    fn test_colliding_names_do_not_overwrite() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = FileBasedPresetStore::new(temp_dir.path().to_path_buf()).unwrap();
        let walk = Preset::new("Easy Walk", SessionConfig::default()).unwrap();
        store.save_preset(&walk).unwrap();

        let clash = Preset::new("easy-walk", interval_preset().config).unwrap();
        assert!(matches!(
            store.save_preset(&clash),
            Err(PacekeeperError::InvalidUserInput { .. })
        ));

        // the same display name updates in place
        let updated = Preset::new("Easy Walk", interval_preset().config).unwrap();
        store.save_preset(&updated).unwrap();
        let fresh = FileBasedPresetStore::new(temp_dir.path().to_path_buf()).unwrap();
        assert_eq!(fresh.load_preset("easy walk").unwrap(), Some(updated));
        assert_eq!(fresh.list_presets().unwrap(), vec!["Easy Walk".to_string()]);
    }

    #[test]
    fn test_corrupted_preset_is_reported() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("broken.json"), "{ not json").unwrap();
        let store = FileBasedPresetStore::new(temp_dir.path().to_path_buf()).unwrap();

        assert!(matches!(
            store.load_preset("broken"),
            Err(PacekeeperError::PresetStorageError { .. })
        ));
        assert_eq!(store.list_presets().unwrap(), vec!["broken".to_string()]);
    }

    #[test]
    fn test_storage_creates_directory() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("a").join("b");
        let store = FileBasedPresetStore::new(nested.clone()).unwrap();
        assert!(nested.exists());
        assert_eq!(store.storage_path(), nested.as_path());
    }
}
