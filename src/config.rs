use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::audio_system::{AudioManagerConfig, BackendPreference, ManagerOptions, SoundConfig};
use crate::error::ConfigError;

fn default_sounds_dir() -> PathBuf {
    PathBuf::from("static/sounds")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory holding `<sound-name>.mp3` files
    #[serde(default = "default_sounds_dir")]
    pub sounds_dir: PathBuf,

    /// Manager knobs (volume, mute, preload, concurrency cap)
    #[serde(default)]
    pub manager: AudioManagerConfig,

    /// Which platform adapter to use
    #[serde(default)]
    pub backend: BackendPreference,

    /// Sound catalog; a type left out cannot be played
    #[serde(default = "SoundConfig::defaults")]
    pub sounds: Vec<SoundConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            sounds_dir: default_sounds_dir(),
            manager: AudioManagerConfig::default(),
            backend: BackendPreference::Auto,
            sounds: SoundConfig::defaults(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the platform config directory.
    /// Creates the default config if the file doesn't exist.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = Self::config_path()?;
        Self::load_or_create(&path)
    }

    /// Load configuration from `path`, writing defaults there if missing
    pub fn load_or_create(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            let config = AppConfig::default();
            config.save(path)?;
            tracing::info!("Created default config at: {}", path.display());
            return Ok(config);
        }

        let load_failed = |source: Box<dyn std::error::Error + Send + Sync>| {
            ConfigError::LoadFailed {
                path: path.display().to_string(),
                source,
            }
        };

        let content = fs::read_to_string(path).map_err(|e| load_failed(e.into()))?;
        let config: AppConfig = serde_json::from_str(&content).map_err(|e| load_failed(e.into()))?;
        config.validate()?;

        tracing::info!("Loaded config from: {}", path.display());
        Ok(config)
    }

    /// Save configuration to disk
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::DirectoryCreationFailed {
                path: parent.display().to_string(),
                source,
            })?;
        }

        let save_failed = |source: Box<dyn std::error::Error + Send + Sync>| {
            ConfigError::SaveFailed {
                path: path.display().to_string(),
                source,
            }
        };

        let json = serde_json::to_string_pretty(self).map_err(|e| save_failed(e.into()))?;
        fs::write(path, json).map_err(|e| save_failed(e.into()))?;

        Ok(())
    }

    /// Get the config file path in the user config directory
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join("BubbleSound").join("config.json"))
            .ok_or_else(|| ConfigError::Invalid("could not determine user config directory".into()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.manager.max_concurrent_sounds == 0 {
            return Err(ConfigError::Invalid(
                "max_concurrent_sounds must be at least 1".into(),
            ));
        }
        if let Some(dup) = self
            .sounds
            .iter()
            .enumerate()
            .find(|(i, config)| self.sounds[..*i].iter().any(|c| c.sound == config.sound))
        {
            return Err(ConfigError::Invalid(format!(
                "sound {} is listed more than once",
                dup.1.sound
            )));
        }
        Ok(())
    }

    /// Options for building a `SoundManager` from this config
    pub fn manager_options(&self) -> ManagerOptions {
        ManagerOptions {
            config: self.manager,
            sounds_dir: self.sounds_dir.clone(),
            catalog: self.sounds.clone(),
        }
    }
}
