/// Audio settings and volume math
///
/// `AudioSettings` is the persisted, user-visible subset of configuration.
/// `AudioManagerConfig` holds the process-wide knobs that are not persisted.
use serde::{Deserialize, Serialize};

/// Clamp a volume into 0.0-1.0. NaN is treated as silence.
pub fn clamp01(volume: f32) -> f32 {
    if volume.is_nan() {
        0.0
    } else {
        volume.clamp(0.0, 1.0)
    }
}

/// Final volume applied to a handle at play time
///
/// `requested` is the caller's override or the type's configured volume.
pub fn effective_volume(requested: f32, master: f32, sound: f32) -> f32 {
    clamp01(clamp01(requested) * clamp01(master) * clamp01(sound))
}

/// Persisted audio settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AudioSettings {
    pub sound_enabled: bool,

    /// Reserved for background music
    pub music_enabled: bool,

    pub master_volume: f32,
    pub sound_volume: f32,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            sound_enabled: true,
            music_enabled: true,
            master_volume: 0.8,
            sound_volume: 0.8,
        }
    }
}

impl AudioSettings {
    /// Key under which the settings record is stored
    pub const STORAGE_KEY: &'static str = "audio_settings";

    /// Clamp both volumes into range
    pub fn normalized(mut self) -> Self {
        self.master_volume = clamp01(self.master_volume);
        self.sound_volume = clamp01(self.sound_volume);
        self
    }

    /// Apply the fields present in `patch`
    pub fn apply(&mut self, patch: &AudioSettingsPatch) {
        if let Some(enabled) = patch.sound_enabled {
            self.sound_enabled = enabled;
        }
        if let Some(enabled) = patch.music_enabled {
            self.music_enabled = enabled;
        }
        if let Some(volume) = patch.master_volume {
            self.master_volume = clamp01(volume);
        }
        if let Some(volume) = patch.sound_volume {
            self.sound_volume = clamp01(volume);
        }
    }
}

/// Partial settings update, as sent by a settings screen
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AudioSettingsPatch {
    pub sound_enabled: Option<bool>,
    pub music_enabled: Option<bool>,
    pub master_volume: Option<f32>,
    pub sound_volume: Option<f32>,
}

/// Process-wide manager configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioManagerConfig {
    pub master_volume: f32,
    pub muted: bool,
    pub enable_preload: bool,
    pub max_concurrent_sounds: usize,
}

impl Default for AudioManagerConfig {
    fn default() -> Self {
        Self {
            master_volume: 0.8,
            muted: false,
            enable_preload: true,
            max_concurrent_sounds: 5,
        }
    }
}
