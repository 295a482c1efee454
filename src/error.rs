use thiserror::Error;

use crate::audio_system::SoundType;

/// Sound subsystem errors using thiserror for structured error handling.
///
/// None of these reach the UI: `play_sound` logs and drops them, and the
/// settings setters swallow persistence failures. They exist so callers
/// that care (tests, diagnostics) can see why a request went nowhere.

#[derive(Error, Debug)]
pub enum SoundError {
    #[error("Sound effects are disabled")]
    SoundDisabled,

    #[error("Audio is muted")]
    Muted,

    #[error("Too many sounds playing (max {max})")]
    AtCapacity { max: usize },

    #[error("No sound config registered for {0}")]
    UnknownSound(SoundType),

    #[error("No audio file registered for {0}")]
    NotRegistered(SoundType),

    #[error("Failed to load audio file: {path}: {reason}")]
    LoadFailed { path: String, reason: String },

    #[error("Playback of {sound} failed: {reason}")]
    PlaybackFailed { sound: SoundType, reason: String },

    #[error("Playback of {sound} failed ({first}), fallback also failed ({second})")]
    FallbackFailed {
        sound: SoundType,
        first: Box<SoundError>,
        second: Box<SoundError>,
    },

    #[error("Audio output unavailable: {0}")]
    OutputUnavailable(String),

    #[error("Audio manager initialization failed: {0}")]
    InitFailed(String),

    #[error("Failed to load audio settings")]
    Settings(#[from] StoreError),

    #[error("Playback worker is not running")]
    WorkerStopped,
}

impl SoundError {
    /// Whether this error comes from the admission checks of a play request
    /// rather than from the platform.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            SoundError::SoundDisabled
                | SoundError::Muted
                | SoundError::AtCapacity { .. }
                | SoundError::UnknownSound(_)
                | SoundError::NotRegistered(_)
        )
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to read key {key}")]
    Read {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write key {key}")]
    Write {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize stored value")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration from {path}")]
    LoadFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Failed to save configuration to {path}")]
    SaveFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to create config directory: {path}")]
    DirectoryCreationFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Type alias for application Results using anyhow for context chaining
pub type AppResult<T> = anyhow::Result<T>;
