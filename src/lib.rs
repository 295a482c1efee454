//! Cross-platform sound effect manager.
//!
//! Pooled playback handles, a cap on simultaneous sounds, persisted volume
//! settings and an event bus for settings and playback notifications.

pub mod audio_system;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod messaging;
pub mod session;
pub mod state;
pub mod storage;

pub use audio_system::{SoundManager, SoundType};
pub use error::{SoundError, StoreError};
