/// Platform audio adapters
///
/// The manager only ever talks to [`AudioBackend`] and [`AudioHandle`]; which
/// concrete adapter sits behind them is decided once, at startup, by
/// [`select_backend`].
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::SoundError;

pub mod headless;
pub mod native;

#[cfg(test)]
pub(crate) mod scripted;

pub use headless::HeadlessBackend;
pub use native::NativeBackend;

/// Callback run when a handle finishes playing on its own
pub type EndedCallback = Box<dyn FnOnce() + Send + 'static>;

/// One playable audio source
///
/// A handle is either idle in the manager's pool or owned by exactly one live
/// playback, never both.
pub trait AudioHandle: Send {
    /// Set playback volume (0.0-1.0)
    fn set_volume(&mut self, volume: f32);

    fn volume(&self) -> f32;

    /// Move the playback position back to the start.
    ///
    /// Adapters whose source is still loading defer the reset until the
    /// source is ready instead of failing.
    fn rewind(&mut self) -> Result<(), SoundError>;

    fn play(&mut self) -> Result<(), SoundError>;

    /// Stop playback and disarm any pending end-of-playback callback
    fn stop(&mut self) -> Result<(), SoundError>;

    /// Subscribe once to natural end of playback.
    ///
    /// Fires at most once. If playback already ended, fires immediately.
    /// Replaces any earlier subscription.
    fn on_ended(&mut self, callback: EndedCallback);

    /// Free platform resources. The handle is not used again afterwards.
    fn release(&mut self) {
        let _ = self.stop();
    }
}

/// Factory for handles on one platform
pub trait AudioBackend: Send + Sync {
    fn platform(&self) -> Platform;

    /// Build a handle bound to `path`, returning once it is safe to start
    /// playback (not necessarily fully decoded).
    fn create(&self, path: &Path) -> Result<Box<dyn AudioHandle>, SoundError>;
}

/// Detected audio platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// System output device through rodio
    Native,

    /// No output device; playback completes silently
    Headless,
}

impl Platform {
    pub fn id(&self) -> &'static str {
        match self {
            Platform::Native => "native",
            Platform::Headless => "headless",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Which adapter the application asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendPreference {
    /// Native if an output device is available, headless otherwise
    #[default]
    Auto,
    Native,
    Headless,
}

/// Platform detection: pick the adapter for this process
pub fn select_backend(
    preference: BackendPreference,
) -> Result<Arc<dyn AudioBackend>, SoundError> {
    match preference {
        BackendPreference::Headless => Ok(Arc::new(HeadlessBackend::new())),
        BackendPreference::Native => Ok(Arc::new(NativeBackend::open()?)),
        BackendPreference::Auto => match NativeBackend::open() {
            Ok(backend) => Ok(Arc::new(backend)),
            Err(e) => {
                tracing::warn!("No audio output available, falling back to headless: {}", e);
                Ok(Arc::new(HeadlessBackend::new()))
            }
        },
    }
}
