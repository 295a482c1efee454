/// Live playback instances
use std::fmt;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use rand::distributions::Alphanumeric;
use rand::Rng;

use super::backend::AudioHandle;
use super::source::SoundType;

/// Unique id of one playback
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InstanceId(String);

impl InstanceId {
    /// `sound_<unix millis>_<9 random chars>`
    pub fn generate() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(9)
            .map(|c| char::from(c).to_ascii_lowercase())
            .collect();
        Self(format!("sound_{millis}_{suffix}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Playback lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AudioState {
    #[default]
    Idle,
    Loading,
    Playing,
    Paused,
    Error,
}

/// A handle currently in use plus its bookkeeping
pub struct AudioInstance {
    pub id: InstanceId,
    pub sound: SoundType,
    pub state: AudioState,
    pub handle: Box<dyn AudioHandle>,
    pub started_at: Instant,
    pub volume: f32,
}

impl AudioInstance {
    pub fn playing(sound: SoundType, handle: Box<dyn AudioHandle>, volume: f32) -> Self {
        Self {
            id: InstanceId::generate(),
            sound,
            state: AudioState::Playing,
            handle,
            started_at: Instant::now(),
            volume,
        }
    }
}

impl fmt::Debug for AudioInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioInstance")
            .field("id", &self.id)
            .field("sound", &self.sound)
            .field("state", &self.state)
            .field("volume", &self.volume)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_id_format() {
        let id = InstanceId::generate();
        let parts: Vec<&str> = id.as_str().split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "sound");
        assert_eq!(parts[2].len(), 9);
    }

    #[test]
    fn test_instance_ids_unique() {
        let a = InstanceId::generate();
        let b = InstanceId::generate();
        assert_ne!(a, b);
    }
}
