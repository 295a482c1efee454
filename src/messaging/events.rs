/// Event types for the sound subsystem
///
/// Events represent things that have happened (past tense).
/// They are broadcast to subscribers of their topic.
use std::fmt;

use crate::audio_system::{AudioSettings, InstanceId, SoundType};

/// Sound subsystem events
#[derive(Debug, Clone)]
pub enum Event {
    /// Settings were changed and persisted
    AudioSettingsChanged(AudioSettings),

    /// A playback instance was registered
    SoundStarted {
        sound: SoundType,
        instance: InstanceId,
    },

    /// A playback instance ended on its own and its handle was pooled
    SoundFinished {
        sound: SoundType,
        instance: InstanceId,
    },

    /// A play request went nowhere
    SoundDropped { sound: SoundType, reason: String },

    /// The manager finished initializing
    AudioReady,

    /// The manager was torn down
    AudioDestroyed,
}

/// Event topic, the unit of subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    AudioSettingsChanged,
    Playback,
    Lifecycle,
}

impl Topic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::AudioSettingsChanged => "audio-settings-changed",
            Topic::Playback => "audio-playback",
            Topic::Lifecycle => "audio-lifecycle",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Event {
    pub fn topic(&self) -> Topic {
        match self {
            Event::AudioSettingsChanged(_) => Topic::AudioSettingsChanged,
            Event::SoundStarted { .. }
            | Event::SoundFinished { .. }
            | Event::SoundDropped { .. } => Topic::Playback,
            Event::AudioReady | Event::AudioDestroyed => Topic::Lifecycle,
        }
    }

    /// Get a human-readable description of the event
    pub fn description(&self) -> String {
        match self {
            Event::AudioSettingsChanged(settings) => format!(
                "Audio settings changed (enabled={}, master={:.2}, sound={:.2})",
                settings.sound_enabled, settings.master_volume, settings.sound_volume
            ),
            Event::SoundStarted { sound, .. } => format!("Sound started: {}", sound),
            Event::SoundFinished { sound, .. } => format!("Sound finished: {}", sound),
            Event::SoundDropped { sound, reason } => {
                format!("Sound dropped: {} ({})", sound, reason)
            }
            Event::AudioReady => "Audio ready".to_string(),
            Event::AudioDestroyed => "Audio destroyed".to_string(),
        }
    }
}
