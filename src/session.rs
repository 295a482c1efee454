/// Audio session
///
/// A view-side adapter over a shared [`SoundManager`]: caches settings and
/// status for display, and follows settings broadcast by anyone else
/// holding the same manager.
use crossbeam_channel::Receiver;

use crate::audio_system::{AudioSettings, AudioSettingsPatch, SoundManager, SoundStatus, SoundType};
use crate::error::SoundError;
use crate::messaging::{Event, SubscriberId, Topic};

pub struct AudioSession {
    manager: SoundManager,
    settings_events: Receiver<Event>,
    subscription: SubscriberId,
    initialized: bool,
    settings: AudioSettings,
    status: Option<SoundStatus>,
}

impl AudioSession {
    pub fn new(manager: SoundManager) -> Self {
        let (settings_events, subscription) =
            manager.bus().subscribe_topic(Topic::AudioSettingsChanged);
        let settings = manager.get_settings();

        Self {
            manager,
            settings_events,
            subscription,
            initialized: false,
            settings,
            status: None,
        }
    }

    /// Initialize the underlying manager. A failed attempt may be retried.
    pub fn init(&mut self) -> Result<(), SoundError> {
        if self.initialized {
            return Ok(());
        }
        self.manager.init()?;
        self.initialized = true;
        self.settings = self.manager.get_settings();
        self.status = Some(self.manager.get_sound_status());
        Ok(())
    }

    /// Play a sound; ignored until the session is initialized
    pub fn play_sound(&self, sound: SoundType, volume: Option<f32>) {
        if !self.initialized {
            tracing::debug!("Audio session not initialized, ignoring {}", sound);
            return;
        }
        self.manager.play_sound(sound, volume);
    }

    /// Play a sound at full volume for a settings preview
    pub fn play_test_sound(&self, sound: SoundType) {
        if self.initialized && self.settings.sound_enabled {
            self.manager.play_sound(sound, Some(1.0));
        }
    }

    /// Apply the fields present in `patch`
    pub fn update_settings(&mut self, patch: AudioSettingsPatch) {
        if let Some(volume) = patch.master_volume {
            self.manager.set_master_volume(volume);
        }
        if let Some(volume) = patch.sound_volume {
            self.manager.set_sound_volume(volume);
        }
        if let Some(enabled) = patch.sound_enabled {
            self.manager.set_sound_enabled(enabled);
        }
        if let Some(enabled) = patch.music_enabled {
            self.manager.set_music_enabled(enabled);
        }
        self.sync();
    }

    pub fn set_master_volume(&mut self, volume: f32) {
        self.update_settings(AudioSettingsPatch {
            master_volume: Some(volume),
            ..AudioSettingsPatch::default()
        });
    }

    pub fn set_sound_volume(&mut self, volume: f32) {
        self.update_settings(AudioSettingsPatch {
            sound_volume: Some(volume),
            ..AudioSettingsPatch::default()
        });
    }

    pub fn set_sound_enabled(&mut self, enabled: bool) {
        self.update_settings(AudioSettingsPatch {
            sound_enabled: Some(enabled),
            ..AudioSettingsPatch::default()
        });
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.manager.set_muted(muted);
        self.sync();
    }

    /// Apply settings broadcasts received since the last call and refresh
    /// the cached status
    pub fn sync(&mut self) {
        for event in self.settings_events.try_iter() {
            if let Event::AudioSettingsChanged(settings) = event {
                self.settings = settings;
            }
        }
        self.initialized = self.manager.is_initialized();
        self.status = Some(self.manager.get_sound_status());
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn settings(&self) -> AudioSettings {
        self.settings
    }

    /// Status as of the last `init` or `sync`
    pub fn status(&self) -> Option<&SoundStatus> {
        self.status.as_ref()
    }

    pub fn manager(&self) -> &SoundManager {
        &self.manager
    }
}

impl Drop for AudioSession {
    fn drop(&mut self) {
        self.manager.bus().unsubscribe(self.subscription);
    }
}
