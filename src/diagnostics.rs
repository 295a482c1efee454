/// Sound system self-test
///
/// Exercises a live manager end to end and reports which behaviors work on
/// this machine. Settings touched by the checks are restored afterwards.
use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::audio_system::{AudioManagerConfig, AudioSettings, Platform, SoundManager, SoundType};
use crate::error::SoundError;
use crate::messaging::{Event, Topic};
use crate::storage::KeyValueStore;

/// Ten rapid plays must be admitted within this budget
const PERFORMANCE_BUDGET: Duration = Duration::from_secs(2);

/// Outcome of a full diagnostic run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestSummary {
    pub platform: Platform,
    pub success: bool,
    pub results: BTreeMap<String, bool>,
    pub timestamp_ms: u64,
}

pub struct AudioSystemTester {
    manager: SoundManager,
    store: Option<Arc<dyn KeyValueStore>>,
    pause: Duration,
}

impl AudioSystemTester {
    pub fn new(manager: SoundManager) -> Self {
        Self {
            manager,
            store: None,
            pause: Duration::from_millis(100),
        }
    }

    /// Also verify that settings reach this store
    pub fn with_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Time given to the output between steps
    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    /// Run every check; a failing check does not stop the rest
    pub fn run_full_test(&self) -> TestSummary {
        let platform = self.manager.platform();
        tracing::info!("Running sound system diagnostics on {}", platform);

        let saved = self.manager.get_settings();
        let saved_config = self.manager.config();

        let checks: [(&str, fn(&Self) -> bool); 8] = [
            ("initialization", Self::check_initialization),
            ("sound_playback", Self::check_sound_playback),
            ("volume_control", Self::check_volume_control),
            ("mute_function", Self::check_mute_function),
            ("concurrent_playback", Self::check_concurrent_playback),
            ("settings_persistence", Self::check_settings_persistence),
            ("error_handling", Self::check_error_handling),
            ("performance", Self::check_performance),
        ];

        let mut results = BTreeMap::new();
        for (name, check) in checks {
            let passed = check(self);
            if passed {
                tracing::info!("Diagnostic {}: passed", name);
            } else {
                tracing::warn!("Diagnostic {}: FAILED", name);
            }
            results.insert(name.to_string(), passed);
        }

        self.restore(saved, saved_config);

        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();

        TestSummary {
            platform,
            success: results.values().all(|passed| *passed),
            results,
            timestamp_ms,
        }
    }

    fn restore(&self, settings: AudioSettings, config: AudioManagerConfig) {
        self.manager.stop_all_sounds();
        self.manager.set_max_concurrent_sounds(config.max_concurrent_sounds);
        self.manager.set_master_volume(settings.master_volume);
        self.manager.set_sound_volume(settings.sound_volume);
        self.manager.set_sound_enabled(settings.sound_enabled);
        self.manager.set_music_enabled(settings.music_enabled);
        self.manager.set_muted(config.muted);
        self.manager.flush();
    }

    fn settle(&self) {
        self.manager.flush();
        thread::sleep(self.pause);
    }

    fn check_initialization(&self) -> bool {
        match self.manager.init() {
            Ok(()) => self.manager.get_sound_status().initialized,
            Err(e) => {
                tracing::error!("Initialization failed: {}", e);
                false
            }
        }
    }

    fn check_sound_playback(&self) -> bool {
        let sounds = [
            SoundType::BubblePop,
            SoundType::Achievement,
            SoundType::LevelUp,
            SoundType::CountdownComplete,
            SoundType::Reward,
        ];
        self.manager.stop_all_sounds();
        let (events, subscription) = self.manager.bus().subscribe_topic(Topic::Playback);

        let mut admitted = 0;
        for sound in sounds {
            match self.manager.try_play_sound(sound, Some(0.1)) {
                Ok(()) => admitted += 1,
                Err(e) => tracing::warn!("Could not play {}: {}", sound, e),
            }
            self.settle();
        }

        self.manager.bus().unsubscribe(subscription);
        let dropped = events
            .try_iter()
            .filter(|event| matches!(event, Event::SoundDropped { .. }))
            .count();

        tracing::debug!("Sound playback: {}/{} admitted, {} dropped", admitted, sounds.len(), dropped);
        admitted == sounds.len() && dropped == 0
    }

    fn check_volume_control(&self) -> bool {
        let steps: [(fn(&SoundManager, f32), fn(&AudioSettings) -> f32, f32); 4] = [
            (SoundManager::set_master_volume, |s| s.master_volume, 0.5),
            (SoundManager::set_master_volume, |s| s.master_volume, 0.8),
            (SoundManager::set_sound_volume, |s| s.sound_volume, 0.3),
            (SoundManager::set_sound_volume, |s| s.sound_volume, 0.7),
        ];

        steps.iter().all(|(set, get, volume)| {
            set(&self.manager, *volume);
            get(&self.manager.get_settings()) == *volume
        })
    }

    fn check_mute_function(&self) -> bool {
        self.manager.set_muted(true);
        let silenced = matches!(
            self.manager.try_play_sound(SoundType::BubblePop, Some(1.0)),
            Err(SoundError::Muted)
        );
        let stopped = self.manager.playing_count() == 0;
        self.settle();

        self.manager.set_muted(false);
        let resumed = self
            .manager
            .try_play_sound(SoundType::BubblePop, Some(0.2))
            .is_ok();
        self.settle();

        silenced && stopped && resumed
    }

    fn check_concurrent_playback(&self) -> bool {
        self.manager.play_sound(SoundType::BubblePop, Some(0.3));
        self.manager.play_sound(SoundType::Achievement, Some(0.3));
        self.settle();

        let status = self.manager.get_sound_status();
        status.playing_count <= status.max_concurrent_sounds
    }

    fn check_settings_persistence(&self) -> bool {
        self.manager.set_master_volume(0.6);
        self.manager.set_sound_volume(0.4);

        let settings = self.manager.get_settings();
        let applied = settings.master_volume == 0.6 && settings.sound_volume == 0.4;

        let persisted = match &self.store {
            None => true,
            Some(store) => match store.get(AudioSettings::STORAGE_KEY) {
                Ok(Some(saved)) => serde_json::from_value::<AudioSettings>(saved)
                    .map(|saved| saved == settings)
                    .unwrap_or(false),
                Ok(None) => false,
                Err(e) => {
                    tracing::warn!("Could not read back settings: {}", e);
                    false
                }
            },
        };

        applied && persisted
    }

    fn check_error_handling(&self) -> bool {
        // Unknown names are rejected before reaching the manager
        let unknown_rejected = "non-existent-sound".parse::<SoundType>().is_err();

        // A full manager drops the request
        let max = self.manager.config().max_concurrent_sounds;
        self.manager.stop_all_sounds();
        self.manager.set_max_concurrent_sounds(0);
        let full_rejected = matches!(
            self.manager.try_play_sound(SoundType::BubblePop, Some(0.1)),
            Err(SoundError::AtCapacity { .. })
        );
        self.manager.set_max_concurrent_sounds(max);

        let enabled = self.manager.get_settings().sound_enabled;
        self.manager.set_sound_enabled(false);
        let disabled_rejected = matches!(
            self.manager.try_play_sound(SoundType::BubblePop, Some(0.1)),
            Err(SoundError::SoundDisabled)
        );
        self.manager.set_sound_enabled(enabled);

        // And keeps admitting once the cause is gone
        let recovered = match self.manager.try_play_sound(SoundType::BubblePop, Some(0.1)) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Manager did not recover after rejections: {}", e);
                false
            }
        };
        self.settle();

        unknown_rejected && full_rejected && disabled_rejected && recovered
    }

    fn check_performance(&self) -> bool {
        let interval = self.pause / 2;
        let started = Instant::now();

        for _ in 0..10 {
            self.manager.play_sound(SoundType::BubblePop, Some(0.1));
            thread::sleep(interval);
        }
        self.manager.flush();

        let elapsed = started.elapsed();
        tracing::debug!("Performance: 10 plays in {:?}", elapsed);
        elapsed < PERFORMANCE_BUDGET
    }

    /// Tuning advice for the active platform
    pub fn platform_optimizations(&self) -> Vec<&'static str> {
        match self.manager.platform() {
            Platform::Native => vec![
                "Preload every frequently used sound to avoid decode latency on first play",
                "Keep effect files short; each playing sound holds its decoded samples",
                "Lower max_concurrent_sounds on machines with small audio buffers",
            ],
            Platform::Headless => vec![
                "No audio output device was found; sounds complete silently",
                "Select the native backend explicitly to surface output errors",
            ],
        }
    }
}
