/// Sound manager
///
/// Owns sound configuration, file load state, the handle pool and the live
/// playback table. One manager is built at the application's composition
/// root and shared by cloning it; clones all refer to the same state.
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use rayon::prelude::*;
use serde::Serialize;
use serde_json::Value;

use super::backend::{AudioBackend, AudioHandle, Platform};
use super::instance::InstanceId;
use super::player::{PlayRequest, PlaybackWorker};
use super::pool::{HandleTable, StopReport};
use super::settings::{clamp01, effective_volume, AudioManagerConfig, AudioSettings};
use super::source::{AudioFileInfo, SoundConfig, SoundType};
use crate::error::{SoundError, StoreError};
use crate::messaging::{Event, EventBus};
use crate::state::{LifecycleMachine, LifecycleState};
use crate::storage::KeyValueStore;

/// Construction options
#[derive(Debug, Clone)]
pub struct ManagerOptions {
    pub config: AudioManagerConfig,
    pub sounds_dir: PathBuf,
    pub catalog: Vec<SoundConfig>,
}

impl Default for ManagerOptions {
    fn default() -> Self {
        Self {
            config: AudioManagerConfig::default(),
            sounds_dir: PathBuf::from("static/sounds"),
            catalog: SoundConfig::defaults(),
        }
    }
}

/// Load state of one sound, as reported by [`SoundManager::get_sound_status`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SoundLoadStatus {
    #[serde(rename = "type")]
    pub sound: SoundType,
    pub loaded: bool,
    pub error: Option<String>,
}

/// Read-only snapshot of the manager
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SoundStatus {
    pub initialized: bool,
    pub platform: Platform,
    pub playing_count: usize,
    pub playing_sounds: Vec<SoundType>,
    pub pooled_count: usize,
    pub max_concurrent_sounds: usize,
    pub muted: bool,
    pub loaded_sounds: Vec<SoundLoadStatus>,
    pub settings: AudioSettings,
}

/// Mutable tables, guarded by one lock
pub(crate) struct SoundTables {
    pub config: AudioManagerConfig,
    pub settings: AudioSettings,
    pub sound_configs: HashMap<SoundType, SoundConfig>,
    pub files: BTreeMap<SoundType, AudioFileInfo>,
    pub handles: HandleTable,
    /// Admitted requests not yet registered or dropped by the worker
    pub pending: usize,
    /// Bumped by every forced stop; requests admitted earlier never register
    pub stop_epoch: u64,
}

impl SoundTables {
    fn stop_all(&mut self) -> StopReport {
        self.stop_epoch += 1;
        self.handles.stop_all()
    }
}

/// State shared with the playback worker
pub(crate) struct Shared {
    pub backend: Arc<dyn AudioBackend>,
    pub bus: EventBus,
    pub tables: Mutex<SoundTables>,
}

struct ManagerInner {
    shared: Arc<Shared>,
    store: Arc<dyn KeyValueStore>,
    sounds_dir: PathBuf,
    lifecycle: Mutex<LifecycleMachine>,
    lifecycle_changed: Condvar,
    worker: PlaybackWorker,
}

impl Drop for ManagerInner {
    fn drop(&mut self) {
        self.worker.shutdown();
        for mut handle in self.shared.tables.lock().handles.drain() {
            handle.release();
        }
    }
}

/// Cross-platform sound effect manager
#[derive(Clone)]
pub struct SoundManager {
    inner: Arc<ManagerInner>,
}

impl SoundManager {
    /// Create a manager; call [`SoundManager::init`] before playing
    pub fn new(
        backend: Arc<dyn AudioBackend>,
        store: Arc<dyn KeyValueStore>,
        bus: EventBus,
        options: ManagerOptions,
    ) -> Self {
        let settings = AudioSettings {
            master_volume: clamp01(options.config.master_volume),
            ..AudioSettings::default()
        };
        let sound_configs = options
            .catalog
            .iter()
            .map(|config| (config.sound, *config))
            .collect();

        let shared = Arc::new(Shared {
            backend,
            bus,
            tables: Mutex::new(SoundTables {
                config: options.config,
                settings,
                sound_configs,
                files: BTreeMap::new(),
                handles: HandleTable::new(),
                pending: 0,
                stop_epoch: 0,
            }),
        });

        let worker = PlaybackWorker::spawn(Arc::clone(&shared));

        Self {
            inner: Arc::new(ManagerInner {
                shared,
                store,
                sounds_dir: options.sounds_dir,
                lifecycle: Mutex::new(LifecycleMachine::new()),
                lifecycle_changed: Condvar::new(),
                worker,
            }),
        }
    }

    fn shared(&self) -> &Shared {
        &self.inner.shared
    }

    /// Initialize: load settings, register sound files, preload.
    ///
    /// Idempotent. A call made while another is in flight waits for it and
    /// returns the same outcome. A failed attempt leaves the manager
    /// uninitialized so a later call can retry.
    pub fn init(&self) -> Result<(), SoundError> {
        let attempt = {
            let mut lifecycle = self.inner.lifecycle.lock();
            match lifecycle.state() {
                LifecycleState::Ready { .. } => return Ok(()),
                LifecycleState::Initializing { attempt } => {
                    while lifecycle.state() == (LifecycleState::Initializing { attempt }) {
                        self.inner.lifecycle_changed.wait(&mut lifecycle);
                    }
                    return match lifecycle.state() {
                        LifecycleState::Ready { .. } => Ok(()),
                        _ => Err(SoundError::InitFailed(
                            lifecycle
                                .failure_of(attempt)
                                .unwrap_or("initialization was cancelled")
                                .to_string(),
                        )),
                    };
                }
                LifecycleState::Uninitialized => lifecycle
                    .begin_init()
                    .map_err(|e| SoundError::InitFailed(e.to_string()))?,
            }
        };

        let result = self.run_init();

        let mut lifecycle = self.inner.lifecycle.lock();
        let transition = match &result {
            Ok(()) => lifecycle.mark_ready(attempt),
            Err(e) => lifecycle.mark_failed(attempt, e.to_string()),
        };
        drop(lifecycle);
        self.inner.lifecycle_changed.notify_all();

        match (result, transition) {
            (Ok(()), Ok(())) => {
                tracing::info!("Sound manager initialized on {}", self.platform());
                self.shared().bus.publish(Event::AudioReady);
                Ok(())
            }
            (Ok(()), Err(_)) => {
                // Torn down while loading; drop what this attempt registered
                self.clear_tables();
                Err(SoundError::InitFailed(
                    "initialization was cancelled".to_string(),
                ))
            }
            (Err(e), _) => {
                tracing::error!("Sound manager initialization failed: {}", e);
                Err(e)
            }
        }
    }

    fn run_init(&self) -> Result<(), SoundError> {
        let defaults = self.shared().tables.lock().settings;
        let settings = self.load_settings(defaults)?;

        let enable_preload = {
            let mut tables = self.shared().tables.lock();
            tables.settings = settings;
            tables.config.master_volume = settings.master_volume;
            tables.files = SoundType::ALL
                .iter()
                .map(|sound| {
                    let path = sound.file_path(&self.inner.sounds_dir);
                    (*sound, AudioFileInfo::new(path))
                })
                .collect();
            tables.config.enable_preload
        };

        if enable_preload {
            self.preload_sounds();
        }
        Ok(())
    }

    /// Read persisted settings, merged over `defaults`.
    ///
    /// A missing or unreadable record keeps the defaults; only a failing
    /// store is an error.
    fn load_settings(&self, defaults: AudioSettings) -> Result<AudioSettings, SoundError> {
        let Some(saved) = self.inner.store.get(AudioSettings::STORAGE_KEY)? else {
            tracing::debug!("No saved audio settings, using defaults");
            return Ok(defaults);
        };

        let mut merged = match serde_json::to_value(defaults) {
            Ok(Value::Object(map)) => map,
            _ => return Ok(defaults),
        };
        match saved {
            Value::Object(saved) => merged.extend(saved),
            other => {
                tracing::warn!("Ignoring malformed audio settings: {}", other);
                return Ok(defaults);
            }
        }

        match serde_json::from_value::<AudioSettings>(Value::Object(merged)) {
            Ok(settings) => Ok(settings.normalized()),
            Err(e) => {
                tracing::warn!("Ignoring malformed audio settings: {}", e);
                Ok(defaults)
            }
        }
    }

    /// Load every sound flagged for preloading, in parallel.
    ///
    /// Individual failures are recorded on the sound's file info and logged.
    pub fn preload_sounds(&self) {
        let targets: Vec<(SoundType, PathBuf)> = {
            let tables = self.shared().tables.lock();
            tables
                .sound_configs
                .values()
                .filter(|config| config.preload)
                .filter_map(|config| {
                    let info = tables.files.get(&config.sound)?;
                    (!info.loaded).then(|| (config.sound, info.path.clone()))
                })
                .collect()
        };

        let backend = &self.shared().backend;
        let outcomes: Vec<(SoundType, Result<Box<dyn AudioHandle>, SoundError>)> = targets
            .into_par_iter()
            .map(|(sound, path)| (sound, backend.create(&path)))
            .collect();

        let total = outcomes.len();
        let loaded = outcomes
            .into_iter()
            .map(|(sound, outcome)| self.record_load(sound, outcome))
            .filter(Result::is_ok)
            .count();

        tracing::info!("Preloaded {}/{} sounds", loaded, total);
    }

    /// Load one sound into the pool. No-op if already loaded.
    pub fn load_sound(&self, sound: SoundType) -> Result<(), SoundError> {
        let path = {
            let tables = self.shared().tables.lock();
            match tables.files.get(&sound) {
                None => return Err(SoundError::NotRegistered(sound)),
                Some(info) if info.loaded => return Ok(()),
                Some(info) => info.path.clone(),
            }
        };

        let outcome = self.shared().backend.create(&path);
        self.record_load(sound, outcome)
    }

    fn record_load(
        &self,
        sound: SoundType,
        outcome: Result<Box<dyn AudioHandle>, SoundError>,
    ) -> Result<(), SoundError> {
        let mut tables = self.shared().tables.lock();
        let tables = &mut *tables;

        match outcome {
            Ok(mut handle) => {
                let Some(info) = tables.files.get_mut(&sound) else {
                    // Torn down while loading
                    handle.release();
                    return Err(SoundError::NotRegistered(sound));
                };
                info.loaded = true;
                info.error = None;
                tables.handles.insert_pooled(sound, handle);
                tracing::debug!("Loaded sound {}", sound);
                Ok(())
            }
            Err(e) => {
                if let Some(info) = tables.files.get_mut(&sound) {
                    info.error = Some(e.to_string());
                }
                tracing::warn!("Failed to load sound {}: {}", sound, e);
                Err(e)
            }
        }
    }

    /// Play a sound effect without waiting for it.
    ///
    /// `volume` overrides the type's configured volume. Requests that cannot
    /// be admitted are logged and dropped.
    pub fn play_sound(&self, sound: SoundType, volume: Option<f32>) {
        if let Err(e) = self.try_play_sound(sound, volume) {
            match e {
                SoundError::SoundDisabled | SoundError::Muted => {
                    tracing::debug!("Not playing {}: {}", sound, e)
                }
                _ => tracing::warn!("Not playing {}: {}", sound, e),
            }
            self.shared().bus.publish(Event::SoundDropped {
                sound,
                reason: e.to_string(),
            });
        }
    }

    /// Admit a play request and hand it to the playback worker.
    ///
    /// `Ok` means the request was queued; playback failures after that point
    /// are handled by the worker and never reported here.
    pub fn try_play_sound(&self, sound: SoundType, volume: Option<f32>) -> Result<(), SoundError> {
        let request = {
            let mut tables = self.shared().tables.lock();

            if !tables.settings.sound_enabled {
                return Err(SoundError::SoundDisabled);
            }
            if tables.config.muted {
                return Err(SoundError::Muted);
            }
            let max = tables.config.max_concurrent_sounds;
            if tables.handles.live_count() + tables.pending >= max {
                return Err(SoundError::AtCapacity { max });
            }
            let config = tables
                .sound_configs
                .get(&sound)
                .ok_or(SoundError::UnknownSound(sound))?;
            let requested = volume.unwrap_or(config.volume);
            let path = tables
                .files
                .get(&sound)
                .map(|info| info.path.clone())
                .ok_or(SoundError::NotRegistered(sound))?;

            tables.pending += 1;
            PlayRequest {
                sound,
                path,
                volume: effective_volume(
                    requested,
                    tables.settings.master_volume,
                    tables.settings.sound_volume,
                ),
                epoch: tables.stop_epoch,
            }
        };

        self.inner.worker.submit(request).map_err(|e| {
            let mut tables = self.shared().tables.lock();
            tables.pending = tables.pending.saturating_sub(1);
            e
        })
    }

    /// Stop every live sound and return the handles to the pool.
    ///
    /// Requests still in flight are cancelled too.
    pub fn stop_all_sounds(&self) -> StopReport {
        let report = self.shared().tables.lock().stop_all();
        if report.repooled + report.released > 0 {
            tracing::info!(
                "Stopped {} sounds ({} released after failed stop)",
                report.repooled + report.released,
                report.released
            );
        }
        report
    }

    /// Set master volume (clamped to 0.0-1.0)
    pub fn set_master_volume(&self, volume: f32) {
        let settings = {
            let mut tables = self.shared().tables.lock();
            let volume = clamp01(volume);
            tables.config.master_volume = volume;
            tables.settings.master_volume = volume;
            tables.settings
        };
        self.persist(settings);
    }

    /// Set sound effect volume (clamped to 0.0-1.0)
    pub fn set_sound_volume(&self, volume: f32) {
        let settings = {
            let mut tables = self.shared().tables.lock();
            tables.settings.sound_volume = clamp01(volume);
            tables.settings
        };
        self.persist(settings);
    }

    /// Mute or unmute. Muting stops everything; unmuting resumes nothing.
    pub fn set_muted(&self, muted: bool) {
        let settings = {
            let mut tables = self.shared().tables.lock();
            tables.config.muted = muted;
            if muted {
                tables.stop_all();
            }
            tables.settings
        };
        tracing::info!("Audio {}", if muted { "muted" } else { "unmuted" });
        self.persist(settings);
    }

    /// Turn sound effects on or off. Turning off stops everything.
    pub fn set_sound_enabled(&self, enabled: bool) {
        let settings = {
            let mut tables = self.shared().tables.lock();
            tables.settings.sound_enabled = enabled;
            if !enabled {
                tables.stop_all();
            }
            tables.settings
        };
        self.persist(settings);
    }

    /// Change the concurrency cap. Sounds already playing are not stopped.
    pub fn set_max_concurrent_sounds(&self, max: usize) {
        self.shared().tables.lock().config.max_concurrent_sounds = max;
        tracing::debug!("Concurrency cap set to {}", max);
    }

    /// Reserved background music switch; persisted only
    pub fn set_music_enabled(&self, enabled: bool) {
        let settings = {
            let mut tables = self.shared().tables.lock();
            tables.settings.music_enabled = enabled;
            tables.settings
        };
        self.persist(settings);
    }

    /// Write settings to the store, then broadcast them
    fn persist(&self, settings: AudioSettings) {
        let written = serde_json::to_value(settings)
            .map_err(StoreError::from)
            .and_then(|value| self.inner.store.set(AudioSettings::STORAGE_KEY, value));
        if let Err(e) = written {
            tracing::warn!("Failed to save audio settings: {}", e);
        }
        self.shared().bus.publish(Event::AudioSettingsChanged(settings));
    }

    /// Copy of the current settings
    pub fn get_settings(&self) -> AudioSettings {
        self.shared().tables.lock().settings
    }

    /// Copy of the current manager configuration
    pub fn config(&self) -> AudioManagerConfig {
        self.shared().tables.lock().config
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.lifecycle.lock().state().is_ready()
    }

    pub fn platform(&self) -> Platform {
        self.shared().backend.platform()
    }

    pub fn playing_count(&self) -> usize {
        self.shared().tables.lock().handles.live_count()
    }

    /// Whether `instance` is still registered as playing
    pub fn is_playing(&self, instance: &InstanceId) -> bool {
        self.shared().tables.lock().handles.is_live(instance)
    }

    pub fn pooled_count(&self, sound: SoundType) -> usize {
        self.shared().tables.lock().handles.pooled_count(sound)
    }

    pub fn bus(&self) -> &EventBus {
        &self.shared().bus
    }

    /// Snapshot of manager state
    pub fn get_sound_status(&self) -> SoundStatus {
        let initialized = self.is_initialized();
        let tables = self.shared().tables.lock();
        SoundStatus {
            initialized,
            platform: self.shared().backend.platform(),
            playing_count: tables.handles.live_count(),
            playing_sounds: {
                let mut sounds = tables.handles.live_sounds();
                sounds.sort();
                sounds
            },
            pooled_count: tables.handles.total_pooled(),
            max_concurrent_sounds: tables.config.max_concurrent_sounds,
            muted: tables.config.muted,
            loaded_sounds: tables
                .files
                .iter()
                .map(|(sound, info)| SoundLoadStatus {
                    sound: *sound,
                    loaded: info.loaded,
                    error: info.error.clone(),
                })
                .collect(),
            settings: tables.settings,
        }
    }

    /// Stop everything, forget file entries and release every handle
    fn clear_tables(&self) -> usize {
        let handles = {
            let mut tables = self.shared().tables.lock();
            tables.stop_all();
            tables.files.clear();
            tables.handles.drain()
        };

        let released = handles.len();
        for mut handle in handles {
            handle.release();
        }
        released
    }

    /// Wait until the playback worker has processed everything queued so far
    pub fn flush(&self) {
        self.inner.worker.flush();
    }

    /// Stop and release everything and return to uninitialized.
    ///
    /// Safe to call more than once. The manager can be initialized again.
    pub fn destroy(&self) {
        let released = self.clear_tables();

        self.inner.lifecycle.lock().reset();
        self.inner.lifecycle_changed.notify_all();

        tracing::info!("Sound manager destroyed ({} handles released)", released);
        self.shared().bus.publish(Event::AudioDestroyed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio_system::backend::scripted::ScriptedBackend;
    use crate::messaging::Topic;
    use crate::storage::MemoryStore;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn manager_with(
        backend: &ScriptedBackend,
        store: Arc<dyn KeyValueStore>,
        config: AudioManagerConfig,
    ) -> SoundManager {
        SoundManager::new(
            Arc::new(backend.clone()),
            store,
            EventBus::new(),
            ManagerOptions {
                config,
                sounds_dir: PathBuf::from("sounds"),
                catalog: SoundConfig::defaults(),
            },
        )
    }

    fn ready_manager(backend: &ScriptedBackend) -> SoundManager {
        let manager = manager_with(
            backend,
            Arc::new(MemoryStore::new()),
            AudioManagerConfig::default(),
        );
        manager.init().unwrap();
        manager
    }

    fn no_preload() -> AudioManagerConfig {
        AudioManagerConfig {
            enable_preload: false,
            ..AudioManagerConfig::default()
        }
    }

    /// Store whose reads fail a fixed number of times
    struct FlakyStore {
        failures: AtomicUsize,
        inner: MemoryStore,
    }

    impl KeyValueStore for FlakyStore {
        fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
            let remaining = self.failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failures.store(remaining - 1, Ordering::SeqCst);
                return Err(StoreError::Read {
                    key: key.to_string(),
                    source: std::io::Error::new(std::io::ErrorKind::Other, "offline"),
                });
            }
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
            self.inner.set(key, value)
        }
    }

    #[test]
    fn test_init_preloads_flagged_sounds() {
        let backend = ScriptedBackend::new();
        let manager = ready_manager(&backend);

        assert!(manager.is_initialized());
        // Every default sound except ui-click is preloaded
        assert_eq!(backend.created(), 5);
        assert_eq!(manager.pooled_count(SoundType::BubblePop), 1);
        assert_eq!(manager.pooled_count(SoundType::UiClick), 0);

        let status = manager.get_sound_status();
        assert_eq!(status.loaded_sounds.len(), SoundType::ALL.len());
        let ui_click = status
            .loaded_sounds
            .iter()
            .find(|s| s.sound == SoundType::UiClick)
            .unwrap();
        assert!(!ui_click.loaded);
    }

    #[test]
    fn test_init_is_idempotent_and_concurrent_safe() {
        let backend = ScriptedBackend::new();
        let manager = manager_with(
            &backend,
            Arc::new(MemoryStore::new()),
            AudioManagerConfig::default(),
        );

        let threads: Vec<_> = (0..4)
            .map(|_| {
                let manager = manager.clone();
                std::thread::spawn(move || manager.init())
            })
            .collect();
        for thread in threads {
            thread.join().unwrap().unwrap();
        }
        manager.init().unwrap();

        assert_eq!(backend.created(), 5);
    }

    #[test]
    fn test_failed_init_can_be_retried() {
        let backend = ScriptedBackend::new();
        let store = Arc::new(FlakyStore {
            failures: AtomicUsize::new(1),
            inner: MemoryStore::new(),
        });
        let manager = manager_with(&backend, store, AudioManagerConfig::default());

        assert!(matches!(manager.init(), Err(SoundError::Settings(_))));
        assert!(!manager.is_initialized());

        manager.init().unwrap();
        assert!(manager.is_initialized());
    }

    #[test]
    fn test_init_loads_saved_settings() {
        let backend = ScriptedBackend::new();
        let store = Arc::new(MemoryStore::new());
        store
            .set(
                AudioSettings::STORAGE_KEY,
                json!({"soundEnabled": false, "masterVolume": 0.3}),
            )
            .unwrap();

        let manager = manager_with(&backend, store, no_preload());
        manager.init().unwrap();

        let settings = manager.get_settings();
        assert!(!settings.sound_enabled);
        assert_eq!(settings.master_volume, 0.3);
        assert_eq!(settings.sound_volume, 0.8);
        assert_eq!(manager.config().master_volume, 0.3);
    }

    #[test]
    fn test_malformed_saved_settings_fall_back_to_defaults() {
        let backend = ScriptedBackend::new();
        let store = Arc::new(MemoryStore::new());
        store
            .set(AudioSettings::STORAGE_KEY, json!("not an object"))
            .unwrap();

        let manager = manager_with(&backend, store, no_preload());
        manager.init().unwrap();
        assert_eq!(manager.get_settings(), AudioSettings::default());
    }

    #[test]
    fn test_concurrency_cap_admits_exactly_max() {
        let backend = ScriptedBackend::new();
        let manager = ready_manager(&backend);

        for _ in 0..5 {
            manager.try_play_sound(SoundType::BubblePop, None).unwrap();
        }
        assert!(matches!(
            manager.try_play_sound(SoundType::BubblePop, None),
            Err(SoundError::AtCapacity { max: 5 })
        ));

        manager.flush();
        assert_eq!(manager.playing_count(), 5);
    }

    #[test]
    fn test_finished_handles_are_reused() {
        let backend = ScriptedBackend::new();
        let manager = ready_manager(&backend);
        let created = backend.created();

        manager.play_sound(SoundType::BubblePop, None);
        manager.flush();
        assert_eq!(manager.playing_count(), 1);
        assert_eq!(backend.created(), created);

        assert_eq!(backend.finish_all(), 1);
        manager.flush();
        assert_eq!(manager.playing_count(), 0);
        assert_eq!(manager.pooled_count(SoundType::BubblePop), 1);

        manager.play_sound(SoundType::BubblePop, None);
        manager.flush();
        assert_eq!(backend.created(), created);
    }

    #[test]
    fn test_disabled_sound_creates_nothing() {
        let backend = ScriptedBackend::new();
        let manager = manager_with(&backend, Arc::new(MemoryStore::new()), no_preload());
        manager.init().unwrap();

        manager.set_sound_enabled(false);
        assert!(matches!(
            manager.try_play_sound(SoundType::Reward, None),
            Err(SoundError::SoundDisabled)
        ));
        manager.flush();
        assert_eq!(backend.created(), 0);
    }

    #[test]
    fn test_play_before_init_is_rejected() {
        let backend = ScriptedBackend::new();
        let manager = manager_with(&backend, Arc::new(MemoryStore::new()), no_preload());

        assert!(matches!(
            manager.try_play_sound(SoundType::Reward, None),
            Err(SoundError::NotRegistered(SoundType::Reward))
        ));
    }

    #[test]
    fn test_volume_is_scaled_by_settings() {
        let backend = ScriptedBackend::new();
        let manager = ready_manager(&backend);
        manager.set_master_volume(0.5);
        manager.set_sound_volume(0.5);

        manager.play_sound(SoundType::Achievement, Some(0.8));
        manager.flush();

        let volume = backend.last_volume().unwrap();
        assert!((volume - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_setters_clamp_and_persist() {
        let backend = ScriptedBackend::new();
        let store = Arc::new(MemoryStore::new());
        let manager = manager_with(&backend, store.clone(), no_preload());
        let (events, _) = manager.bus().subscribe_topic(Topic::AudioSettingsChanged);

        manager.set_master_volume(1.5);
        manager.set_sound_volume(-0.2);

        let settings = manager.get_settings();
        assert_eq!(settings.master_volume, 1.0);
        assert_eq!(settings.sound_volume, 0.0);
        assert_eq!(manager.config().master_volume, 1.0);

        let saved = store.get(AudioSettings::STORAGE_KEY).unwrap().unwrap();
        assert_eq!(saved["masterVolume"], json!(1.0));
        assert_eq!(saved["soundVolume"], json!(0.0));

        assert_eq!(events.try_iter().count(), 2);
    }

    #[test]
    fn test_settings_are_returned_by_value() {
        let backend = ScriptedBackend::new();
        let manager = ready_manager(&backend);

        let mut copy = manager.get_settings();
        copy.master_volume = 0.1;
        assert_eq!(manager.get_settings().master_volume, 0.8);
    }

    #[test]
    fn test_failed_play_retries_on_fresh_handle() {
        let backend = ScriptedBackend::new();
        let manager = manager_with(&backend, Arc::new(MemoryStore::new()), no_preload());
        manager.init().unwrap();

        backend.fail_next_plays(1);
        manager.play_sound(SoundType::LevelUp, None);
        manager.flush();

        assert_eq!(manager.playing_count(), 1);
        assert_eq!(backend.created(), 2);
    }

    #[test]
    fn test_failed_fallback_drops_request() {
        let backend = ScriptedBackend::new();
        let manager = manager_with(&backend, Arc::new(MemoryStore::new()), no_preload());
        manager.init().unwrap();
        let (events, _) = manager.bus().subscribe_topic(Topic::Playback);

        backend.fail_next_plays(2);
        manager.play_sound(SoundType::LevelUp, None);
        manager.flush();

        assert_eq!(manager.playing_count(), 0);
        assert!(events
            .try_iter()
            .any(|e| matches!(e, Event::SoundDropped { sound: SoundType::LevelUp, .. })));

        // The slot is free again
        manager.play_sound(SoundType::LevelUp, None);
        manager.flush();
        assert_eq!(manager.playing_count(), 1);
    }

    #[test]
    fn test_mute_stops_and_repools() {
        let backend = ScriptedBackend::new();
        let manager = ready_manager(&backend);

        manager.play_sound(SoundType::BubblePop, None);
        manager.play_sound(SoundType::BubblePop, None);
        manager.flush();
        assert_eq!(manager.playing_count(), 2);

        manager.set_muted(true);
        assert_eq!(manager.playing_count(), 0);
        assert_eq!(manager.pooled_count(SoundType::BubblePop), 2);
        assert!(matches!(
            manager.try_play_sound(SoundType::BubblePop, None),
            Err(SoundError::Muted)
        ));

        // Unmuting resumes nothing
        manager.set_muted(false);
        manager.flush();
        assert_eq!(manager.playing_count(), 0);
    }

    #[test]
    fn test_failed_stop_releases_handle() {
        let backend = ScriptedBackend::new();
        let manager = ready_manager(&backend);

        manager.play_sound(SoundType::BubblePop, None);
        manager.play_sound(SoundType::BubblePop, None);
        manager.flush();

        backend.fail_next_stops(1);
        let report = manager.stop_all_sounds();
        assert_eq!(report.repooled, 1);
        assert_eq!(report.released, 1);
        assert_eq!(manager.pooled_count(SoundType::BubblePop), 1);
    }

    #[test]
    fn test_stop_cancels_in_flight_requests() {
        let backend = ScriptedBackend::new();
        let manager = ready_manager(&backend);

        manager.play_sound(SoundType::Reward, None);
        manager.play_sound(SoundType::Reward, None);
        manager.stop_all_sounds();
        manager.flush();

        assert_eq!(manager.playing_count(), 0);
        assert_eq!(manager.get_sound_status().playing_count, 0);
    }

    #[test]
    fn test_destroy_is_idempotent_and_reinitializable() {
        let backend = ScriptedBackend::new();
        let manager = ready_manager(&backend);
        let (events, _) = manager.bus().subscribe_topic(Topic::Lifecycle);

        manager.play_sound(SoundType::Achievement, None);
        manager.flush();

        manager.destroy();
        manager.destroy();
        assert!(!manager.is_initialized());
        assert_eq!(manager.playing_count(), 0);
        assert_eq!(manager.pooled_count(SoundType::BubblePop), 0);
        assert!(manager.get_sound_status().loaded_sounds.is_empty());
        assert!(matches!(
            manager.try_play_sound(SoundType::Achievement, None),
            Err(SoundError::NotRegistered(_))
        ));
        assert_eq!(
            events
                .try_iter()
                .filter(|e| matches!(e, Event::AudioDestroyed))
                .count(),
            2
        );

        manager.init().unwrap();
        assert!(manager.is_initialized());
        assert_eq!(backend.created(), 10);
    }

    #[test]
    fn test_status_serializes_camel_case() {
        let backend = ScriptedBackend::new();
        let manager = ready_manager(&backend);

        let status = serde_json::to_value(manager.get_sound_status()).unwrap();
        assert_eq!(status["initialized"], json!(true));
        assert_eq!(status["playingCount"], json!(0));
        assert_eq!(status["maxConcurrentSounds"], json!(5));
        assert_eq!(status["platform"], json!("headless"));
        assert_eq!(status["loadedSounds"][0]["type"], json!("bubble-pop"));
    }

    #[test]
    fn test_load_failure_is_recorded_not_raised() {
        let backend = ScriptedBackend::new();
        backend.fail_path(SoundType::Reward.file_path(&PathBuf::from("sounds")));
        let manager = manager_with(
            &backend,
            Arc::new(MemoryStore::new()),
            AudioManagerConfig::default(),
        );

        manager.init().unwrap();

        let status = manager.get_sound_status();
        let reward = status
            .loaded_sounds
            .iter()
            .find(|s| s.sound == SoundType::Reward)
            .unwrap();
        assert!(!reward.loaded);
        assert!(reward.error.is_some());

        // The other preloaded sounds are unaffected
        assert_eq!(backend.created(), 4);
        assert_eq!(manager.pooled_count(SoundType::BubblePop), 1);
    }

    #[test]
    fn test_failed_create_falls_back_once() {
        let backend = ScriptedBackend::new();
        let manager = manager_with(&backend, Arc::new(MemoryStore::new()), no_preload());
        manager.init().unwrap();
        let (events, _) = manager.bus().subscribe_topic(Topic::Playback);

        backend.fail_next_creates(1);
        manager.play_sound(SoundType::UiClick, None);
        manager.flush();
        assert_eq!(manager.playing_count(), 1);
        assert_eq!(backend.created(), 1);
        assert_eq!(backend.plays(), 1);

        backend.fail_next_creates(2);
        manager.play_sound(SoundType::UiClick, None);
        manager.flush();
        assert_eq!(manager.playing_count(), 1);
        assert_eq!(backend.created(), 1);
        assert!(events
            .try_iter()
            .any(|e| matches!(e, Event::SoundDropped { sound: SoundType::UiClick, .. })));
    }

    #[test]
    fn test_load_sound_skips_loaded_sounds() {
        let backend = ScriptedBackend::new();
        let manager = ready_manager(&backend);
        let created = backend.created();

        manager.load_sound(SoundType::BubblePop).unwrap();
        assert_eq!(backend.created(), created);
        assert_eq!(manager.pooled_count(SoundType::BubblePop), 1);

        manager.load_sound(SoundType::UiClick).unwrap();
        assert_eq!(backend.created(), created + 1);
        manager.load_sound(SoundType::UiClick).unwrap();
        assert_eq!(backend.created(), created + 1);
    }

    #[test]
    fn test_lowered_cap_rejects_until_raised() {
        let backend = ScriptedBackend::new();
        let manager = ready_manager(&backend);

        manager.set_max_concurrent_sounds(0);
        assert!(matches!(
            manager.try_play_sound(SoundType::Reward, None),
            Err(SoundError::AtCapacity { max: 0 })
        ));

        manager.set_max_concurrent_sounds(5);
        manager.try_play_sound(SoundType::Reward, None).unwrap();
        manager.flush();
        assert_eq!(manager.playing_count(), 1);
    }

    #[test]
    fn test_status_lists_playing_sounds() {
        let backend = ScriptedBackend::new();
        let manager = ready_manager(&backend);
        let (events, _) = manager.bus().subscribe_topic(Topic::Playback);

        manager.play_sound(SoundType::Reward, None);
        manager.play_sound(SoundType::BubblePop, None);
        manager.flush();

        let status = manager.get_sound_status();
        assert_eq!(
            status.playing_sounds,
            vec![SoundType::BubblePop, SoundType::Reward]
        );

        let started: Vec<InstanceId> = events
            .try_iter()
            .filter_map(|e| match e {
                Event::SoundStarted { instance, .. } => Some(instance),
                _ => None,
            })
            .collect();
        assert_eq!(started.len(), 2);
        assert!(started.iter().all(|id| manager.is_playing(id)));

        manager.stop_all_sounds();
        assert!(!manager.is_playing(&started[0]));
        assert!(manager.get_sound_status().playing_sounds.is_empty());
    }
}
