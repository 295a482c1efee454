/// Sound effect system
///
/// Plays short sound effects through a platform adapter, reusing finished
/// handles and capping how many sounds play at once.
///
/// ## Architecture
///
/// ```text
/// SoundManager ──admit──> PlaybackWorker (one thread)
///   ├── SoundTables (one lock)          │
///   │     ├── settings / config         ├── take pooled or create handle
///   │     ├── file load state           ├── start, retry once on failure
///   │     └── HandleTable               └── register live instance
///   │           ├── Pooled (idle)
///   │           └── Live (playing)  <──ended── AudioBackend
///   └── KeyValueStore (settings)             ├── Native (rodio)
///                                            └── Headless
/// ```
///
/// ## Usage
///
/// ```rust,ignore
/// let backend = select_backend(BackendPreference::Auto)?;
/// let manager = SoundManager::new(backend, store, EventBus::new(), ManagerOptions::default());
/// manager.init()?;
/// manager.play_sound(SoundType::BubblePop, None);
/// ```
pub mod backend;
pub mod instance;
pub mod manager;
mod player;
pub mod pool;
pub mod settings;
pub mod source;

// Re-export commonly used types
pub use backend::{select_backend, AudioBackend, AudioHandle, BackendPreference, Platform};
pub use instance::{AudioInstance, AudioState, InstanceId};
pub use manager::{ManagerOptions, SoundLoadStatus, SoundManager, SoundStatus};
pub use pool::{HandleTable, StopReport};
pub use settings::{clamp01, effective_volume, AudioManagerConfig, AudioSettings, AudioSettingsPatch};
pub use source::{AudioFileInfo, SoundConfig, SoundType, UnknownSoundName};
