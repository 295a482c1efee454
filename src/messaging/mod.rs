/// Messaging module for sound events
///
/// ## Architecture
///
/// ```text
/// ┌──────────────┐   publish    ┌─────────────┐
/// │ SoundManager │ ───────────> │  Event Bus  │
/// └──────────────┘              └─────────────┘
///                                      │
///                                      │ per-topic delivery
///                                      ▼
///                               ┌──────────────┐
///                               │ Subscribers  │
///                               │ (sessions,   │
///                               │  UI, etc.)   │
///                               └──────────────┘
/// ```
///
/// ## Usage
///
/// ```rust,ignore
/// let event_bus = EventBus::new();
///
/// // React to settings changes without polling
/// let (rx, id) = event_bus.subscribe_topic(Topic::AudioSettingsChanged);
///
/// while let Ok(event) = rx.recv() {
///     if let Event::AudioSettingsChanged(settings) = event {
///         /* refresh settings screen */
///     }
/// }
///
/// event_bus.unsubscribe(id);
/// ```

pub mod bus;
pub mod events;

// Re-export commonly used types
pub use bus::{EventBus, SubscriberId};
pub use events::{Event, Topic};
