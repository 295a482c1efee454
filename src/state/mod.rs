/// State management module
///
/// Lifecycle of the sound manager.

pub mod lifecycle;

// Re-export commonly used types
pub use lifecycle::{LifecycleMachine, LifecycleState, TransitionError};
