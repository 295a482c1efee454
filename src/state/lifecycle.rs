/// Sound manager lifecycle state machine
///
/// `Uninitialized → Initializing → Ready`, and back to `Uninitialized` on
/// teardown or on a failed initialization.

use std::time::Instant;

/// State of the sound manager
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum LifecycleState {
    /// Not initialized, or torn down
    #[default]
    Uninitialized,

    /// An initialization attempt is running
    Initializing { attempt: u64 },

    /// Initialized and accepting work
    Ready { since: Instant },
}

impl LifecycleState {
    pub fn is_ready(&self) -> bool {
        matches!(self, LifecycleState::Ready { .. })
    }

    pub fn is_initializing(&self) -> bool {
        matches!(self, LifecycleState::Initializing { .. })
    }

    /// Get a human-readable description of the state
    pub fn description(&self) -> &'static str {
        match self {
            LifecycleState::Uninitialized => "Uninitialized",
            LifecycleState::Initializing { .. } => "Initializing...",
            LifecycleState::Ready { .. } => "Ready",
        }
    }
}

/// State transition results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionError {
    /// Cannot start initializing when already ready
    AlreadyReady,

    /// Another attempt is in flight
    InTransition,

    /// The attempt being completed is not the one in flight
    StaleAttempt,
}

impl std::fmt::Display for TransitionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransitionError::AlreadyReady => write!(f, "Sound manager is already initialized"),
            TransitionError::InTransition => write!(f, "Sound manager is initializing"),
            TransitionError::StaleAttempt => write!(f, "Initialization attempt is no longer current"),
        }
    }
}

impl std::error::Error for TransitionError {}

/// State machine for lifecycle transitions
#[derive(Debug, Default)]
pub struct LifecycleMachine {
    state: LifecycleState,
    attempts: u64,
    last_failure: Option<(u64, String)>,
}

impl LifecycleMachine {
    /// Create a new state machine in the Uninitialized state
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the current state
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Start an initialization attempt, returning its number
    pub fn begin_init(&mut self) -> Result<u64, TransitionError> {
        match self.state {
            LifecycleState::Uninitialized => {
                self.attempts += 1;
                self.state = LifecycleState::Initializing {
                    attempt: self.attempts,
                };
                Ok(self.attempts)
            }
            LifecycleState::Initializing { .. } => Err(TransitionError::InTransition),
            LifecycleState::Ready { .. } => Err(TransitionError::AlreadyReady),
        }
    }

    fn check_current(&self, attempt: u64) -> Result<(), TransitionError> {
        match self.state {
            LifecycleState::Initializing { attempt: current } if current == attempt => Ok(()),
            _ => Err(TransitionError::StaleAttempt),
        }
    }

    /// Transition from Initializing to Ready
    pub fn mark_ready(&mut self, attempt: u64) -> Result<(), TransitionError> {
        self.check_current(attempt)?;
        self.state = LifecycleState::Ready {
            since: Instant::now(),
        };
        Ok(())
    }

    /// Transition from Initializing back to Uninitialized, so a later call
    /// can retry
    pub fn mark_failed(&mut self, attempt: u64, message: String) -> Result<(), TransitionError> {
        self.check_current(attempt)?;
        self.state = LifecycleState::Uninitialized;
        self.last_failure = Some((attempt, message));
        Ok(())
    }

    /// Failure message of `attempt`, if that attempt failed
    pub fn failure_of(&self, attempt: u64) -> Option<&str> {
        self.last_failure
            .as_ref()
            .filter(|(failed, _)| *failed == attempt)
            .map(|(_, message)| message.as_str())
    }

    /// Force back to Uninitialized (teardown)
    pub fn reset(&mut self) {
        self.state = LifecycleState::Uninitialized;
    }
}
