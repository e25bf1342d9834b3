//! Connection manager state machine

use crate::{Error, Result};

/// Manager state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ManagerState {
    /// No accepted configuration
    #[default]
    Uninitialized,

    /// Configuration accepted, no live handle
    Idle,

    /// Live handle held
    Connected,
}

impl ManagerState {
    /// Check if transition is valid
    pub fn can_transition_to(&self, next: ManagerState) -> bool {
        use ManagerState::*;

        matches!(
            (self, next),
            (Uninitialized, Idle)
                | (Idle, Idle)
                | (Idle, Connected)
                | (Connected, Idle)
                | (_, Uninitialized)
        )
    }

    /// Transition to new state
    pub fn transition(&mut self, next: ManagerState) -> Result<()> {
        if !self.can_transition_to(next) {
            return Err(Error::InvalidState {
                expected: format!("valid transition from {:?}", self),
                actual: format!("{:?}", next),
            });
        }
        *self = next;
        Ok(())
    }

    /// Whether a configuration has been accepted
    pub fn is_initialized(&self) -> bool {
        !matches!(self, Self::Uninitialized)
    }
}

impl std::fmt::Display for ManagerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "uninitialized"),
            Self::Idle => write!(f, "idle"),
            Self::Connected => write!(f, "connected"),
        }
    }
}
