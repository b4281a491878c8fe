//! Coarse lifecycle of a registered connection.

use serde::Serialize;
use std::fmt;

use super::StateMachine;

/// Lifecycle state of a connection in the registry.
///
/// Joining or leaving channels never changes the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// Registered, no identity asserted yet.
    #[default]
    Pending,
    /// An `auth` frame has been accepted.
    Identified,
    /// Unregistered. Terminal.
    Destroyed,
}

impl ConnectionState {
    /// Returns true while the connection is still in the registry.
    pub fn is_live(&self) -> bool {
        !matches!(self, ConnectionState::Destroyed)
    }
}

impl StateMachine for ConnectionState {
    fn can_transition_to(&self, target: &Self) -> bool {
        use ConnectionState::*;
        // Identified -> Identified is a re-identification (last write wins).
        matches!(
            (self, target),
            (Pending, Identified)
                | (Pending, Destroyed)
                | (Identified, Identified)
                | (Identified, Destroyed)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use ConnectionState::*;
        match self {
            Pending => vec![Identified, Destroyed],
            Identified => vec![Identified, Destroyed],
            Destroyed => vec![],
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionState::Pending => "pending",
            ConnectionState::Identified => "identified",
            ConnectionState::Destroyed => "destroyed",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_pending() {
        assert_eq!(ConnectionState::default(), ConnectionState::Pending);
    }

    #[test]
    fn pending_can_be_identified() {
        assert!(ConnectionState::Pending.can_transition_to(&ConnectionState::Identified));
    }

    #[test]
    fn identified_can_be_reidentified() {
        assert_eq!(
            ConnectionState::Identified.transition_to(ConnectionState::Identified),
            Ok(ConnectionState::Identified)
        );
    }

    #[test]
    fn identified_cannot_fall_back_to_pending() {
        assert!(ConnectionState::Identified
            .transition_to(ConnectionState::Pending)
            .is_err());
    }

    #[test]
    fn destroyed_is_terminal() {
        assert!(ConnectionState::Destroyed.is_terminal());
        assert!(!ConnectionState::Destroyed.is_live());
        assert!(!ConnectionState::Destroyed.can_transition_to(&ConnectionState::Identified));
    }

    #[test]
    fn both_live_states_can_be_destroyed() {
        assert!(ConnectionState::Pending.can_transition_to(&ConnectionState::Destroyed));
        assert!(ConnectionState::Identified.can_transition_to(&ConnectionState::Destroyed));
    }

    #[test]
    fn display_is_lowercase() {
        assert_eq!(ConnectionState::Identified.to_string(), "identified");
    }
}
