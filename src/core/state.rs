//! State names and the settled / in-flight phase of a machine.
//!
//! States are identified by plain names. By convention a state name begins
//! with an uppercase letter, while requests that are not state names (commands
//! interpreted by a filter) begin with a lowercase letter.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The state every machine starts in, and returns to on cleanup.
pub const OFF: &str = "Off";

/// The state a machine is pinned to after a handler failure.
pub const INTERNAL_ERROR: &str = "InternalError";

/// Check whether a request names a state directly.
///
/// A request is direct when its first character is uppercase.
///
/// # Example
///
/// ```rust
/// use settle::core::is_direct;
///
/// assert!(is_direct("Red"));
/// assert!(!is_direct("advance"));
/// assert!(!is_direct(""));
/// ```
pub fn is_direct(request: &str) -> bool {
    request.chars().next().is_some_and(char::is_uppercase)
}

/// Where a machine is at a given observation point.
///
/// Exactly one of the two variants holds at any time, so a machine is never
/// both settled and mid-transition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// No transition is running; the machine is in the named state.
    Settled(String),

    /// A transition from `from` to `to` is running.
    InTransition { from: String, to: String },
}

impl Phase {
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Settled(_))
    }

    /// The settled state, if any.
    pub fn state(&self) -> Option<&str> {
        match self {
            Self::Settled(state) => Some(state),
            Self::InTransition { .. } => None,
        }
    }

    /// The settled state, or the target of the running transition.
    pub fn current_or_pending(&self) -> &str {
        match self {
            Self::Settled(state) => state,
            Self::InTransition { to, .. } => to,
        }
    }

    /// The settled state, or `"old -> new"` while in transition.
    pub fn label(&self) -> String {
        match self {
            Self::Settled(state) => state.clone(),
            Self::InTransition { from, to } => format!("{} -> {}", from, to),
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Settled(state) => write!(f, "in state \"{}\"", state),
            Self::InTransition { from, to } => {
                write!(f, "in transition from '{}' to '{}'", from, to)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_requests_start_uppercase() {
        assert!(is_direct("Off"));
        assert!(is_direct("Ärger"));
        assert!(!is_direct("next"));
        assert!(!is_direct("1st"));
        assert!(!is_direct(""));
    }

    #[test]
    fn settled_phase_reports_its_state() {
        let phase = Phase::Settled("Red".to_string());

        assert!(phase.is_settled());
        assert_eq!(phase.state(), Some("Red"));
        assert_eq!(phase.current_or_pending(), "Red");
        assert_eq!(phase.label(), "Red");
        assert_eq!(phase.to_string(), "in state \"Red\"");
    }

    #[test]
    fn in_transition_phase_reports_target() {
        let phase = Phase::InTransition {
            from: "Red".to_string(),
            to: "Green".to_string(),
        };

        assert!(!phase.is_settled());
        assert_eq!(phase.state(), None);
        assert_eq!(phase.current_or_pending(), "Green");
        assert_eq!(phase.label(), "Red -> Green");
        assert_eq!(phase.to_string(), "in transition from 'Red' to 'Green'");
    }

    #[test]
    fn phase_serializes_correctly() {
        let phase = Phase::InTransition {
            from: "A".to_string(),
            to: "B".to_string(),
        };
        let json = serde_json::to_string(&phase).unwrap();
        let deserialized: Phase = serde_json::from_str(&json).unwrap();
        assert_eq!(phase, deserialized);
    }
}
