//! Errors raised by the machine and its handlers.

use thiserror::Error;

/// Error type returned by enter, exit and from-to handlers.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while requesting or running a transition.
#[derive(Debug, Error)]
pub enum FsmError {
    /// A filtered request was made while a transition is running.
    #[error("FSM {machine} cannot determine current filter while in transition ({from} -> {to})")]
    AlreadyInTransition {
        machine: String,
        from: String,
        to: String,
    },

    /// The active filter rejected the request.
    #[error("{request} (from state: {state})")]
    RequestDenied { request: String, state: String },

    /// An exit, enter or from-to handler failed. The machine is left in
    /// `InternalError`.
    #[error("FSM {machine} failed transitioning from '{from}' to '{to}': {source}")]
    HandlerFailure {
        machine: String,
        from: String,
        to: String,
        #[source]
        source: HandlerError,
    },

    /// A queued request was dropped because an earlier transition failed.
    #[error("FSM {machine} dropped queued request '{request}' after a handler failure")]
    Abandoned { machine: String, request: String },

    /// The work behind a completion signal was dropped before it finished.
    #[error("transition was canceled before it settled")]
    Canceled,

    /// A state was listed twice in a navigation order.
    #[error("state '{state}' appears more than once in the state order")]
    DuplicateState { state: String },
}

impl FsmError {
    /// Build a `RequestDenied` error, for use inside custom filters.
    pub fn denied(request: impl Into<String>, state: impl Into<String>) -> Self {
        Self::RequestDenied {
            request: request.into(),
            state: state.into(),
        }
    }

    pub fn is_denied(&self) -> bool {
        matches!(self, Self::RequestDenied { .. })
    }

    pub fn is_in_transition(&self) -> bool {
        matches!(self, Self::AlreadyInTransition { .. })
    }

    pub fn is_handler_failure(&self) -> bool {
        matches!(self, Self::HandlerFailure { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn denied_message_names_request_and_state() {
        let err = FsmError::denied("Green", "Red");
        assert!(err.is_denied());
        assert_eq!(err.to_string(), "Green (from state: Red)");
    }

    #[test]
    fn handler_failure_keeps_source() {
        let err = FsmError::HandlerFailure {
            machine: "light".to_string(),
            from: "Red".to_string(),
            to: "Green".to_string(),
            source: "bulb blew".into(),
        };

        assert!(err.is_handler_failure());
        assert_eq!(err.source().map(|s| s.to_string()), Some("bulb blew".to_string()));
    }
}
