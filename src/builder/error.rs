//! Build errors for the machine builder.

use crate::handlers::HandlerKind;
use thiserror::Error;

/// Errors that can occur when building a machine.
#[derive(Debug, Error, PartialEq)]
pub enum BuildError {
    #[error("Machine name is empty. Pass a name to FsmBuilder::new")]
    EmptyName,

    #[error("Duplicate {kind} handler for state '{state}'")]
    DuplicateHandler { kind: HandlerKind, state: String },

    #[error("State '{state}' appears more than once in the state order")]
    DuplicateState { state: String },

    #[error("Broadcast is enabled but no event bus is set. Call .event_bus(bus)")]
    MissingEventBus,
}
