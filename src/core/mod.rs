//! Core state machine types and logic.
//!
//! This module contains the parts of the machine that hold no locks and run
//! no handlers:
//! - State names and the settled / in-flight phase
//! - Filter policy and the allow-table
//! - Bounded transition history
//! - Error types

mod error;
mod filter;
mod history;
mod state;

pub use error::{FsmError, HandlerError};
pub use filter::{
    default_filter, off_filter, Args, FilterInput, FilterResult, Source, Target, TargetSet,
    TransitionTable, ANY, DEFAULT,
};
pub use history::{Outcome, StateHistory, TransitionRecord};
pub use state::{is_direct, Phase, INTERNAL_ERROR, OFF};
