//! Builder API for machine construction.
//!
//! [`FsmBuilder`] collects handlers, filters, the allow-table and the state
//! order, and validates them once in [`FsmBuilder::build`]. The
//! [`transition_table!`](crate::transition_table) macro writes allow-tables
//! inline.

pub mod error;
pub mod machine;
pub mod macros;

pub use error::BuildError;
pub use machine::FsmBuilder;
