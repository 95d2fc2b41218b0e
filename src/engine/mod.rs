//! The running machine.
//!
//! [`Fsm`] owns the current state and serializes transitions: one runs at a
//! time, later `demand`/`force_transition` calls wait in a FIFO queue, and
//! each caller gets a [`Completion`] to await.
//!
//! The instance lock guards the phase, the queue, the state order and the
//! allow-table. It is held while filtering and while settling, and released
//! while handlers run, so a suspended handler never blocks queries such as
//! [`Fsm::is_in_transition`].

mod completion;
pub(crate) mod machine;
pub(crate) mod navigation;
mod queue;

pub use completion::Completion;
pub use machine::{Fsm, Transition};
pub use navigation::StateOrder;
pub use queue::DeferredCall;
