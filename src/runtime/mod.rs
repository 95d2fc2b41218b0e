//! Collaborators a machine talks to: the scheduler that resumes suspended
//! transitions, the event bus for state-change notifications, and the
//! debug registry of live machines.

pub mod events;
pub mod registry;
pub mod scheduler;

pub use events::EventBus;
#[cfg(feature = "tokio")]
pub use events::BroadcastBus;
pub use scheduler::{Scheduler, Task, ThreadScheduler};
#[cfg(feature = "tokio")]
pub use scheduler::TokioScheduler;
