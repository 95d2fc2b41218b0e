//! Settle: a finite state machine engine over named states
//!
//! A machine is always either settled in one state or running exactly one
//! transition. Requests pass through the current state's filter, accepted
//! transitions run exit and enter handlers (which may be async), and
//! requests made while a transition runs are queued and served in order.
//!
//! # Core Concepts
//!
//! - **Filters**: Per-state policy deciding whether, and where, a request goes
//! - **Handlers**: Enter, exit and from-to callbacks resolved by state name
//! - **Queue**: `demand` and `force_transition` wait behind a running transition
//! - **Navigation**: Cyclic next/previous over a configured state order
//!
//! # Example
//!
//! ```rust
//! use settle::{transition_table, FsmBuilder};
//! use serde_json::json;
//!
//! let door = FsmBuilder::new("door")
//!     .transitions(transition_table! {
//!         "Closed" => ["Open", "Locked"],
//!         "Open" => ["Closed"],
//!         "Locked" => ["Closed"],
//!     })
//!     .on_enter_sync("Locked", |ctx| {
//!         assert_eq!(ctx.args, vec![json!("key")]);
//!         Ok(())
//!     })
//!     .build()
//!     .unwrap();
//!
//! door.request("Closed", vec![]).unwrap();
//! door.request("Locked", vec![json!("key")]).unwrap();
//! assert_eq!(door.state().as_deref(), Some("Locked"));
//!
//! // Not in the table: denied, state unchanged.
//! assert!(door.request("Open", vec![]).unwrap_err().is_denied());
//! assert!(door.request("open", vec![]).unwrap().is_none());
//! assert_eq!(door.state().as_deref(), Some("Locked"));
//! ```

pub mod builder;
pub mod config;
pub mod core;
pub mod engine;
pub mod handlers;
pub mod runtime;

// Re-export commonly used types
pub use builder::{BuildError, FsmBuilder};
pub use config::{ConfigError, FsmConfig};
pub use core::{Args, FilterInput, FilterResult, FsmError, Phase, StateHistory, Target};
pub use engine::{Completion, Fsm, Transition};
pub use handlers::TransitionContext;
