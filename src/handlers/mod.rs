//! Per-state handlers and their resolution.
//!
//! Behavior is attached to states by registering handlers by state name:
//!
//! - **enter** runs when the machine enters the state
//! - **exit** runs when the machine leaves the state
//! - **filter** decides what a request made from the state does
//! - **from-to** replaces the exit/enter pair for one specific transition
//!
//! Every kind is optional; [`HandlerRegistry`] falls back to defaults for
//! anything not registered. Enter, exit and from-to handlers return a
//! [`HandlerFuture`], so a handler may suspend (waiting on I/O, a timer, or
//! another machine) and the transition completes when it resumes.

mod registry;

pub use registry::HandlerRegistry;

use crate::core::{Args, FilterInput, FilterResult, HandlerError};
use futures::future::{self, BoxFuture, FutureExt};
use std::future::Future;
use std::sync::Arc;

/// Future returned by enter, exit and from-to handlers.
pub type HandlerFuture = BoxFuture<'static, Result<(), HandlerError>>;

/// An enter, exit or from-to handler.
pub type Handler = Arc<dyn Fn(TransitionContext) -> HandlerFuture + Send + Sync>;

/// A filter for requests made from one state.
pub type Filter = Arc<dyn Fn(&FilterInput<'_>) -> FilterResult + Send + Sync>;

/// The kinds of handler a state can have.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HandlerKind {
    Enter,
    Exit,
    Filter,
    FromTo,
}

impl std::fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Enter => "enter",
            Self::Exit => "exit",
            Self::Filter => "filter",
            Self::FromTo => "from-to",
        };
        f.write_str(name)
    }
}

/// What a handler sees of the running transition.
#[derive(Clone, Debug, PartialEq)]
pub struct TransitionContext {
    pub machine: String,
    pub old_state: String,
    pub new_state: String,
    pub args: Args,
}

/// Wrap an async closure into a [`Handler`].
pub fn handler<F, Fut>(f: F) -> Handler
where
    F: Fn(TransitionContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    Arc::new(move |ctx| f(ctx).boxed())
}

/// Wrap a plain closure into a [`Handler`] that completes immediately.
pub fn sync_handler<F>(f: F) -> Handler
where
    F: Fn(&TransitionContext) -> Result<(), HandlerError> + Send + Sync + 'static,
{
    Arc::new(move |ctx| future::ready(f(&ctx)).boxed())
}

/// Wrap a closure into a [`Filter`].
pub fn filter<F>(f: F) -> Filter
where
    F: Fn(&FilterInput<'_>) -> FilterResult + Send + Sync + 'static,
{
    Arc::new(f)
}

pub(crate) fn noop() -> Handler {
    Arc::new(|_| future::ready(Ok(())).boxed())
}
