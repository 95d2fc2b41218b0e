//! Builder for constructing machines.

use crate::builder::error::BuildError;
use crate::config::FsmConfig;
use crate::core::{FilterInput, FilterResult, HandlerError, TransitionTable};
use crate::engine::machine::Parts;
use crate::engine::navigation::first_duplicate;
use crate::engine::{Fsm, StateOrder};
use crate::handlers::{self, Handler, HandlerKind, TransitionContext};
use crate::runtime::{EventBus, Scheduler};
use std::future::Future;
use std::sync::Arc;

/// Builder for constructing machines with a fluent API.
///
/// Handlers are registered by state name. Registering the same kind of
/// handler twice for one state is reported by [`FsmBuilder::build`].
///
/// # Example
///
/// ```rust
/// use settle::builder::FsmBuilder;
/// use settle::transition_table;
///
/// let light = FsmBuilder::new("light")
///     .transitions(transition_table! {
///         "Red" => ["Green"],
///         "Green" => ["Yellow"],
///         "Yellow" => ["Red"],
///     })
///     .state_order(["Red", "Green", "Yellow"])
///     .on_enter_sync("Green", |_ctx| Ok(()))
///     .build()
///     .unwrap();
///
/// light.request("Red", vec![]).unwrap();
/// light.request_next(vec![]).unwrap();
/// assert_eq!(light.state().as_deref(), Some("Green"));
/// ```
pub struct FsmBuilder {
    parts: Parts,
    order: Vec<String>,
    duplicate: Option<BuildError>,
}

impl FsmBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            parts: Parts::new(name),
            order: Vec::new(),
            duplicate: None,
        }
    }

    /// Start from a loaded configuration. Handlers, scheduler and event bus
    /// are still set on the builder.
    pub fn from_config(config: FsmConfig) -> Self {
        let mut builder = Self::new(config.name)
            .state_order(config.state_order)
            .broadcast(config.broadcast)
            .history_limit(config.history_limit);
        builder.parts.table = config.transitions;
        builder
    }

    /// Register an async enter handler for `state`.
    pub fn on_enter<F, Fut>(self, state: impl Into<String>, f: F) -> Self
    where
        F: Fn(TransitionContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        self.enter_handler(state, handlers::handler(f))
    }

    pub fn on_enter_sync<F>(self, state: impl Into<String>, f: F) -> Self
    where
        F: Fn(&TransitionContext) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.enter_handler(state, handlers::sync_handler(f))
    }

    /// Register an async exit handler for `state`.
    pub fn on_exit<F, Fut>(self, state: impl Into<String>, f: F) -> Self
    where
        F: Fn(TransitionContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        self.exit_handler(state, handlers::handler(f))
    }

    pub fn on_exit_sync<F>(self, state: impl Into<String>, f: F) -> Self
    where
        F: Fn(&TransitionContext) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.exit_handler(state, handlers::sync_handler(f))
    }

    /// Register an async handler for the `old -> new` transition, run in
    /// place of exit(old) and enter(new).
    pub fn on_from_to<F, Fut>(self, old: impl Into<String>, new: impl Into<String>, f: F) -> Self
    where
        F: Fn(TransitionContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        self.from_to_handler(old, new, handlers::handler(f))
    }

    pub fn on_from_to_sync<F>(self, old: impl Into<String>, new: impl Into<String>, f: F) -> Self
    where
        F: Fn(&TransitionContext) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.from_to_handler(old, new, handlers::sync_handler(f))
    }

    /// Register the filter for requests made from `state`.
    pub fn filter<F>(mut self, state: impl Into<String>, f: F) -> Self
    where
        F: Fn(&FilterInput<'_>) -> FilterResult + Send + Sync + 'static,
    {
        let state = state.into();
        if self.parts.handlers.set_filter(state.clone(), handlers::filter(f)) {
            self.note_duplicate(HandlerKind::Filter, state);
        }
        self
    }

    pub fn enter_handler(mut self, state: impl Into<String>, handler: Handler) -> Self {
        let state = state.into();
        if self.parts.handlers.set_enter(state.clone(), handler) {
            self.note_duplicate(HandlerKind::Enter, state);
        }
        self
    }

    pub fn exit_handler(mut self, state: impl Into<String>, handler: Handler) -> Self {
        let state = state.into();
        if self.parts.handlers.set_exit(state.clone(), handler) {
            self.note_duplicate(HandlerKind::Exit, state);
        }
        self
    }

    pub fn from_to_handler(
        mut self,
        old: impl Into<String>,
        new: impl Into<String>,
        handler: Handler,
    ) -> Self {
        let (old, new) = (old.into(), new.into());
        let label = format!("{} -> {}", old, new);
        if self.parts.handlers.set_from_to(old, new, handler) {
            self.note_duplicate(HandlerKind::FromTo, label);
        }
        self
    }

    /// Replace the enter handler used for states without one.
    pub fn default_enter(mut self, handler: Handler) -> Self {
        self.parts.handlers.set_default_enter(handler);
        self
    }

    /// Replace the exit handler used for states without one.
    pub fn default_exit(mut self, handler: Handler) -> Self {
        self.parts.handlers.set_default_exit(handler);
        self
    }

    /// Replace the filter used for states without one.
    pub fn default_filter<F>(mut self, f: F) -> Self
    where
        F: Fn(&FilterInput<'_>) -> FilterResult + Send + Sync + 'static,
    {
        self.parts.handlers.set_default_filter(handlers::filter(f));
        self
    }

    /// Use an allow-table in the default filter.
    pub fn transitions(mut self, table: TransitionTable) -> Self {
        self.parts.table = Some(table);
        self
    }

    pub fn state_order<I, T>(mut self, states: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.order = states.into_iter().map(Into::into).collect();
        self
    }

    pub fn broadcast(mut self, enabled: bool) -> Self {
        self.parts.broadcast = enabled;
        self
    }

    pub fn event_bus(mut self, bus: impl EventBus + 'static) -> Self {
        self.parts.bus = Some(Arc::new(bus));
        self
    }

    pub fn scheduler(mut self, scheduler: impl Scheduler + 'static) -> Self {
        self.parts.scheduler = Some(Arc::new(scheduler));
        self
    }

    /// Share one scheduler between several machines.
    pub fn shared_scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.parts.scheduler = Some(scheduler);
        self
    }

    pub fn history_limit(mut self, limit: usize) -> Self {
        self.parts.history_limit = limit;
        self
    }

    /// Build the machine, settled in `Off`.
    pub fn build(mut self) -> Result<Fsm, BuildError> {
        if self.parts.name.is_empty() {
            return Err(BuildError::EmptyName);
        }
        if let Some(err) = self.duplicate {
            return Err(err);
        }
        if self.parts.broadcast && self.parts.bus.is_none() {
            return Err(BuildError::MissingEventBus);
        }

        if let Some(state) = first_duplicate(&self.order) {
            return Err(BuildError::DuplicateState {
                state: state.to_string(),
            });
        }
        self.parts.order = StateOrder::new(self.order).unwrap_or_default();

        Ok(Fsm::from_parts(self.parts))
    }

    fn note_duplicate(&mut self, kind: HandlerKind, state: String) {
        self.duplicate
            .get_or_insert(BuildError::DuplicateHandler { kind, state });
    }
}
