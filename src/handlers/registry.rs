//! Registry of named handlers with default fallbacks.

use super::{filter, noop, Filter, Handler, HandlerKind};
use crate::core::{default_filter, off_filter, OFF};
use std::collections::HashMap;
use std::sync::Arc;

/// Handlers registered per state, plus the defaults used for states that
/// have none.
///
/// # Example
///
/// ```rust
/// use settle::handlers::{sync_handler, HandlerKind, HandlerRegistry};
///
/// let mut registry = HandlerRegistry::new();
/// registry.set_enter("Red", sync_handler(|_ctx| Ok(())));
///
/// assert!(registry.has(HandlerKind::Enter, "Red"));
/// assert!(!registry.has(HandlerKind::Exit, "Red"));
/// ```
#[derive(Clone)]
pub struct HandlerRegistry {
    enter: HashMap<String, Handler>,
    exit: HashMap<String, Handler>,
    filters: HashMap<String, Filter>,
    from_to: HashMap<(String, String), Handler>,
    default_enter: Handler,
    default_exit: Handler,
    default_filter: Filter,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            enter: HashMap::new(),
            exit: HashMap::new(),
            filters: HashMap::new(),
            from_to: HashMap::new(),
            default_enter: noop(),
            default_exit: noop(),
            default_filter: Arc::new(default_filter),
        }
    }

    /// Register the enter handler of `state`. Returns `true` if it replaced
    /// an existing one.
    pub fn set_enter(&mut self, state: impl Into<String>, handler: Handler) -> bool {
        self.enter.insert(state.into(), handler).is_some()
    }

    /// Register the exit handler of `state`. Returns `true` if it replaced
    /// an existing one.
    pub fn set_exit(&mut self, state: impl Into<String>, handler: Handler) -> bool {
        self.exit.insert(state.into(), handler).is_some()
    }

    /// Register the filter of `state`. Returns `true` if it replaced an
    /// existing one.
    pub fn set_filter(&mut self, state: impl Into<String>, filter: Filter) -> bool {
        self.filters.insert(state.into(), filter).is_some()
    }

    /// Register a handler for the `old -> new` transition. It runs instead of
    /// exit(old) and enter(new).
    pub fn set_from_to(
        &mut self,
        old: impl Into<String>,
        new: impl Into<String>,
        handler: Handler,
    ) -> bool {
        self.from_to
            .insert((old.into(), new.into()), handler)
            .is_some()
    }

    /// Replace the enter handler used for states without one.
    pub fn set_default_enter(&mut self, handler: Handler) {
        self.default_enter = handler;
    }

    /// Replace the exit handler used for states without one.
    pub fn set_default_exit(&mut self, handler: Handler) {
        self.default_exit = handler;
    }

    /// Replace the filter used for states without one.
    pub fn set_default_filter(&mut self, filter: Filter) {
        self.default_filter = filter;
    }

    /// Whether a handler of `kind` is registered for `state`. For
    /// [`HandlerKind::FromTo`] this checks for any transition out of `state`.
    pub fn has(&self, kind: HandlerKind, state: &str) -> bool {
        match kind {
            HandlerKind::Enter => self.enter.contains_key(state),
            HandlerKind::Exit => self.exit.contains_key(state),
            HandlerKind::Filter => self.filters.contains_key(state),
            HandlerKind::FromTo => self.from_to.keys().any(|(old, _)| old == state),
        }
    }

    pub fn resolve_enter(&self, state: &str) -> Handler {
        Arc::clone(self.enter.get(state).unwrap_or(&self.default_enter))
    }

    pub fn resolve_exit(&self, state: &str) -> Handler {
        Arc::clone(self.exit.get(state).unwrap_or(&self.default_exit))
    }

    /// The filter for requests made from `state`: its own filter, the
    /// built-in `Off` filter, or the default filter.
    pub fn resolve_filter(&self, state: &str) -> Filter {
        if let Some(filter) = self.filters.get(state) {
            return Arc::clone(filter);
        }
        if state == OFF {
            let fallback = Arc::clone(&self.default_filter);
            return filter(move |input| off_filter(input, &*fallback));
        }
        Arc::clone(&self.default_filter)
    }

    pub fn resolve_from_to(&self, old: &str, new: &str) -> Option<Handler> {
        self.from_to
            .get(&(old.to_string(), new.to_string()))
            .map(Arc::clone)
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("enter", &self.enter.keys().collect::<Vec<_>>())
            .field("exit", &self.exit.keys().collect::<Vec<_>>())
            .field("filters", &self.filters.keys().collect::<Vec<_>>())
            .field("from_to", &self.from_to.keys().collect::<Vec<_>>())
            .finish()
    }
}
