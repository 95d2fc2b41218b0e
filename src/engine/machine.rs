//! The machine: filtered requests, transitions, and the request queue.

use super::completion::{Completion, Resolver};
use super::navigation::StateOrder;
use super::queue::{DeferredCall, RequestQueue};
use crate::core::{
    Args, FilterInput, FsmError, HandlerError, Outcome, Phase, StateHistory, TransitionRecord,
    TransitionTable, INTERNAL_ERROR, OFF,
};
use crate::handlers::{HandlerRegistry, TransitionContext};
use crate::runtime::scheduler::default_scheduler;
use crate::runtime::{registry, EventBus, Scheduler};
use chrono::Utc;
use futures::future::{BoxFuture, FutureExt};
use parking_lot::{Mutex, MutexGuard};
use std::fmt;
use std::future::{Future, IntoFuture};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::task::Context;
use tracing::{debug, error};

static SERIAL: AtomicU64 = AtomicU64::new(0);

/// A request accepted by a filter.
///
/// Awaiting it waits for the transition to settle, which has already
/// happened unless a handler suspended.
#[derive(Debug)]
pub struct Transition {
    pub state: String,
    pub args: Args,
    completion: Completion,
}

impl Transition {
    pub fn is_done(&self) -> bool {
        self.completion.is_done()
    }

    pub fn into_completion(self) -> Completion {
        self.completion
    }
}

impl IntoFuture for Transition {
    type Output = Result<(), FsmError>;
    type IntoFuture = Completion;

    fn into_future(self) -> Completion {
        self.completion
    }
}

/// Everything guarded by the instance lock.
struct Shared {
    phase: Phase,
    queue: RequestQueue,
    order: StateOrder,
    table: Option<TransitionTable>,
    history: StateHistory,
}

type Guard<'a> = MutexGuard<'a, Shared>;

/// A transition that has begun and whose handlers have yet to run.
struct Step {
    old: String,
    new: String,
    args: Args,
    resolver: Resolver,
}

pub(crate) struct Inner {
    name: String,
    serial: u64,
    handlers: HandlerRegistry,
    scheduler: Arc<dyn Scheduler>,
    bus: Option<Arc<dyn EventBus>>,
    broadcast: AtomicBool,
    shared: Mutex<Shared>,
}

/// Settings a machine is assembled from.
pub(crate) struct Parts {
    pub(crate) name: String,
    pub(crate) handlers: HandlerRegistry,
    pub(crate) scheduler: Option<Arc<dyn Scheduler>>,
    pub(crate) bus: Option<Arc<dyn EventBus>>,
    pub(crate) broadcast: bool,
    pub(crate) order: StateOrder,
    pub(crate) table: Option<TransitionTable>,
    pub(crate) history_limit: usize,
}

impl Parts {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            handlers: HandlerRegistry::new(),
            scheduler: None,
            bus: None,
            broadcast: false,
            order: StateOrder::default(),
            table: None,
            history_limit: StateHistory::DEFAULT_LIMIT,
        }
    }
}

/// A finite state machine over named states.
///
/// A machine starts settled in `Off` without running any handler. Requests
/// are filtered by the current state's filter (see
/// [`crate::core::default_filter`]); an accepted request runs the old
/// state's exit handler and the new state's enter handler, or the from-to
/// handler registered for that pair instead.
///
/// Only one transition runs at a time. [`Fsm::request`] fails while a
/// transition is running, whereas [`Fsm::demand`] and
/// [`Fsm::force_transition`] queue behind it and are served in submission
/// order. If a handler suspends, the call returns a pending [`Completion`]
/// and the transition finishes on the configured [`Scheduler`].
///
/// `Fsm` is a cheap handle; clones share the same machine.
///
/// # Example
///
/// ```rust
/// use settle::builder::FsmBuilder;
///
/// let light = FsmBuilder::new("light")
///     .on_enter_sync("Red", |ctx| {
///         assert_eq!(ctx.old_state, "Off");
///         Ok(())
///     })
///     .build()
///     .unwrap();
///
/// light.request("Red", vec![]).unwrap();
/// assert_eq!(light.state().as_deref(), Some("Red"));
/// ```
#[derive(Clone)]
pub struct Fsm {
    inner: Arc<Inner>,
}

impl Fsm {
    /// Create a machine with no handlers, settled in `Off`.
    pub fn new(name: impl Into<String>) -> Self {
        Self::from_parts(Parts::new(name))
    }

    pub(crate) fn from_parts(parts: Parts) -> Self {
        let inner = Inner {
            name: parts.name,
            serial: SERIAL.fetch_add(1, Ordering::Relaxed),
            handlers: parts.handlers,
            scheduler: parts.scheduler.unwrap_or_else(default_scheduler),
            bus: parts.bus,
            broadcast: AtomicBool::new(parts.broadcast),
            shared: Mutex::new(Shared {
                phase: Phase::Settled(OFF.to_string()),
                queue: RequestQueue::new(),
                order: parts.order,
                table: parts.table,
                history: StateHistory::with_limit(parts.history_limit),
            }),
        };
        let fsm = Self {
            inner: Arc::new(inner),
        };
        registry::register(&fsm);
        fsm
    }

    #[cfg_attr(not(debug_assertions), allow(dead_code))]
    pub(crate) fn from_inner(inner: Arc<Inner>) -> Self {
        Self { inner }
    }

    #[cfg_attr(not(debug_assertions), allow(dead_code))]
    pub(crate) fn inner(&self) -> &Arc<Inner> {
        &self.inner
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Process-unique serial number of this machine.
    pub fn serial(&self) -> u64 {
        self.inner.serial
    }

    /// Request a transition, subject to the current state's filter.
    ///
    /// Returns `Ok(None)` when the filter ignores the request. Fails with
    /// [`FsmError::AlreadyInTransition`] while a transition is running; use
    /// [`Fsm::demand`] to queue instead.
    pub fn request(&self, request: &str, args: Args) -> Result<Option<Transition>, FsmError> {
        debug!("{}.request({}, {:?})", self.name(), request, args);
        let guard = self.inner.shared.lock();
        self.request_locked(guard, request, args)
    }

    /// Request a transition that is not expected to be denied.
    ///
    /// While settled this behaves like [`Fsm::request`] but fails with
    /// [`FsmError::RequestDenied`] when the filter ignores the request.
    /// While a transition is running the request is queued and the returned
    /// signal resolves once it has been served.
    pub fn demand(&self, request: &str, args: Args) -> Result<Completion, FsmError> {
        debug!("{}.demand({}, {:?})", self.name(), request, args);
        let guard = self.inner.shared.lock();
        self.dispatch(
            guard,
            DeferredCall::Demand {
                request: request.to_string(),
                args,
            },
        )
    }

    /// Transition to `state` without consulting any filter, queueing behind
    /// a running transition.
    pub fn force_transition(&self, state: &str, args: Args) -> Result<Completion, FsmError> {
        debug!("{}.force_transition({}, {:?})", self.name(), state, args);
        let guard = self.inner.shared.lock();
        self.dispatch(
            guard,
            DeferredCall::Force {
                request: state.to_string(),
                args,
            },
        )
    }

    /// Return to `Off`, running the current state's exit handler and
    /// `Off`'s enter handler. Does nothing when already settled in `Off`.
    pub fn cleanup(&self) -> Result<Completion, FsmError> {
        let guard = self.inner.shared.lock();
        if guard.phase.state() == Some(OFF) {
            return Ok(Completion::done());
        }
        self.dispatch(
            guard,
            DeferredCall::Force {
                request: OFF.to_string(),
                args: Args::new(),
            },
        )
    }

    pub fn is_in_transition(&self) -> bool {
        !self.inner.shared.lock().phase.is_settled()
    }

    /// The settled state, or `None` while in transition.
    pub fn state(&self) -> Option<String> {
        self.inner.shared.lock().phase.state().map(str::to_string)
    }

    pub fn phase(&self) -> Phase {
        self.inner.shared.lock().phase.clone()
    }

    /// The `(old, new)` pair of the running transition, if any.
    pub fn transition_states(&self) -> Option<(String, String)> {
        match &self.inner.shared.lock().phase {
            Phase::Settled(_) => None,
            Phase::InTransition { from, to } => Some((from.clone(), to.clone())),
        }
    }

    /// The settled state, or the state being entered while in transition.
    pub fn current_or_pending_state(&self) -> String {
        self.inner
            .shared
            .lock()
            .phase
            .current_or_pending()
            .to_string()
    }

    /// The settled state, or `"old -> new"` while in transition.
    pub fn current_state_or_transition_label(&self) -> String {
        self.inner.shared.lock().phase.label()
    }

    /// Number of queued requests waiting for the running transition.
    pub fn pending_requests(&self) -> usize {
        self.inner.shared.lock().queue.len()
    }

    pub fn history(&self) -> StateHistory {
        self.inner.shared.lock().history.clone()
    }

    /// Replace the allow-table used by the default filter. `None` switches
    /// back to accepting any direct request.
    pub fn set_transition_table(&self, table: Option<TransitionTable>) {
        self.inner.shared.lock().table = table;
    }

    pub fn transition_table(&self) -> Option<TransitionTable> {
        self.inner.shared.lock().table.clone()
    }

    /// Set the states cycled through by [`Fsm::request_next`] and
    /// [`Fsm::request_previous`].
    pub fn set_state_order<I, T>(&self, states: I) -> Result<(), FsmError>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let order = StateOrder::new(states)?;
        self.inner.shared.lock().order = order;
        Ok(())
    }

    pub fn state_order(&self) -> StateOrder {
        self.inner.shared.lock().order.clone()
    }

    /// Request the state after the current one in the state order.
    pub fn request_next(&self, args: Args) -> Result<Option<Transition>, FsmError> {
        self.navigate(args, true)
    }

    /// Request the state before the current one in the state order.
    pub fn request_previous(&self, args: Args) -> Result<Option<Transition>, FsmError> {
        self.navigate(args, false)
    }

    /// Publish [`Fsm::state_change_event_name`] on the event bus after every
    /// settled transition.
    pub fn set_broadcast_enabled(&self, enabled: bool) {
        self.inner.broadcast.store(enabled, Ordering::SeqCst);
    }

    pub fn is_broadcast_enabled(&self) -> bool {
        self.inner.broadcast.load(Ordering::SeqCst)
    }

    pub fn state_change_event_name(&self) -> String {
        format!("FSM-{}-{}-stateChange", self.inner.serial, self.inner.name)
    }

    fn navigate(&self, args: Args, forward: bool) -> Result<Option<Transition>, FsmError> {
        let guard = self.inner.shared.lock();
        let target = match &guard.phase {
            Phase::InTransition { from, to } => return Err(self.in_transition(from, to)),
            Phase::Settled(state) => {
                let step = if forward {
                    guard.order.next(state)
                } else {
                    guard.order.previous(state)
                };
                match step {
                    Some(target) => target.to_string(),
                    None => {
                        debug!("{} has no state order to navigate", self.name());
                        return Ok(None);
                    }
                }
            }
        };
        self.request_locked(guard, &target, args)
    }

    fn request_locked(
        &self,
        guard: Guard<'_>,
        request: &str,
        args: Args,
    ) -> Result<Option<Transition>, FsmError> {
        let Some((state, args)) = self.decide(&guard, request, &args)? else {
            return Ok(None);
        };
        let completion = self.set_state(guard, state.clone(), args.clone())?;
        Ok(Some(Transition {
            state,
            args,
            completion,
        }))
    }

    /// Run the current state's filter. Returns the target state and the
    /// arguments to pass, or `None` when the request is ignored.
    fn decide(
        &self,
        shared: &Shared,
        request: &str,
        args: &Args,
    ) -> Result<Option<(String, Args)>, FsmError> {
        let state = match &shared.phase {
            Phase::InTransition { from, to } => return Err(self.in_transition(from, to)),
            Phase::Settled(state) => state,
        };
        let filter = self.inner.handlers.resolve_filter(state);
        let decision = filter(&FilterInput {
            machine: &self.inner.name,
            state,
            request,
            args,
            table: shared.table.as_ref(),
        })?;
        Ok(decision.map(|target| target.resolve(args)))
    }

    /// Run a deferred call now, or queue it behind the running transition.
    fn dispatch(&self, mut guard: Guard<'_>, call: DeferredCall) -> Result<Completion, FsmError> {
        if !guard.phase.is_settled() {
            debug!(
                "{} queued {} behind {}",
                self.name(),
                call.request(),
                guard.phase.label()
            );
            return Ok(guard.queue.push(call));
        }
        debug_assert!(guard.queue.is_empty());

        match call {
            DeferredCall::Force { request, args } => self.set_state(guard, request, args),
            DeferredCall::Demand { request, args } => {
                let from = guard.phase.label();
                match self.request_locked(guard, &request, args)? {
                    Some(transition) => Ok(transition.completion),
                    None => Err(FsmError::denied(request, from)),
                }
            }
        }
    }

    /// Start a transition from the settled state. The lock is released
    /// before any handler runs.
    fn set_state(&self, mut guard: Guard<'_>, new: String, args: Args) -> Result<Completion, FsmError> {
        let old = self.begin(&mut guard, &new);
        drop(guard);

        let (resolver, completion) = Completion::pending();
        self.launch(Step {
            old,
            new,
            args,
            resolver,
        });
        completion.resolved_now()
    }

    /// Move from the settled state into `InTransition`, returning the state
    /// being left.
    fn begin(&self, shared: &mut Shared, new: &str) -> String {
        debug_assert!(shared.phase.is_settled());
        let old = shared.phase.current_or_pending().to_string();
        shared.phase = Phase::InTransition {
            from: old.clone(),
            to: new.to_string(),
        };
        debug!("{} to state {}.", self.name(), new);
        old
    }

    /// Poll the transition loop once on the caller's thread; if it
    /// suspends, hand the rest to the scheduler.
    fn launch(&self, step: Step) {
        let mut run = self.run_transitions(step);
        let mut cx = Context::from_waker(futures::task::noop_waker_ref());
        if run.as_mut().poll(&mut cx).is_pending() {
            debug!("{} transition suspended", self.name());
            self.inner.scheduler.spawn(run);
        }
    }

    /// Run `step`, then every queued request it uncovers, one after the
    /// other. Each step's resolver is answered as soon as that step settles
    /// or fails.
    fn run_transitions(&self, first: Step) -> BoxFuture<'static, ()> {
        let fsm = self.clone();
        async move {
            let mut step = first;
            loop {
                let Step {
                    old,
                    new,
                    args,
                    resolver,
                } = step;

                if let Err(source) = fsm.run_handlers(&old, &new, args).await {
                    let _ = resolver.send(Err(fsm.fail(old, new, source)));
                    return;
                }

                if fsm.is_broadcast_enabled() {
                    fsm.publish_state_change();
                }

                let next = fsm.settle(&old, &new);
                let _ = resolver.send(Ok(()));
                match next {
                    Some(next) => step = next,
                    None => return,
                }
            }
        }
        .boxed()
    }

    /// Run the from-to handler for the pair, or exit(old) then enter(new).
    async fn run_handlers(&self, old: &str, new: &str, args: Args) -> Result<(), HandlerError> {
        let ctx = TransitionContext {
            machine: self.inner.name.clone(),
            old_state: old.to_string(),
            new_state: new.to_string(),
            args,
        };

        let handlers = &self.inner.handlers;
        match handlers.resolve_from_to(old, new) {
            Some(from_to) => from_to(ctx).await,
            None => {
                let exit = handlers.resolve_exit(old);
                let enter = handlers.resolve_enter(new);
                exit(ctx.clone()).await?;
                enter(ctx).await
            }
        }
    }

    /// Settle in `new` and, under the same lock, begin the next queued
    /// request. Queued demands the new state refuses are resolved as denied
    /// and skipped.
    fn settle(&self, old: &str, new: &str) -> Option<Step> {
        let mut guard = self.inner.shared.lock();
        guard.phase = Phase::Settled(new.to_string());
        guard.history.record(TransitionRecord {
            from: old.to_string(),
            to: new.to_string(),
            timestamp: Utc::now(),
            outcome: Outcome::Settled,
        });

        loop {
            let pending = guard.queue.pop()?;
            debug!(
                "{} continued queued request {}",
                self.name(),
                pending.call.request()
            );
            let (state, args) = match pending.call {
                DeferredCall::Force { request, args } => (request, args),
                DeferredCall::Demand { request, args } => {
                    match self.decide(&guard, &request, &args) {
                        Ok(Some(target)) => target,
                        Ok(None) => {
                            let denied = FsmError::denied(request, guard.phase.label());
                            let _ = pending.resolver.send(Err(denied));
                            continue;
                        }
                        Err(e) => {
                            let _ = pending.resolver.send(Err(e));
                            continue;
                        }
                    }
                }
            };
            let old = self.begin(&mut guard, &state);
            return Some(Step {
                old,
                new: state,
                args,
                resolver: pending.resolver,
            });
        }
    }

    /// Pin the machine to `InternalError` and drop everything queued.
    fn fail(&self, old: String, new: String, source: HandlerError) -> FsmError {
        error!(
            "{} handler failed transitioning from {} to {}: {}",
            self.name(),
            old,
            new,
            source
        );

        let abandoned = {
            let mut guard = self.inner.shared.lock();
            guard.phase = Phase::Settled(INTERNAL_ERROR.to_string());
            guard.history.record(TransitionRecord {
                from: old.clone(),
                to: new.clone(),
                timestamp: Utc::now(),
                outcome: Outcome::Failed,
            });
            guard.queue.take_all()
        };
        for pending in abandoned {
            let _ = pending.resolver.send(Err(FsmError::Abandoned {
                machine: self.inner.name.clone(),
                request: pending.call.request().to_string(),
            }));
        }

        FsmError::HandlerFailure {
            machine: self.inner.name.clone(),
            from: old,
            to: new,
            source,
        }
    }

    fn publish_state_change(&self) {
        match &self.inner.bus {
            Some(bus) => bus.publish(&self.state_change_event_name()),
            None => debug!("{} has broadcast enabled but no event bus", self.name()),
        }
    }

    fn in_transition(&self, from: &str, to: &str) -> FsmError {
        FsmError::AlreadyInTransition {
            machine: self.inner.name.clone(),
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}

impl fmt::Display for Fsm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FSM:{} {}", self.inner.name, self.phase())
    }
}

impl fmt::Debug for Fsm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fsm")
            .field("name", &self.inner.name)
            .field("serial", &self.inner.serial)
            .field("phase", &self.phase())
            .finish()
    }
}
