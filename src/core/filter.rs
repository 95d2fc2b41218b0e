//! Filter policy: deciding whether, and where, a request transitions.
//!
//! A filter receives the current state and a request, and answers with
//! either no transition or a [`Target`]. Filters are plain decisions: they
//! run while the machine's lock is held and must not call back into the
//! machine.
//!
//! When no filter is registered for a state, [`default_filter`] applies. It
//! runs in one of two modes:
//!
//! - Without a [`TransitionTable`], any direct request (a state name, see
//!   [`is_direct`]) is accepted and any other request is ignored.
//! - With a table, only the transitions it lists are accepted. Direct
//!   requests outside the table are denied, other requests are ignored.

use super::error::FsmError;
use super::state::{is_direct, OFF};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Arguments carried by a request and handed to the handlers.
pub type Args = Vec<serde_json::Value>;

/// Outcome of a filter: `Ok(None)` means no transition.
pub type FilterResult = Result<Option<Target>, FsmError>;

/// Reserved table marker matching any state.
pub const ANY: &str = "ANY";

/// Reserved table source consulted when nothing else matched.
pub const DEFAULT: &str = "DEFAULT";

/// The state a filter decided to transition to.
#[derive(Clone, Debug, PartialEq)]
pub struct Target {
    pub state: String,
    /// Explicit arguments for the transition. `None` forwards the request's
    /// own arguments.
    pub args: Option<Args>,
}

impl Target {
    /// Target a state, forwarding the request's arguments.
    pub fn named(state: impl Into<String>) -> Self {
        Self {
            state: state.into(),
            args: None,
        }
    }

    /// Target a state with replacement arguments.
    pub fn with_args(state: impl Into<String>, args: Args) -> Self {
        Self {
            state: state.into(),
            args: Some(args),
        }
    }

    /// Fill in forwarded arguments, producing the final `(state, args)` pair.
    pub fn resolve(self, passed: &Args) -> (String, Args) {
        let args = self.args.unwrap_or_else(|| passed.clone());
        (self.state, args)
    }
}

impl From<&str> for Target {
    fn from(state: &str) -> Self {
        Self::named(state)
    }
}

impl From<String> for Target {
    fn from(state: String) -> Self {
        Self::named(state)
    }
}

/// Everything a filter gets to look at.
#[derive(Clone, Copy, Debug)]
pub struct FilterInput<'a> {
    /// Name of the machine, for diagnostics.
    pub machine: &'a str,
    /// The settled state the request is made from.
    pub state: &'a str,
    pub request: &'a str,
    pub args: &'a Args,
    /// The machine's allow-table, if one is configured.
    pub table: Option<&'a TransitionTable>,
}

/// Source key of a [`TransitionTable`] row.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Source {
    State(String),
    /// Applies from every state.
    Any,
    /// Fallback applied from every state after all other rows.
    Default,
}

impl From<&str> for Source {
    fn from(key: &str) -> Self {
        match key {
            ANY => Self::Any,
            DEFAULT => Self::Default,
            state => Self::State(state.to_string()),
        }
    }
}

impl Source {
    fn key(&self) -> String {
        match self {
            Self::State(state) => state.clone(),
            Self::Any => ANY.to_string(),
            Self::Default => DEFAULT.to_string(),
        }
    }
}

/// Targets allowed from one source.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TargetSet {
    any: bool,
    names: BTreeSet<String>,
}

impl TargetSet {
    fn insert(&mut self, target: &str) {
        if target == ANY {
            self.any = true;
        } else {
            self.names.insert(target.to_string());
        }
    }

    pub fn contains(&self, target: &str) -> bool {
        self.names.contains(target)
    }

    /// Whether this set holds the `ANY` marker.
    pub fn allows_any(&self) -> bool {
        self.any
    }
}

/// Explicit allow-table for the default filter.
///
/// Serialized as a JSON object mapping a source (a state name, `ANY` or
/// `DEFAULT`) to the list of allowed targets, where the target `ANY` allows
/// every target.
///
/// # Example
///
/// ```rust
/// use settle::core::TransitionTable;
///
/// let table = TransitionTable::new()
///     .allow("Red", ["Green"])
///     .allow("Green", ["Yellow"])
///     .allow("Yellow", ["Red"]);
///
/// assert!(table.permits("Red", "Green"));
/// assert!(!table.permits("Red", "Yellow"));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<String, Vec<String>>",
    into = "BTreeMap<String, Vec<String>>"
)]
pub struct TransitionTable {
    rows: BTreeMap<Source, TargetSet>,
}

impl TransitionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow transitions from `source` to each of `targets`.
    ///
    /// `source` may be a state name, [`ANY`] or [`DEFAULT`]; a target of
    /// [`ANY`] allows every target.
    pub fn allow<I, T>(mut self, source: &str, targets: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let row = self.rows.entry(Source::from(source)).or_default();
        for target in targets {
            row.insert(target.as_ref());
        }
        self
    }

    /// Allow every transition from every state.
    pub fn allow_all(self) -> Self {
        self.allow(ANY, [ANY])
    }

    pub fn row(&self, source: &Source) -> Option<&TargetSet> {
        self.rows.get(source)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Check whether the table lists a transition from `state` to `target`.
    ///
    /// Rows are consulted in order: the state's own row (a listed target or
    /// the `ANY` marker), the `ANY` source row, the `ANY -> ANY` wildcard and
    /// finally the `DEFAULT` row.
    pub fn permits(&self, state: &str, target: &str) -> bool {
        let own = self.rows.get(&Source::State(state.to_string()));
        let any = self.rows.get(&Source::Any);
        let fallback = self.rows.get(&Source::Default);

        own.is_some_and(|row| row.contains(target))
            || own.is_some_and(TargetSet::allows_any)
            || any.is_some_and(|row| row.contains(target))
            || any.is_some_and(TargetSet::allows_any)
            || fallback.is_some_and(|row| row.contains(target))
    }
}

impl From<BTreeMap<String, Vec<String>>> for TransitionTable {
    fn from(map: BTreeMap<String, Vec<String>>) -> Self {
        map.iter()
            .fold(Self::new(), |table, (source, targets)| {
                table.allow(source, targets)
            })
    }
}

impl From<TransitionTable> for BTreeMap<String, Vec<String>> {
    fn from(table: TransitionTable) -> Self {
        table
            .rows
            .into_iter()
            .map(|(source, set)| {
                let mut targets: Vec<String> = set.names.into_iter().collect();
                if set.any {
                    targets.push(ANY.to_string());
                }
                (source.key(), targets)
            })
            .collect()
    }
}

/// The filter used for every state without a filter of its own.
pub fn default_filter(input: &FilterInput<'_>) -> FilterResult {
    if input.request == OFF {
        return Ok(Some(Target::named(OFF)));
    }

    match input.table {
        None => {
            if is_direct(input.request) {
                return Ok(Some(Target::named(input.request)));
            }
        }
        Some(table) => {
            if table.permits(input.state, input.request) {
                return Ok(Some(Target::named(input.request)));
            }
            if is_direct(input.request) {
                return Err(FsmError::denied(input.request, input.state));
            }
        }
    }

    debug!(
        "{} ignoring request {} from state {}",
        input.machine, input.request, input.state
    );
    Ok(None)
}

/// Built-in filter of the `Off` state: any direct request is accepted,
/// anything else goes through `fallback`, normally the machine's default
/// filter.
pub fn off_filter<F>(input: &FilterInput<'_>, fallback: F) -> FilterResult
where
    F: Fn(&FilterInput<'_>) -> FilterResult,
{
    if is_direct(input.request) {
        return Ok(Some(Target::named(input.request)));
    }
    fallback(input)
}
