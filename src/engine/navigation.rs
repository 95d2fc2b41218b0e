//! Cyclic next/previous navigation over an ordered list of states.

use crate::core::FsmError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Ordered, duplicate-free list of states to cycle through.
///
/// # Example
///
/// ```rust
/// use settle::engine::StateOrder;
///
/// let order = StateOrder::new(["A", "B", "C"]).unwrap();
/// assert_eq!(order.next("B"), Some("C"));
/// assert_eq!(order.next("C"), Some("A"));
/// assert_eq!(order.previous("A"), Some("C"));
/// assert_eq!(order.next("Elsewhere"), Some("A"));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StateOrder {
    states: Vec<String>,
}

impl StateOrder {
    /// Build an order, rejecting any state listed twice.
    pub fn new<I, T>(states: I) -> Result<Self, FsmError>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let states: Vec<String> = states.into_iter().map(Into::into).collect();
        if let Some(state) = first_duplicate(&states) {
            return Err(FsmError::DuplicateState {
                state: state.to_string(),
            });
        }
        Ok(Self { states })
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn states(&self) -> &[String] {
        &self.states
    }

    /// The state after `current`, wrapping around. A `current` outside the
    /// order yields the first state; an empty order yields `None`.
    pub fn next(&self, current: &str) -> Option<&str> {
        self.step(current, 1)
    }

    /// The state before `current`, wrapping around. A `current` outside the
    /// order yields the first state; an empty order yields `None`.
    pub fn previous(&self, current: &str) -> Option<&str> {
        self.step(current, self.states.len().saturating_sub(1))
    }

    fn step(&self, current: &str, offset: usize) -> Option<&str> {
        let first = self.states.first()?;
        let Some(index) = self.states.iter().position(|s| s == current) else {
            return Some(first);
        };
        let next = (index + offset) % self.states.len();
        Some(&self.states[next])
    }
}

/// The first state listed twice, if any.
pub(crate) fn first_duplicate(states: &[String]) -> Option<&str> {
    let mut seen = HashSet::new();
    states
        .iter()
        .find(|state| !seen.insert(state.as_str()))
        .map(String::as_str)
}

impl<'de> Deserialize<'de> for StateOrder {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let states = Vec::<String>::deserialize(deserializer)?;
        Self::new(states).map_err(serde::de::Error::custom)
    }
}
