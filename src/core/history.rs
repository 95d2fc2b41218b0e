//! Bounded history of finished transitions.

use super::state::INTERNAL_ERROR;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

/// How a transition finished.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// The machine settled in the target state.
    Settled,
    /// A handler failed and the machine was pinned to `InternalError`.
    Failed,
}

/// Record of a single finished transition.
///
/// # Example
///
/// ```rust
/// use settle::core::{Outcome, TransitionRecord};
/// use chrono::Utc;
///
/// let record = TransitionRecord {
///     from: "Off".to_string(),
///     to: "Red".to_string(),
///     timestamp: Utc::now(),
///     outcome: Outcome::Settled,
/// };
/// assert!(record.is_settled());
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransitionRecord {
    /// The state being transitioned from
    pub from: String,
    /// The state being transitioned to
    pub to: String,
    /// When the transition finished
    pub timestamp: DateTime<Utc>,
    pub outcome: Outcome,
}

impl TransitionRecord {
    pub fn is_settled(&self) -> bool {
        self.outcome == Outcome::Settled
    }

    /// The state the machine was left in: `to`, or `InternalError` when a
    /// handler failed.
    pub fn landed_in(&self) -> &str {
        match self.outcome {
            Outcome::Settled => &self.to,
            Outcome::Failed => INTERNAL_ERROR,
        }
    }
}

/// Ordered history of transitions, keeping at most `limit` records.
///
/// Once full, the oldest record is discarded for every new one.
///
/// # Example
///
/// ```rust
/// use settle::core::{Outcome, StateHistory, TransitionRecord};
/// use chrono::Utc;
///
/// let mut history = StateHistory::with_limit(8);
/// for (from, to) in [("Off", "Red"), ("Red", "Green")] {
///     history.record(TransitionRecord {
///         from: from.to_string(),
///         to: to.to_string(),
///         timestamp: Utc::now(),
///         outcome: Outcome::Settled,
///     });
/// }
///
/// assert_eq!(history.get_path(), vec!["Off", "Red", "Green"]);
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StateHistory {
    records: VecDeque<TransitionRecord>,
    limit: usize,
}

impl StateHistory {
    pub const DEFAULT_LIMIT: usize = 64;

    pub fn new() -> Self {
        Self::with_limit(Self::DEFAULT_LIMIT)
    }

    /// Create a history holding at most `limit` records. A limit of zero
    /// disables recording.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            records: VecDeque::new(),
            limit,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Append a record, evicting the oldest when full.
    pub fn record(&mut self, record: TransitionRecord) {
        if self.limit == 0 {
            return;
        }
        while self.records.len() >= self.limit {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    /// Get the path of states traversed: the source of the oldest kept
    /// record, then the state every record left the machine in.
    pub fn get_path(&self) -> Vec<&str> {
        let mut path = Vec::new();
        if let Some(first) = self.records.front() {
            path.push(first.from.as_str());
        }
        path.extend(self.records.iter().map(TransitionRecord::landed_in));
        path
    }

    /// Time between the oldest and newest kept record.
    pub fn duration(&self) -> Option<Duration> {
        let (first, last) = (self.records.front()?, self.records.back()?);
        last.timestamp
            .signed_duration_since(first.timestamp)
            .to_std()
            .ok()
    }

    pub fn last(&self) -> Option<&TransitionRecord> {
        self.records.back()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TransitionRecord> {
        self.records.iter()
    }
}

impl Default for StateHistory {
    fn default() -> Self {
        Self::new()
    }
}
