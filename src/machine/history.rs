//! Transition history of a machine.
//!
//! Every `change_state` is recorded in order, with the wall-clock time it
//! happened. The history is diagnostic only; it is never replayed.
//!
//! Only the most recent transitions are kept. Once the limit is reached the
//! oldest record is dropped for every new one.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::time::Duration;

/// Number of transitions a history keeps unless told otherwise.
pub const DEFAULT_HISTORY_LIMIT: usize = 64;

/// Record of a single change of the current state.
///
/// `None` stands for "no active state".
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TransitionRecord {
    /// The state being left
    pub from: Option<String>,
    /// The state being entered
    pub to: Option<String>,
    /// When the transition happened
    pub timestamp: DateTime<Utc>,
}

/// Ordered, bounded history of transitions.
#[derive(Clone, Debug, Serialize)]
pub struct TransitionHistory {
    transitions: VecDeque<TransitionRecord>,
    #[serde(skip)]
    limit: usize,
}

impl Default for TransitionHistory {
    fn default() -> Self {
        Self::with_limit(DEFAULT_HISTORY_LIMIT)
    }
}

impl TransitionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// A history keeping at most `limit` transitions. A limit of zero
    /// records nothing.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            transitions: VecDeque::with_capacity(limit.min(DEFAULT_HISTORY_LIMIT)),
            limit,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Change the limit, dropping the oldest records if there are too many.
    pub fn set_limit(&mut self, limit: usize) {
        self.limit = limit;
        self.trim();
    }

    /// Append a transition, evicting the oldest one when full.
    pub fn record(&mut self, transition: TransitionRecord) {
        self.transitions.push_back(transition);
        self.trim();
    }

    /// Forget every recorded transition.
    pub fn clear(&mut self) {
        self.transitions.clear();
    }

    fn trim(&mut self) {
        while self.transitions.len() > self.limit {
            self.transitions.pop_front();
        }
    }

    /// The states traversed: the first kept `from`, then every `to`.
    ///
    /// ```rust
    /// use stepwise::machine::{TransitionHistory, TransitionRecord};
    /// use chrono::Utc;
    ///
    /// let mut history = TransitionHistory::new();
    /// history.record(TransitionRecord {
    ///     from: None,
    ///     to: Some("Step01".to_string()),
    ///     timestamp: Utc::now(),
    /// });
    /// history.record(TransitionRecord {
    ///     from: Some("Step01".to_string()),
    ///     to: None,
    ///     timestamp: Utc::now(),
    /// });
    ///
    /// assert_eq!(history.get_path(), vec![None, Some("Step01"), None]);
    /// ```
    pub fn get_path(&self) -> Vec<Option<&str>> {
        let mut path = Vec::new();
        if let Some(first) = self.transitions.front() {
            path.push(first.from.as_deref());
        }
        for transition in &self.transitions {
            path.push(transition.to.as_deref());
        }
        path
    }

    /// Time between the first and the last transition.
    pub fn duration(&self) -> Option<Duration> {
        if let (Some(first), Some(last)) = (self.transitions.front(), self.transitions.back()) {
            let duration = last.timestamp.signed_duration_since(first.timestamp);
            duration.to_std().ok()
        } else {
            None
        }
    }

    /// Kept transitions, oldest first.
    pub fn transitions(&self) -> impl Iterator<Item = &TransitionRecord> {
        self.transitions.iter()
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }
}
