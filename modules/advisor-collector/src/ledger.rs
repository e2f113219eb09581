use std::collections::HashMap;
use std::sync::Mutex;

use tracing::warn;

/// Completion state of one fan-out task. `Complete` and `Error` are both
/// terminal; only `NotStarted` blocks the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    NotStarted,
    Complete,
    Error,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, TaskState::NotStarted)
    }
}

/// Per-task completion tracker, keyed by actions URL. The single source of
/// truth for "is the run done".
///
/// Every registered task transitions NotStarted → Complete or Error exactly
/// once; a second transition attempt is refused and logged, never applied.
#[derive(Debug, Default)]
pub struct ProgressLedger {
    entries: Mutex<HashMap<String, TaskState>>,
}

impl ProgressLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task as NotStarted. Duplicate registrations collapse into
    /// one entry (two catalog rows can share an actions URL).
    pub fn register(&self, url: &str) {
        let mut entries = self.entries.lock().expect("ledger lock poisoned");
        if entries
            .insert(url.to_string(), TaskState::NotStarted)
            .is_some()
        {
            warn!(url, "task registered twice, keeping one ledger entry");
        }
    }

    pub fn complete(&self, url: &str) -> bool {
        self.transition(url, TaskState::Complete)
    }

    pub fn error(&self, url: &str) -> bool {
        self.transition(url, TaskState::Error)
    }

    fn transition(&self, url: &str, to: TaskState) -> bool {
        let mut entries = self.entries.lock().expect("ledger lock poisoned");
        match entries.get_mut(url) {
            Some(state @ TaskState::NotStarted) => {
                *state = to;
                true
            }
            Some(state) => {
                warn!(url, from = ?state, to = ?to, "refusing second terminal transition");
                false
            }
            None => {
                warn!(url, "transition for unregistered task ignored");
                false
            }
        }
    }

    /// URLs still waiting on a terminal state.
    pub fn pending(&self) -> Vec<String> {
        let entries = self.entries.lock().expect("ledger lock poisoned");
        entries
            .iter()
            .filter(|(_, state)| !state.is_terminal())
            .map(|(url, _)| url.clone())
            .collect()
    }

    /// (complete, error) totals, for the run summary.
    pub fn counts(&self) -> (usize, usize) {
        let entries = self.entries.lock().expect("ledger lock poisoned");
        let complete = entries
            .values()
            .filter(|s| matches!(s, TaskState::Complete))
            .count();
        let error = entries
            .values()
            .filter(|s| matches!(s, TaskState::Error))
            .count();
        (complete, error)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("ledger lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registered_task_starts_pending() {
        let ledger = ProgressLedger::new();
        ledger.register("/d1");
        assert_eq!(ledger.pending(), vec!["/d1".to_string()]);
        assert_eq!(ledger.counts(), (0, 0));
    }

    #[test]
    fn complete_transitions_exactly_once() {
        let ledger = ProgressLedger::new();
        ledger.register("/d1");
        assert!(ledger.complete("/d1"));
        assert!(!ledger.complete("/d1"));
        assert_eq!(ledger.counts(), (1, 0));
    }

    #[test]
    fn terminal_state_never_reverts() {
        let ledger = ProgressLedger::new();
        ledger.register("/d1");
        assert!(ledger.error("/d1"));
        assert!(!ledger.complete("/d1"));
        assert_eq!(ledger.counts(), (0, 1));
        assert!(ledger.pending().is_empty());
    }

    #[test]
    fn unregistered_transition_is_refused() {
        let ledger = ProgressLedger::new();
        assert!(!ledger.complete("/nope"));
        assert!(ledger.is_empty());
    }

    #[test]
    fn error_is_terminal_for_completion_purposes() {
        let ledger = ProgressLedger::new();
        ledger.register("/d1");
        ledger.register("/d2");
        ledger.complete("/d1");
        assert_eq!(ledger.pending(), vec!["/d2".to_string()]);
        ledger.error("/d2");
        assert!(ledger.pending().is_empty());
    }
}
