//! Refresh workflow state machine
//!
//! A refresh progresses PARSING → LOADING → OVERLAYING → VERIFYING →
//! PUBLISHING → COMPLETED, or ends in FAILED from any non-terminal state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::report::RefreshReport;

/// Refresh workflow state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RefreshState {
    /// Reading feeds into records, nothing written yet
    Parsing,
    /// Truncate and reload catalog tables
    Loading,
    /// Staging and applying trait overlays
    Overlaying,
    /// Consistency gate
    Verifying,
    /// Aggregate rebuild and commit
    Publishing,
    /// Committed
    Completed,
    /// Rolled back
    Failed,
}

impl RefreshState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RefreshState::Completed | RefreshState::Failed)
    }
}

/// State transition event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub session_id: Uuid,
    pub old_state: RefreshState,
    pub new_state: RefreshState,
    pub transitioned_at: DateTime<Utc>,
}

/// One refresh run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshSession {
    pub session_id: Uuid,
    pub state: RefreshState,
    pub report: RefreshReport,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl RefreshSession {
    pub fn new() -> Self {
        let session_id = Uuid::new_v4();
        Self {
            session_id,
            state: RefreshState::Parsing,
            report: RefreshReport::new(session_id),
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    /// Transition to new state
    pub fn transition_to(&mut self, new_state: RefreshState) -> StateTransition {
        let transition = StateTransition {
            session_id: self.session_id,
            old_state: self.state,
            new_state,
            transitioned_at: Utc::now(),
        };
        self.state = new_state;

        if new_state.is_terminal() {
            let now = Utc::now();
            self.ended_at = Some(now);
            self.report.duration_ms = (now - self.started_at).num_milliseconds().max(0) as u64;
        }

        info!(
            session_id = %self.session_id,
            "Refresh {:?} -> {:?}",
            transition.old_state,
            transition.new_state
        );

        transition
    }
}

impl Default for RefreshSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_starts_parsing() {
        let session = RefreshSession::new();
        assert_eq!(session.state, RefreshState::Parsing);
        assert!(session.ended_at.is_none());
        assert_eq!(session.report.session_id, session.session_id);
    }

    #[test]
    fn test_terminal_transition_sets_end_time() {
        let mut session = RefreshSession::new();
        let t = session.transition_to(RefreshState::Loading);
        assert_eq!(t.old_state, RefreshState::Parsing);
        assert!(session.ended_at.is_none());

        session.transition_to(RefreshState::Failed);
        assert!(session.state.is_terminal());
        assert!(session.ended_at.is_some());
    }
}
