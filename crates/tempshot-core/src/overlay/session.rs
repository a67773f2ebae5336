use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

/// Identifies one prompt shown by a presenter. Increases with every `show`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub(crate) u64);

impl SessionId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Displayed,
    /// The user picked a duration; an outcome was published.
    Resolved,
    /// Nobody answered before the deadline. No outcome.
    TimedOut,
    /// The surface went away without a choice. No outcome.
    Dismissed,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionState::Resolved | SessionState::TimedOut | SessionState::Dismissed
        )
    }
}

/// One expiry prompt for one artifact.
///
/// The deadline is fixed at creation and never extended.
#[derive(Debug, Clone)]
pub struct OverlaySession {
    id: SessionId,
    artifact_id: String,
    state: SessionState,
    created_at: Instant,
    deadline: Instant,
    shown_at: DateTime<Utc>,
}

impl OverlaySession {
    pub(crate) fn open(
        id: SessionId,
        artifact_id: String,
        now: Instant,
        timeout: Duration,
    ) -> Self {
        Self {
            id,
            artifact_id,
            state: SessionState::Displayed,
            created_at: now,
            deadline: now + timeout,
            shown_at: Utc::now(),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn artifact_id(&self) -> &str {
        &self.artifact_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Wall-clock time the prompt went up.
    pub fn shown_at(&self) -> DateTime<Utc> {
        self.shown_at
    }

    pub fn is_displayed(&self) -> bool {
        self.state == SessionState::Displayed
    }

    /// Move to a terminal state. Returns `false` if the session already ended.
    pub(crate) fn finish(&mut self, state: SessionState) -> bool {
        debug_assert!(state.is_terminal());
        if !self.is_displayed() {
            return false;
        }
        self.state = state;
        true
    }
}
