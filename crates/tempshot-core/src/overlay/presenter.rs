//! Overlay presenter implementation.
//!
//! The presenter is a single-slot state machine. It does not own a timer
//! thread; the hosting service reads [`OverlayPresenter::deadline`] and calls
//! [`OverlayPresenter::expire`] when it passes.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Displayed -> (Resolved | TimedOut | Dismissed)
//!            ^                      |
//!            +------- show ---------+
//! ```
//!
//! `show` while `Displayed` replaces the visible session. The replaced
//! session ends without an outcome.

use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::session::{OverlaySession, SessionId, SessionState};
use super::surface::{InputSink, Prompt, Surface, SurfaceInput};
use crate::catalog::{self, CATALOG};
use crate::error::OverlayError;
use crate::events::Outcome;
use crate::storage::config::OverlayConfig;

/// Point-in-time view of the presenter, published by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub session: Option<SessionId>,
    pub artifact_id: Option<String>,
    pub state: SessionState,
}

pub struct OverlayPresenter<S: Surface> {
    surface: S,
    input_tx: mpsc::UnboundedSender<SurfaceInput>,
    timeout: Duration,
    title: String,
    next_id: u64,
    session: Option<OverlaySession>,
}

impl<S: Surface> OverlayPresenter<S> {
    /// Create an idle presenter. Surface input is delivered to `input_tx`.
    pub fn new(
        surface: S,
        config: &OverlayConfig,
        input_tx: mpsc::UnboundedSender<SurfaceInput>,
    ) -> Self {
        Self {
            surface,
            input_tx,
            timeout: config.timeout(),
            title: config.title.clone(),
            next_id: 1,
            session: None,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// State of the current (or most recent) session; `Idle` before the
    /// first `show`.
    pub fn state(&self) -> SessionState {
        self.session
            .as_ref()
            .map(OverlaySession::state)
            .unwrap_or(SessionState::Idle)
    }

    pub fn session(&self) -> Option<&OverlaySession> {
        self.session.as_ref()
    }

    /// When the visible prompt auto-dismisses. `None` unless `Displayed`.
    pub fn deadline(&self) -> Option<Instant> {
        self.session
            .as_ref()
            .filter(|s| s.is_displayed())
            .map(OverlaySession::deadline)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session: self.session.as_ref().map(OverlaySession::id),
            artifact_id: self.session.as_ref().map(|s| s.artifact_id().to_string()),
            state: self.state(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Put up a prompt for `artifact_id`, replacing any visible one.
    ///
    /// # Errors
    ///
    /// Returns [`OverlayError::SurfaceUnavailable`] when the surface refuses
    /// to attach. The presenter is then `Idle`.
    pub fn show(
        &mut self,
        artifact_id: impl Into<String>,
        now: Instant,
    ) -> Result<SessionId, OverlayError> {
        let artifact_id = artifact_id.into();
        self.supersede();

        let id = SessionId(self.next_id);
        self.next_id += 1;
        let prompt = Prompt {
            session: id,
            artifact_id: artifact_id.clone(),
            title: self.title.clone(),
            options: CATALOG,
        };
        let sink = InputSink::new(id, self.input_tx.clone());

        if let Err(source) = self.surface.attach(&prompt, sink) {
            self.session = None;
            return Err(OverlayError::SurfaceUnavailable {
                artifact_id,
                source,
            });
        }

        let session = OverlaySession::open(id, artifact_id, now, self.timeout);
        info!(
            session = %id,
            artifact_id = session.artifact_id(),
            shown_at = %session.shown_at(),
            timeout_secs = self.timeout.as_secs(),
            "expiry prompt shown"
        );
        self.session = Some(session);
        Ok(id)
    }

    /// Apply a tap on `label` in session `session`, made at `now`.
    ///
    /// Returns the outcome to publish, or `None` when the session is no
    /// longer the visible one. A tap at or after the deadline times the
    /// session out instead.
    ///
    /// # Errors
    ///
    /// Returns [`OverlayError::UnknownOption`] for a label outside the
    /// catalog; the session stays `Displayed`.
    pub fn select(
        &mut self,
        session: SessionId,
        label: &str,
        now: Instant,
    ) -> Result<Option<Outcome>, OverlayError> {
        if !self.is_current(session) {
            debug!(%session, label, "selection for inactive session ignored");
            return Ok(None);
        }
        if self.expire(now) {
            debug!(%session, label, "selection arrived after the deadline");
            return Ok(None);
        }
        let option =
            catalog::find(label).ok_or_else(|| OverlayError::UnknownOption(label.to_string()))?;

        self.teardown();
        let Some(current) = self.session.as_mut() else {
            return Ok(None);
        };
        current.finish(SessionState::Resolved);
        info!(
            session = %session,
            artifact_id = current.artifact_id(),
            minutes = option.minutes,
            after_ms = now.saturating_duration_since(current.created_at()).as_millis() as u64,
            "expiry selected"
        );
        Ok(Some(Outcome {
            artifact_id: current.artifact_id().to_string(),
            minutes: option.minutes,
        }))
    }

    /// Auto-dismiss the visible prompt if its deadline has passed.
    ///
    /// Returns `true` if the session timed out.
    pub fn expire(&mut self, now: Instant) -> bool {
        match self.deadline() {
            Some(deadline) if now >= deadline => {}
            _ => return false,
        }
        self.teardown();
        if let Some(current) = self.session.as_mut() {
            current.finish(SessionState::TimedOut);
            info!(session = %current.id(), artifact_id = current.artifact_id(), "expiry prompt timed out without a choice");
        }
        true
    }

    /// End session `session` without an outcome. Returns `true` if it was
    /// still visible.
    pub fn dismiss(&mut self, session: SessionId) -> bool {
        if !self.is_current(session) {
            return false;
        }
        self.teardown();
        if let Some(current) = self.session.as_mut() {
            current.finish(SessionState::Dismissed);
            info!(session = %session, artifact_id = current.artifact_id(), "expiry prompt dismissed");
        }
        true
    }

    /// Route one surface input received at `now`.
    ///
    /// # Errors
    ///
    /// See [`select`](Self::select).
    pub fn handle_input(
        &mut self,
        input: SurfaceInput,
        now: Instant,
    ) -> Result<Option<Outcome>, OverlayError> {
        match input {
            SurfaceInput::Selected { session, label } => self.select(session, &label, now),
            SurfaceInput::Dismissed { session } => {
                self.dismiss(session);
                Ok(None)
            }
        }
    }

    /// Release the surface and end any visible session without an outcome.
    pub fn shutdown(&mut self) {
        match self.visible_id() {
            Some(id) => {
                self.dismiss(id);
            }
            None => self.teardown(),
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn is_current(&self, session: SessionId) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| s.id() == session && s.is_displayed())
    }

    fn visible_id(&self) -> Option<SessionId> {
        self.session
            .as_ref()
            .filter(|s| s.is_displayed())
            .map(OverlaySession::id)
    }

    fn supersede(&mut self) {
        if let Some(previous) = self.visible_id() {
            debug!(session = %previous, "replacing visible prompt");
            self.dismiss(previous);
        }
    }

    /// Detach the surface if it is still attached.
    fn teardown(&mut self) {
        if !self.surface.is_attached() {
            debug!("surface already detached");
            return;
        }
        if let Err(e) = self.surface.detach() {
            warn!(error = %e, "surface detach failed; treating as detached");
        }
    }
}

impl<S: Surface> Drop for OverlayPresenter<S> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::KEEP_FOREVER;
    use crate::overlay::surface::MemorySurface;
    use proptest::prelude::*;

    const TIMEOUT: Duration = Duration::from_secs(15);

    fn presenter() -> (
        OverlayPresenter<MemorySurface>,
        MemorySurface,
        mpsc::UnboundedReceiver<SurfaceInput>,
    ) {
        let surface = MemorySurface::new();
        let (tx, rx) = mpsc::unbounded_channel();
        let presenter = OverlayPresenter::new(surface.clone(), &OverlayConfig::default(), tx);
        (presenter, surface, rx)
    }

    #[test]
    fn starts_idle() {
        let (p, surface, _rx) = presenter();
        assert_eq!(p.state(), SessionState::Idle);
        assert!(p.deadline().is_none());
        assert!(!surface.is_attached());
    }

    #[test]
    fn selecting_thirty_minutes_resolves() {
        let (mut p, surface, _rx) = presenter();
        let start = Instant::now();
        let id = p.show("shot-1", start).unwrap();
        assert_eq!(p.state(), SessionState::Displayed);
        assert_eq!(surface.current_prompt().unwrap().options, CATALOG);

        let outcome = p.select(id, "30m", start + Duration::from_secs(3)).unwrap();
        assert_eq!(
            outcome,
            Some(Outcome {
                artifact_id: "shot-1".into(),
                minutes: 30
            })
        );
        assert_eq!(p.state(), SessionState::Resolved);
        assert!(!surface.is_attached());
        assert!(p.deadline().is_none());
    }

    #[test]
    fn keep_emits_sentinel_but_timeout_emits_nothing() {
        let (mut p, surface, _rx) = presenter();
        let start = Instant::now();

        let id = p.show("shot-2", start).unwrap();
        let keep = p.select(id, "Keep", start).unwrap();
        assert_eq!(keep.map(|o| o.minutes), Some(KEEP_FOREVER));

        let id = p.show("shot-3", start).unwrap();
        assert!(p.expire(start + TIMEOUT));
        assert_eq!(p.state(), SessionState::TimedOut);
        assert!(!surface.is_attached());
        // A late tap on the timed-out prompt produces nothing.
        assert_eq!(p.select(id, "Keep", start + TIMEOUT).unwrap(), None);
    }

    #[test]
    fn deadline_never_fires_early() {
        let (mut p, surface, _rx) = presenter();
        let start = Instant::now();
        p.show("a", start).unwrap();
        assert_eq!(p.deadline(), Some(start + TIMEOUT));
        assert!(!p.expire(start + TIMEOUT - Duration::from_millis(1)));
        assert_eq!(p.state(), SessionState::Displayed);
        assert!(surface.is_attached());
        assert!(p.expire(start + TIMEOUT));
    }

    #[test]
    fn selection_after_timeout_cannot_resolve() {
        let (mut p, _surface, _rx) = presenter();
        let start = Instant::now();
        let id = p.show("a", start).unwrap();
        assert!(p.expire(start + TIMEOUT * 2));
        assert_eq!(p.select(id, "5m", start + TIMEOUT * 2).unwrap(), None);
        assert_eq!(p.state(), SessionState::TimedOut);
    }

    #[test]
    fn tap_at_or_after_deadline_times_out() {
        let (mut p, surface, _rx) = presenter();
        let start = Instant::now();
        let id = p.show("late", start).unwrap();
        // No expire() call: the tap itself must notice the deadline.
        assert_eq!(p.select(id, "5m", start + TIMEOUT).unwrap(), None);
        assert_eq!(p.state(), SessionState::TimedOut);
        assert!(!surface.is_attached());

        let id = p.show("later", start).unwrap();
        let input = SurfaceInput::Selected {
            session: id,
            label: "Keep".into(),
        };
        assert_eq!(p.handle_input(input, start + TIMEOUT * 4).unwrap(), None);
        assert_eq!(p.state(), SessionState::TimedOut);
    }

    #[test]
    fn tap_just_before_deadline_resolves() {
        let (mut p, _surface, _rx) = presenter();
        let start = Instant::now();
        let id = p.show("a", start).unwrap();
        let outcome = p
            .select(id, "1h", start + TIMEOUT - Duration::from_millis(1))
            .unwrap();
        assert_eq!(outcome.map(|o| o.minutes), Some(60));
    }

    #[test]
    fn timeout_after_selection_is_noop() {
        let (mut p, _surface, _rx) = presenter();
        let start = Instant::now();
        let id = p.show("a", start).unwrap();
        assert!(p.select(id, "1h", start).unwrap().is_some());
        assert!(!p.expire(start + TIMEOUT));
        assert_eq!(p.state(), SessionState::Resolved);
    }

    #[test]
    fn show_replaces_visible_session_without_outcome() {
        let (mut p, surface, _rx) = presenter();
        let start = Instant::now();
        let first = p.show("shot-4", start).unwrap();
        let second = p.show("shot-5", start + Duration::from_secs(1)).unwrap();
        assert_ne!(first, second);
        assert_eq!(surface.attach_count(), 2);
        assert_eq!(surface.detach_count(), 1);

        // The replaced prompt can no longer resolve or time out.
        let later = start + Duration::from_secs(2);
        assert_eq!(p.select(first, "5m", later).unwrap(), None);
        assert!(!p.expire(start + TIMEOUT));
        assert_eq!(p.state(), SessionState::Displayed);
        assert_eq!(p.session().unwrap().artifact_id(), "shot-5");

        let outcome = p.select(second, "24h", later).unwrap().unwrap();
        assert_eq!(outcome.artifact_id, "shot-5");
        assert_eq!(outcome.minutes, 1440);
    }

    #[test]
    fn repeated_show_for_same_artifact_restarts_window() {
        let (mut p, surface, _rx) = presenter();
        let start = Instant::now();
        p.show("same", start).unwrap();
        let later = start + Duration::from_secs(10);
        p.show("same", later).unwrap();
        assert_eq!(p.deadline(), Some(later + TIMEOUT));
        assert!(surface.is_attached());
        assert_eq!(surface.attach_count() - surface.detach_count(), 1);
        assert!(!p.expire(start + TIMEOUT));
    }

    #[test]
    fn unknown_label_keeps_session_open() {
        let (mut p, surface, _rx) = presenter();
        let now = Instant::now();
        let id = p.show("a", now).unwrap();
        assert!(matches!(
            p.select(id, "2w", now),
            Err(OverlayError::UnknownOption(label)) if label == "2w"
        ));
        assert_eq!(p.state(), SessionState::Displayed);
        assert!(surface.is_attached());
    }

    #[test]
    fn missing_permission_leaves_presenter_idle() {
        let surface = MemorySurface::without_permission();
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut p = OverlayPresenter::new(surface.clone(), &OverlayConfig::default(), tx);
        let err = p.show("a", Instant::now()).unwrap_err();
        assert!(matches!(err, OverlayError::SurfaceUnavailable { .. }));
        assert_eq!(p.state(), SessionState::Idle);
        assert!(p.deadline().is_none());
        assert_eq!(surface.attach_count(), 0);
    }

    #[test]
    fn external_detach_dismisses_without_outcome() {
        let (mut p, surface, mut rx) = presenter();
        p.show("a", Instant::now()).unwrap();
        assert!(surface.detach_externally());

        let input = rx.try_recv().unwrap();
        assert_eq!(p.handle_input(input, Instant::now()).unwrap(), None);
        assert_eq!(p.state(), SessionState::Dismissed);
        // Teardown found nothing to detach.
        assert_eq!(surface.detach_count(), 0);
    }

    #[test]
    fn taps_travel_through_the_sink() {
        let (mut p, surface, mut rx) = presenter();
        let now = Instant::now();
        let id = p.show("a", now).unwrap();
        assert!(surface.tap("5m"));
        let input = rx.try_recv().unwrap();
        assert_eq!(
            input,
            SurfaceInput::Selected {
                session: id,
                label: "5m".into()
            }
        );
        assert_eq!(p.handle_input(input, now).unwrap().unwrap().minutes, 5);
    }

    #[test]
    fn shutdown_releases_visible_surface() {
        let (mut p, surface, _rx) = presenter();
        p.show("a", Instant::now()).unwrap();
        p.shutdown();
        assert!(!surface.is_attached());
        assert_eq!(p.state(), SessionState::Dismissed);
    }

    #[test]
    fn drop_releases_visible_surface() {
        let (mut p, surface, _rx) = presenter();
        p.show("a", Instant::now()).unwrap();
        drop(p);
        assert!(!surface.is_attached());
    }

    proptest! {
        #[test]
        fn every_catalog_entry_round_trips(index in 0..CATALOG.len(), id in "[a-z0-9-]{1,16}") {
            let (mut p, _surface, _rx) = presenter();
            let option = CATALOG[index];
            let now = Instant::now();
            let session = p.show(id.clone(), now).unwrap();
            let outcome = p.select(session, option.label, now).unwrap().unwrap();
            prop_assert_eq!(outcome.artifact_id, id);
            prop_assert_eq!(outcome.minutes, option.minutes);
            prop_assert_eq!(p.state(), SessionState::Resolved);
        }

        #[test]
        fn at_most_one_outcome_per_session(tap_first in any::<bool>(), extra_taps in 0usize..4) {
            let (mut p, _surface, _rx) = presenter();
            let start = Instant::now();
            let session = p.show("x", start).unwrap();
            let mut outcomes = 0;
            if !tap_first {
                p.expire(start + TIMEOUT);
            }
            for _ in 0..=extra_taps {
                if p.select(session, "5m", start).unwrap().is_some() {
                    outcomes += 1;
                }
            }
            p.expire(start + TIMEOUT);
            prop_assert_eq!(outcomes, usize::from(tap_first));
        }
    }
}
