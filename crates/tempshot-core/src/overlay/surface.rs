//! Prompt surface abstraction.
//!
//! A surface is whatever actually draws the prompt: a system overlay window,
//! a terminal, or nothing at all in tests. The presenter only ever attaches,
//! detaches and asks whether the surface is still attached.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use super::session::SessionId;
use crate::catalog::DurationOption;
use crate::error::SurfaceError;

/// Everything a surface needs to render one prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub session: SessionId,
    pub artifact_id: String,
    pub title: String,
    pub options: &'static [DurationOption],
}

/// User or environment input, stamped with the session it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceInput {
    Selected { session: SessionId, label: String },
    Dismissed { session: SessionId },
}

impl SurfaceInput {
    pub fn session(&self) -> SessionId {
        match self {
            SurfaceInput::Selected { session, .. } | SurfaceInput::Dismissed { session } => *session,
        }
    }
}

/// Handed to a surface on attach; feeds input back to the presenter's queue.
///
/// Input sent through a sink from a replaced prompt is ignored.
#[derive(Debug, Clone)]
pub struct InputSink {
    session: SessionId,
    tx: mpsc::UnboundedSender<SurfaceInput>,
}

impl InputSink {
    pub(crate) fn new(session: SessionId, tx: mpsc::UnboundedSender<SurfaceInput>) -> Self {
        Self { session, tx }
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Report a tap on the option with `label`. `false` if the presenter is gone.
    pub fn select(&self, label: impl Into<String>) -> bool {
        self.tx
            .send(SurfaceInput::Selected {
                session: self.session,
                label: label.into(),
            })
            .is_ok()
    }

    /// Report that the surface was removed without a choice.
    pub fn dismiss(&self) -> bool {
        self.tx
            .send(SurfaceInput::Dismissed {
                session: self.session,
            })
            .is_ok()
    }
}

pub trait Surface: Send {
    /// Draw `prompt`. Fails with [`SurfaceError::PermissionDenied`] when the
    /// overlay capability is missing.
    fn attach(&mut self, prompt: &Prompt, input: InputSink) -> Result<(), SurfaceError>;

    /// Remove the prompt.
    fn detach(&mut self) -> Result<(), SurfaceError>;

    fn is_attached(&self) -> bool;
}

impl<S: Surface + ?Sized> Surface for Box<S> {
    fn attach(&mut self, prompt: &Prompt, input: InputSink) -> Result<(), SurfaceError> {
        (**self).attach(prompt, input)
    }

    fn detach(&mut self) -> Result<(), SurfaceError> {
        (**self).detach()
    }

    fn is_attached(&self) -> bool {
        (**self).is_attached()
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    attached: Option<(Prompt, InputSink)>,
    permission_denied: bool,
    attach_count: usize,
    detach_count: usize,
}

/// Headless surface that keeps the current prompt in memory.
///
/// Clones share state, so a host can hand one clone to the presenter and keep
/// another to inspect the prompt and simulate taps.
#[derive(Debug, Clone, Default)]
pub struct MemorySurface {
    state: Arc<Mutex<MemoryState>>,
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// A surface whose attach fails as if the overlay grant were missing.
    pub fn without_permission() -> Self {
        let surface = Self::default();
        surface.set_permission(false);
        surface
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_permission(&self, granted: bool) {
        self.lock().permission_denied = !granted;
    }

    pub fn current_prompt(&self) -> Option<Prompt> {
        self.lock().attached.as_ref().map(|(prompt, _)| prompt.clone())
    }

    pub fn current_sink(&self) -> Option<InputSink> {
        self.lock().attached.as_ref().map(|(_, sink)| sink.clone())
    }

    /// Simulate a tap on `label` in the visible prompt.
    pub fn tap(&self, label: &str) -> bool {
        self.current_sink().is_some_and(|sink| sink.select(label))
    }

    /// Remove the prompt from outside the presenter and report the dismissal.
    pub fn detach_externally(&self) -> bool {
        let removed = self.lock().attached.take();
        removed.is_some_and(|(_, sink)| sink.dismiss())
    }

    pub fn attach_count(&self) -> usize {
        self.lock().attach_count
    }

    pub fn detach_count(&self) -> usize {
        self.lock().detach_count
    }
}

impl Surface for MemorySurface {
    fn attach(&mut self, prompt: &Prompt, input: InputSink) -> Result<(), SurfaceError> {
        let mut state = self.lock();
        if state.permission_denied {
            return Err(SurfaceError::PermissionDenied);
        }
        state.attached = Some((prompt.clone(), input));
        state.attach_count += 1;
        Ok(())
    }

    fn detach(&mut self) -> Result<(), SurfaceError> {
        let mut state = self.lock();
        if state.attached.take().is_none() {
            return Err(SurfaceError::Detached);
        }
        state.detach_count += 1;
        Ok(())
    }

    fn is_attached(&self) -> bool {
        self.lock().attached.is_some()
    }
}
