//! Application-side entry points.
//!
//! [`OverlayHost`] is what the application holds. It never touches the
//! presenter directly: prompts are requested over the command topic and
//! choices come back over the outcome topic, so the application can be
//! backgrounded while the prompt is on screen.

use tokio::task::JoinHandle;
use tracing::debug;

use crate::bridge::{Delivery, HostBridge};
use crate::events::OverlayCommand;
use crate::permission::{OverlayCapability, PermissionGate};

/// Receives the user's retention choices.
pub trait ExpiryListener: Send + 'static {
    /// `duration_minutes` is a catalog value; `-1` means keep forever.
    fn on_expiry_selected(&mut self, artifact_id: &str, duration_minutes: i64);
}

impl<F> ExpiryListener for F
where
    F: FnMut(&str, i64) + Send + 'static,
{
    fn on_expiry_selected(&mut self, artifact_id: &str, duration_minutes: i64) {
        self(artifact_id, duration_minutes)
    }
}

/// Registration returned by [`OverlayHost::register_listener`].
///
/// Dropping it stops delivery to the listener.
#[derive(Debug)]
pub struct ListenerHandle {
    task: JoinHandle<()>,
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

pub struct OverlayHost<C> {
    bridge: HostBridge,
    gate: PermissionGate<C>,
}

impl<C: OverlayCapability> OverlayHost<C> {
    pub fn new(bridge: HostBridge, gate: PermissionGate<C>) -> Self {
        Self { bridge, gate }
    }

    pub fn bridge(&self) -> &HostBridge {
        &self.bridge
    }

    pub fn has_overlay_permission(&self) -> bool {
        self.gate.has_permission()
    }

    /// Start the consent flow. Check
    /// [`has_overlay_permission`](Self::has_overlay_permission) again once
    /// the application regains focus.
    pub fn request_overlay_permission(&self) {
        self.gate.request_permission();
    }

    /// Ask the overlay service to prompt for `artifact_id`.
    ///
    /// The permission is not checked here; call
    /// [`has_overlay_permission`](Self::has_overlay_permission) first. If no
    /// service is running the request is dropped.
    pub fn show_overlay_prompt(&self, artifact_id: impl Into<String>) -> Delivery {
        let artifact_id = artifact_id.into();
        debug!(%artifact_id, "requesting expiry prompt");
        self.bridge.send_command(OverlayCommand::Show { artifact_id })
    }

    /// Deliver every outcome published from now on to `listener`.
    ///
    /// Outcomes published before this call are not replayed.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn register_listener<L: ExpiryListener>(&self, mut listener: L) -> ListenerHandle {
        let mut outcomes = self.bridge.subscribe_outcomes();
        let task = tokio::spawn(async move {
            while let Some(outcome) = outcomes.recv().await {
                listener.on_expiry_selected(&outcome.artifact_id, outcome.minutes);
            }
        });
        ListenerHandle { task }
    }
}
