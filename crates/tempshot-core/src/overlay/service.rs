//! Hosting task for the overlay presenter.
//!
//! The service runs independently of the application. Show commands arrive
//! over the bridge, taps arrive from the surface, and the auto-dismiss timer
//! is derived from the presenter's deadline on every turn of the loop. All
//! three are handled one at a time on the same task, so the presenter needs
//! no locking and a timer can never fire against a torn-down prompt.

use std::future::Future;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use super::presenter::{OverlayPresenter, SessionSnapshot};
use super::surface::{Surface, SurfaceInput};
use crate::bridge::{HostBridge, Subscription};
use crate::events::OverlayCommand;
use crate::storage::config::OverlayConfig;

pub struct OverlayService<S: Surface> {
    presenter: OverlayPresenter<S>,
    bridge: HostBridge,
    commands: Subscription<OverlayCommand>,
    inputs: mpsc::UnboundedReceiver<SurfaceInput>,
    status: watch::Sender<SessionSnapshot>,
}

impl<S: Surface + 'static> OverlayService<S> {
    /// Build the service and register it on the command topic.
    ///
    /// The service counts as running from here on. Commands sent before this
    /// call are dropped; commands sent after it are queued until
    /// [`run`](Self::run) or [`spawn`](Self::spawn) picks them up. Once `run`
    /// returns the registration is gone and commands are dropped again.
    pub fn new(surface: S, config: &OverlayConfig, bridge: HostBridge) -> Self {
        let (input_tx, inputs) = mpsc::unbounded_channel();
        let presenter = OverlayPresenter::new(surface, config, input_tx);
        let commands = bridge.subscribe_commands();
        let (status, _) = watch::channel(presenter.snapshot());
        Self {
            presenter,
            bridge,
            commands,
            inputs,
            status,
        }
    }

    /// Run on a new task.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn spawn(self) -> ServiceHandle<S> {
        let (stop_tx, stop_rx) = oneshot::channel();
        let status = self.status.subscribe();
        let task = tokio::spawn(self.run(async move {
            let _ = stop_rx.await;
        }));
        ServiceHandle {
            stop: Some(stop_tx),
            status,
            task,
        }
    }

    /// Process events until `shutdown` completes, then release the surface.
    ///
    /// Returns the presenter so the caller can inspect the final session.
    pub async fn run(mut self, shutdown: impl Future<Output = ()>) -> OverlayPresenter<S> {
        info!(topic = %self.bridge.command_topic(), "overlay service started");
        tokio::pin!(shutdown);

        loop {
            let deadline = self.presenter.deadline();
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                _ = wait_for_deadline(deadline) => self.on_deadline(),
                Some(input) = self.inputs.recv() => self.on_input(input),
                command = self.commands.recv() => match command {
                    Some(command) => self.on_command(command),
                    None => break,
                },
            }
            self.status.send_replace(self.presenter.snapshot());
        }

        self.presenter.shutdown();
        self.status.send_replace(self.presenter.snapshot());
        info!("overlay service stopped");
        self.presenter
    }

    fn on_command(&mut self, command: OverlayCommand) {
        match command {
            OverlayCommand::Show { artifact_id } => {
                if let Err(e) = self.presenter.show(artifact_id, Instant::now()) {
                    warn!(error = %e, "expiry prompt not shown");
                }
            }
        }
    }

    fn on_input(&mut self, input: SurfaceInput) {
        match self.presenter.handle_input(input, Instant::now()) {
            Ok(Some(outcome)) => {
                let delivery = self.bridge.publish_outcome(outcome);
                debug!(?delivery, "outcome published");
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "surface input rejected"),
        }
    }

    fn on_deadline(&mut self) {
        if !self.presenter.expire(Instant::now()) {
            debug!("deadline woke with no expired session");
        }
    }
}

async fn wait_for_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Control handle for a spawned [`OverlayService`].
pub struct ServiceHandle<S: Surface> {
    stop: Option<oneshot::Sender<()>>,
    status: watch::Receiver<SessionSnapshot>,
    task: JoinHandle<OverlayPresenter<S>>,
}

impl<S: Surface + 'static> ServiceHandle<S> {
    pub fn snapshot(&self) -> SessionSnapshot {
        self.status.borrow().clone()
    }

    /// Wait until the presenter's snapshot satisfies `pred`.
    ///
    /// Returns `None` if the service stopped first.
    pub async fn wait_until(
        &mut self,
        pred: impl FnMut(&SessionSnapshot) -> bool,
    ) -> Option<SessionSnapshot> {
        self.status.wait_for(pred).await.ok().map(|s| (*s).clone())
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Stop the service, release the surface, and hand back the presenter.
    pub async fn stop(mut self) -> Option<OverlayPresenter<S>> {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        match (&mut self.task).await {
            Ok(presenter) => Some(presenter),
            Err(e) => {
                warn!(error = %e, "overlay service task failed");
                None
            }
        }
    }
}
