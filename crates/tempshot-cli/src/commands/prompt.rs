use std::time::Duration;

use clap::Args;
use serde::Serialize;
use tempshot_core::error::Result;
use tempshot_core::{
    Config, CoreError, HostBridge, Outcome, OverlayHost, OverlayService, PermissionGate,
    SessionState,
};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::capability::MarkerCapability;
use crate::terminal::TerminalSurface;

/// How long past the prompt timeout to wait for the service to report.
const REPORT_GRACE: Duration = Duration::from_secs(2);

#[derive(Args)]
pub struct PromptArgs {
    /// Identifier of the screenshot being decided
    pub artifact_id: String,
    /// Override the auto-dismiss timeout
    #[arg(long)]
    pub timeout_secs: Option<u64>,
    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

/// What came of one prompt.
#[derive(Debug, Serialize)]
struct PromptReport {
    artifact_id: String,
    state: SessionState,
    /// Present only when the user picked a duration.
    minutes: Option<i64>,
}

impl PromptReport {
    fn describe(&self) -> String {
        match self.minutes {
            Some(-1) => format!("{}: keep forever", self.artifact_id),
            Some(m) => format!("{}: keep for {m} min", self.artifact_id),
            None => format!("{}: no decision", self.artifact_id),
        }
    }
}

pub fn run(args: PromptArgs) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let json = args.json;
    let result = runtime.block_on(prompt(args));
    // The stdin reader may still be parked on a blocking read.
    runtime.shutdown_background();

    let report = result?;
    if json {
        println!("{}", serde_json::to_string(&report)?);
    } else {
        println!("{}", report.describe());
    }
    Ok(())
}

async fn prompt(args: PromptArgs) -> Result<PromptReport> {
    let mut config = Config::load()?;
    if let Some(secs) = args.timeout_secs {
        config.overlay.timeout_secs = secs;
        config.validate()?;
    }

    let bridge = HostBridge::new(&config.bridge);
    let host = OverlayHost::new(
        bridge.clone(),
        PermissionGate::new(MarkerCapability::from_data_dir()?),
    );
    if !host.has_overlay_permission() {
        return Err(CoreError::PermissionDenied);
    }

    let mut service = OverlayService::new(TerminalSurface::new(), &config.overlay, bridge).spawn();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let _listener = host.register_listener(move |artifact_id: &str, minutes: i64| {
        let _ = tx.send(Outcome {
            artifact_id: artifact_id.to_string(),
            minutes,
        });
    });

    let artifact_id = args.artifact_id;
    let delivery = host.show_overlay_prompt(artifact_id.clone());
    debug!(?delivery, "show command sent");

    // A prompt the surface refused to show never reaches a terminal state,
    // so the wait is bounded by the prompt's own timeout.
    let finished = tokio::time::timeout(
        config.overlay.timeout() + REPORT_GRACE,
        service.wait_until(|s| {
            s.artifact_id.as_deref() == Some(artifact_id.as_str()) && s.state.is_terminal()
        }),
    )
    .await;
    let state = match finished {
        Ok(Some(snapshot)) => snapshot.state,
        Ok(None) => SessionState::Dismissed,
        Err(_) => {
            warn!(%artifact_id, "prompt never reported a result");
            SessionState::Dismissed
        }
    };

    let minutes = match state {
        SessionState::Resolved => rx
            .recv()
            .await
            .filter(|o| o.artifact_id == artifact_id)
            .map(|o| o.minutes),
        _ => None,
    };
    service.stop().await;

    Ok(PromptReport {
        artifact_id,
        state,
        minutes,
    })
}
