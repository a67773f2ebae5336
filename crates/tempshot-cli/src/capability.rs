//! Overlay grant for terminal hosts.
//!
//! The terminal has no system permission store, so the grant is a marker
//! file next to the config. Only the consent flow and `permission revoke`
//! touch it.

use std::io::{BufRead, Write};
use std::path::PathBuf;

use tempshot_core::storage::data_dir;
use tempshot_core::OverlayCapability;
use tracing::warn;

const MARKER_FILE: &str = "overlay-permission";

/// Set to skip the grant entirely, as on hosts that do not gate overlays.
const UNGATED_ENV: &str = "TEMPSHOT_OVERLAY_UNGATED";

pub struct MarkerCapability {
    marker: PathBuf,
}

impl MarkerCapability {
    pub fn from_data_dir() -> std::io::Result<Self> {
        Ok(Self {
            marker: data_dir()?.join(MARKER_FILE),
        })
    }

    pub fn revoke(&self) -> std::io::Result<bool> {
        match std::fs::remove_file(&self.marker) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn ask(&self) -> std::io::Result<bool> {
        let mut stderr = std::io::stderr().lock();
        write!(stderr, "Allow tempshot to draw prompts over the terminal? [y/N] ")?;
        stderr.flush()?;

        let mut answer = String::new();
        std::io::stdin().lock().read_line(&mut answer)?;
        Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
    }
}

impl OverlayCapability for MarkerCapability {
    fn is_supported(&self) -> bool {
        std::env::var_os(UNGATED_ENV).is_none()
    }

    fn is_granted(&self) -> bool {
        self.marker.exists()
    }

    fn launch_consent_flow(&self) {
        match self.ask() {
            Ok(true) => {
                if let Err(e) = std::fs::write(&self.marker, b"granted\n") {
                    warn!(error = %e, "could not record overlay grant");
                }
            }
            Ok(false) => {}
            Err(e) => warn!(error = %e, "consent prompt failed"),
        }
    }
}
