//! Overlay permission gate.
//!
//! The grant itself lives in the host environment. The gate only reads it and
//! asks the environment to run its consent flow; it never writes the grant.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use tracing::{debug, info};

/// The host environment's view of the "draw over other content" capability.
pub trait OverlayCapability: Send + Sync {
    /// Whether the environment gates overlays behind a grant at all.
    fn is_supported(&self) -> bool;

    /// Current grant. Must not block.
    fn is_granted(&self) -> bool;

    /// Hand control to the environment's consent flow. The result is not
    /// reported here; callers re-check [`is_granted`](Self::is_granted) later.
    fn launch_consent_flow(&self);
}

/// Observes and requests the overlay capability.
#[derive(Debug, Clone)]
pub struct PermissionGate<C> {
    capability: C,
}

impl<C: OverlayCapability> PermissionGate<C> {
    pub fn new(capability: C) -> Self {
        Self { capability }
    }

    pub fn capability(&self) -> &C {
        &self.capability
    }

    /// Current grant state. Environments without the capability check always
    /// report `true`.
    pub fn has_permission(&self) -> bool {
        if !self.capability.is_supported() {
            return true;
        }
        self.capability.is_granted()
    }

    /// Start the consent flow unless the grant is already present or not
    /// applicable.
    pub fn request_permission(&self) {
        if !self.capability.is_supported() {
            debug!("overlay capability not gated; skipping consent flow");
            return;
        }
        if self.capability.is_granted() {
            debug!("overlay permission already granted");
            return;
        }
        info!("launching overlay consent flow");
        self.capability.launch_consent_flow();
    }
}

/// Fixed-answer capability for headless hosts and tests.
///
/// The consent flow does nothing beyond counting launches; use
/// [`set_granted`](Self::set_granted) to play the environment's part.
#[derive(Debug, Default)]
pub struct StaticCapability {
    unsupported: bool,
    granted: AtomicBool,
    consent_launches: AtomicUsize,
}

impl StaticCapability {
    pub fn granted() -> Self {
        Self {
            granted: AtomicBool::new(true),
            ..Self::default()
        }
    }

    pub fn denied() -> Self {
        Self::default()
    }

    /// An environment that predates the overlay grant.
    pub fn unsupported() -> Self {
        Self {
            unsupported: true,
            ..Self::default()
        }
    }

    pub fn set_granted(&self, granted: bool) {
        self.granted.store(granted, Ordering::SeqCst);
    }

    pub fn consent_launches(&self) -> usize {
        self.consent_launches.load(Ordering::SeqCst)
    }
}

impl OverlayCapability for StaticCapability {
    fn is_supported(&self) -> bool {
        !self.unsupported
    }

    fn is_granted(&self) -> bool {
        self.granted.load(Ordering::SeqCst)
    }

    fn launch_consent_flow(&self) {
        self.consent_launches.fetch_add(1, Ordering::SeqCst);
    }
}

impl<T: OverlayCapability + ?Sized> OverlayCapability for std::sync::Arc<T> {
    fn is_supported(&self) -> bool {
        (**self).is_supported()
    }

    fn is_granted(&self) -> bool {
        (**self).is_granted()
    }

    fn launch_consent_flow(&self) {
        (**self).launch_consent_flow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn granted_environment_reports_true_and_skips_consent() {
        let gate = PermissionGate::new(StaticCapability::granted());
        assert!(gate.has_permission());
        gate.request_permission();
        gate.request_permission();
        assert_eq!(gate.capability().consent_launches(), 0);
    }

    #[test]
    fn denied_environment_launches_consent_each_request() {
        let gate = PermissionGate::new(StaticCapability::denied());
        assert!(!gate.has_permission());
        gate.request_permission();
        assert_eq!(gate.capability().consent_launches(), 1);
        // The request itself never flips the grant.
        assert!(!gate.has_permission());
    }

    #[test]
    fn unsupported_environment_is_always_permitted() {
        let gate = PermissionGate::new(StaticCapability::unsupported());
        assert!(gate.has_permission());
        gate.request_permission();
        assert_eq!(gate.capability().consent_launches(), 0);
    }

    #[test]
    fn grant_observed_after_environment_changes() {
        let cap = Arc::new(StaticCapability::denied());
        let gate = PermissionGate::new(cap.clone());
        gate.request_permission();
        cap.set_granted(true);
        assert!(gate.has_permission());
        gate.request_permission();
        assert_eq!(cap.consent_launches(), 1);
    }
}
