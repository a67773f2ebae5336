//! # tempshot Core Library
//!
//! This library decides how long a freshly captured screenshot should live.
//! A transient prompt surface is drawn above everything else, the user picks
//! a retention duration (or ignores it), and the choice is relayed back to
//! the owning application over an asynchronous, topic-filtered bridge.
//!
//! ## Architecture
//!
//! - **Overlay Presenter**: A single-slot session state machine that owns the
//!   rendered surface and the auto-dismiss deadline
//! - **Overlay Service**: The presenter's hosting task; runs commands, surface
//!   input and the dismissal timer on one sequential event queue
//! - **Host Bridge**: Lossy, at-most-once publish/subscribe channels keyed by
//!   exact topic
//! - **Permission Gate**: Observes and requests the overlay capability grant
//!
//! ## Key Components
//!
//! - [`OverlayPresenter`]: Core session state machine
//! - [`OverlayService`]: Async host for the presenter
//! - [`OverlayHost`]: Application-side facade and listener registration
//! - [`PermissionGate`]: Capability check and consent request
//! - [`Config`]: Application configuration management

pub mod bridge;
pub mod catalog;
pub mod error;
pub mod events;
pub mod host;
pub mod overlay;
pub mod permission;
pub mod storage;

pub use bridge::{Channel, Delivery, HostBridge, Subscription, Topic};
pub use catalog::{DurationOption, CATALOG, KEEP_FOREVER};
pub use error::{ConfigError, CoreError, OverlayError, SurfaceError};
pub use events::{OverlayCommand, Outcome};
pub use host::{ExpiryListener, ListenerHandle, OverlayHost};
pub use overlay::{
    InputSink, MemorySurface, OverlayPresenter, OverlayService, OverlaySession, Prompt,
    ServiceHandle, SessionId, SessionSnapshot, SessionState, Surface, SurfaceInput,
};
pub use permission::{OverlayCapability, PermissionGate, StaticCapability};
pub use storage::{BridgeConfig, Config, OverlayConfig};
