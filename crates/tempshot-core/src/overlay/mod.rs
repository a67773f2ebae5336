mod presenter;
mod service;
mod session;
mod surface;

pub use presenter::{OverlayPresenter, SessionSnapshot};
pub use service::{OverlayService, ServiceHandle};
pub use session::{OverlaySession, SessionId, SessionState};
pub use surface::{InputSink, MemorySurface, Prompt, Surface, SurfaceInput};
