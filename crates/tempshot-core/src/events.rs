use serde::{Deserialize, Serialize};

/// Commands the application sends to the overlay service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OverlayCommand {
    /// Open the expiry prompt for an artifact, replacing any prompt on screen.
    Show { artifact_id: String },
}

/// The user's retention choice for one artifact.
///
/// Published once per session that the user resolves. A session that times
/// out or is dismissed publishes nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub artifact_id: String,
    /// A catalog value; `-1` means keep forever.
    pub minutes: i64,
}
