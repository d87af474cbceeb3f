//! Error types for VSL Core

use thiserror::Error;

/// Result type alias for player operations
pub type Result<T> = std::result::Result<T, Error>;

/// Player error types
#[derive(Error, Debug)]
pub enum Error {
    // Platform refusals
    #[error("Playback request refused by platform: {0}")]
    PlaybackRefused(String),

    #[error("Orientation lock refused: {0}")]
    OrientationLockRefused(String),

    // Input errors
    #[error("Unsupported playback rate: {rate}")]
    InvalidPlaybackRate { rate: f64 },

    #[error("Unknown key: {0:?}")]
    UnknownKey(String),

    // Analytics errors
    #[error("Analytics delivery failed: {0}")]
    AnalyticsDelivery(String),

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create an analytics delivery error
    pub fn delivery(msg: impl Into<String>) -> Self {
        Error::AnalyticsDelivery(msg.into())
    }

    /// Returns true if the player keeps working after this error.
    ///
    /// Platform refusals and sink failures leave the surface interactive;
    /// only configuration problems stop a player from being built.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::PlaybackRefused(_)
                | Error::OrientationLockRefused(_)
                | Error::InvalidPlaybackRate { .. }
                | Error::UnknownKey(_)
                | Error::AnalyticsDelivery(_)
        )
    }

    /// Returns the error code for analytics
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::PlaybackRefused(_) => "PLAYBACK_REFUSED",
            Error::OrientationLockRefused(_) => "ORIENTATION_REFUSED",
            Error::InvalidPlaybackRate { .. } => "INVALID_RATE",
            Error::UnknownKey(_) => "UNKNOWN_KEY",
            Error::AnalyticsDelivery(_) => "ANALYTICS_DELIVERY",
            Error::InvalidConfig(_) => "INVALID_CONFIG",
            Error::Serialization(_) => "SERIALIZATION",
            Error::Io(_) => "IO",
        }
    }
}
