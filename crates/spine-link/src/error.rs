use std::time::Duration;

/// Errors that can occur in link operations.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] spine_transport::TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] spine_frame::FrameError),

    /// No data frame arrived before the handshake deadline or shutdown.
    #[error("no data frame from body after {0:?}")]
    Timeout(Duration),

    /// The body is running its bootloader, not the application.
    #[error("body is running its bootloader only")]
    BootloaderOnly,

    /// The line stayed silent for too many consecutive polls.
    #[error("spine silent for {consecutive} consecutive polls")]
    PollTimeout { consecutive: u8 },

    /// Invalid link configuration.
    #[error("invalid link configuration: {0}")]
    Config(String),

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LinkError>;
