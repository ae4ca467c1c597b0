//! Domain error types

use thiserror::Error;

/// Errors from the audio capture device
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no audio input device available")]
    NoDevice,

    #[error("could not access audio input device: {0}")]
    DeviceAccess(String),
}

/// Errors from the streaming transport
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to connect to {url}: {reason}")]
    Connect { url: String, reason: String },

    #[error("failed to publish to {subject}: {reason}")]
    Publish { subject: String, reason: String },
}

/// Errors from the recording session state machine
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("a recording is already in progress")]
    AlreadyRecording,

    #[error("no recording is in progress")]
    NotRecording,

    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error("failed to finalize recording: {0}")]
    Finalize(String),
}
