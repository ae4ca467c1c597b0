use crate::capture::CaptureConfig;
use crate::session::RecordingSession;
use crate::transport::NatsTransport;
use std::sync::Arc;

/// Shared application state for HTTP handlers.
///
/// Exactly one recording session and one transport connection exist for the
/// whole process.
#[derive(Clone)]
pub struct AppState {
    /// The single recording session
    pub session: Arc<RecordingSession>,

    /// The single transport connection
    pub transport: Arc<NatsTransport>,

    /// Capture settings for backends created on start
    pub capture: CaptureConfig,
}

impl AppState {
    pub fn new(
        session: Arc<RecordingSession>,
        transport: Arc<NatsTransport>,
        capture: CaptureConfig,
    ) -> Self {
        Self {
            session,
            transport,
            capture,
        }
    }
}
