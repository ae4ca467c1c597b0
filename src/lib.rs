pub mod capture;
pub mod config;
pub mod error;
pub mod http;
pub mod session;
pub mod transport;

pub use capture::{AudioChunk, CaptureBackend, CaptureConfig, MicrophoneBackend};
pub use config::Config;
pub use error::{CaptureError, SessionError, TransportError};
pub use http::{create_router, AppState};
pub use session::{CombinedArtifact, RecordingSession, SessionConfig, SessionStats};
pub use transport::{AudioChunkMessage, ChunkTransport, NatsTransport, RecordingCompleteMessage};
