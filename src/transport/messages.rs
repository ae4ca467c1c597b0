use serde::{Deserialize, Serialize};

/// One chunk of encoded audio, published while recording
#[derive(Debug, Serialize, Deserialize)]
pub struct AudioChunkMessage {
    pub session_id: String,
    pub sequence: u32,
    pub data: String,  // Base64-encoded chunk bytes
    pub byte_len: usize,
    pub timestamp: String,  // RFC3339 timestamp
}

/// The full-session artifact, published once when recording stops
#[derive(Debug, Serialize, Deserialize)]
pub struct RecordingCompleteMessage {
    pub session_id: String,
    pub data: String,  // Base64-encoded artifact bytes
    pub byte_len: usize,
    pub chunk_count: usize,
    pub timestamp: String,  // RFC3339 timestamp
}
