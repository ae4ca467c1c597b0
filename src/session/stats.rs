use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Status of a recording session, also the material for the UI status text
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    /// Session identifier
    pub session_id: String,

    /// Whether recording is currently active
    pub is_recording: bool,

    /// When the current (or last) recording started
    pub started_at: Option<DateTime<Utc>>,

    /// Duration of the current (or last) recording in seconds
    pub duration_secs: f64,

    /// Number of chunks retained so far
    pub chunk_count: usize,

    /// Total bytes retained so far
    pub byte_count: usize,

    /// Where the combined artifact was saved, once a recording finished
    pub artifact_path: Option<PathBuf>,
}
