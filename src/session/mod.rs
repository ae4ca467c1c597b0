//! Recording session management
//!
//! This module provides the `RecordingSession` abstraction that manages:
//! - The idle/recording state machine
//! - Chunk retention (append-only, capture order, empty chunks discarded)
//! - Opportunistic chunk forwarding while the transport is connected
//! - Finalization: combined artifact, one complete publish, local WAV file

mod artifact;
mod config;
mod session;
mod stats;

pub use artifact::CombinedArtifact;
pub use config::SessionConfig;
pub use session::RecordingSession;
pub use stats::SessionStats;
