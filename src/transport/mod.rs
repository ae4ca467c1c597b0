//! Streaming transport to the remote endpoint
//!
//! One long-lived NATS connection carries two kinds of outbound messages:
//! per-chunk `audio.chunk.<session>` publishes while a recording is active,
//! and a single `audio.complete.<session>` publish when it stops.

pub mod client;
pub mod messages;

pub use client::{ChunkTransport, NatsTransport};
pub use messages::{AudioChunkMessage, RecordingCompleteMessage};
