pub mod backend;
pub mod microphone;

pub use backend::{AudioChunk, CaptureBackend, CaptureConfig};
pub use microphone::MicrophoneBackend;
