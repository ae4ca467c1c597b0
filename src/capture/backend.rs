use tokio::sync::mpsc;

use crate::error::CaptureError;

/// An opaque block of encoded audio emitted for one capture interval.
///
/// A chunk may be empty when the device produced no samples in the interval;
/// empty chunks are discarded downstream, never retained or sent.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    /// Encoded audio bytes (i16 PCM, little-endian, interleaved)
    pub data: Vec<u8>,
    /// Milliseconds since capture started
    pub timestamp_ms: u64,
}

impl AudioChunk {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Configuration for a capture backend
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Target sample rate (device audio is converted if it differs)
    pub sample_rate: u32,
    /// Target channel count (1 = mono, 2 = stereo)
    pub channels: u16,
    /// Interval between emitted chunks in milliseconds
    pub chunk_interval_ms: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            channels: 1,
            chunk_interval_ms: 100,
        }
    }
}

/// Audio capture backend trait
///
/// Implementations own the input device for the duration of a capture and
/// must release it exactly once, in `stop()`.
#[async_trait::async_trait]
pub trait CaptureBackend: Send + Sync {
    /// Acquire the input device and start producing chunks.
    ///
    /// Returns a channel receiver that yields one chunk per interval, in
    /// capture order. Fails with `CaptureError::DeviceAccess` when the
    /// platform denies or cannot provide an input stream.
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioChunk>, CaptureError>;

    /// Stop capturing and release the input device. Idempotent.
    ///
    /// The chunk channel closes after the final partial interval is emitted.
    async fn stop(&mut self) -> Result<(), CaptureError>;

    /// Check if the backend is currently capturing
    fn is_capturing(&self) -> bool;

    /// Get backend name for logging
    fn name(&self) -> &str;
}
