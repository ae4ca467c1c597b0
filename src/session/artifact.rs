use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::path::Path;
use tracing::warn;

/// The full-session audio object: all retained chunks concatenated in
/// capture order. Built only at finalization, not retained afterwards.
#[derive(Debug, Clone)]
pub struct CombinedArtifact {
    data: Vec<u8>,
}

impl CombinedArtifact {
    /// Order-preserving concatenation of the session's chunk sequence
    pub fn from_chunks(chunks: &[Vec<u8>]) -> Self {
        let total: usize = chunks.iter().map(|c| c.len()).sum();
        let mut data = Vec::with_capacity(total);
        for chunk in chunks {
            data.extend_from_slice(chunk);
        }
        Self { data }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Total byte length; equals the sum of retained chunk sizes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Filename for the local copy, unique within a session via the
    /// finalization timestamp: `recording-<epoch-milliseconds>.wav`
    pub fn file_name(finished_at: DateTime<Utc>) -> String {
        format!("recording-{}.wav", finished_at.timestamp_millis())
    }

    /// Write the artifact as a 16-bit PCM WAV file
    pub fn save_wav(&self, path: impl AsRef<Path>, sample_rate: u32, channels: u16) -> Result<()> {
        let path = path.as_ref();

        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut writer = hound::WavWriter::create(path, spec)
            .with_context(|| format!("Failed to create WAV file: {:?}", path))?;

        // Samples are two bytes each; a trailing odd byte cannot form one
        if self.data.len() % 2 != 0 {
            warn!(
                "Artifact has odd byte length {}; trailing byte not written to {:?}",
                self.data.len(),
                path
            );
        }

        for pair in self.data.chunks_exact(2) {
            let sample = i16::from_le_bytes([pair[0], pair[1]]);
            writer
                .write_sample(sample)
                .context("Failed to write sample to WAV")?;
        }

        writer.finalize().context("Failed to finalize WAV file")?;

        Ok(())
    }
}
