use super::artifact::CombinedArtifact;
use super::config::SessionConfig;
use super::stats::SessionStats;
use crate::capture::CaptureBackend;
use crate::error::SessionError;
use crate::transport::ChunkTransport;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// A recording session: the idle/recording state machine, the append-only
/// chunk sequence, opportunistic forwarding, and finalization.
///
/// Exactly one session exists per process; the transport is injected so the
/// session can be exercised without a live broker.
pub struct RecordingSession {
    config: SessionConfig,

    /// Transport the chunks are forwarded over
    transport: Arc<dyn ChunkTransport>,

    /// Serializes the start/stop bodies. A stop issued while a start is
    /// still waiting on device access queues behind it instead of racing
    /// the half-initialized session.
    lifecycle: Mutex<()>,

    /// Whether recording is currently active
    is_recording: Arc<AtomicBool>,

    /// Retained chunks, in capture order, append-only while recording
    chunks: Arc<Mutex<Vec<Vec<u8>>>>,

    /// Total bytes retained in the current session
    byte_count: Arc<AtomicUsize>,

    /// Forwarding sequence number, reset on start
    sequence: Arc<AtomicU32>,

    /// When the current (or last) recording started
    started_at: Arc<Mutex<Option<DateTime<Utc>>>>,

    /// Where the last combined artifact was saved
    last_artifact: Arc<Mutex<Option<PathBuf>>>,

    /// Capture backend owning the input device while recording
    backend: Mutex<Option<Box<dyn CaptureBackend>>>,

    /// Handle for the chunk consumer task
    consumer_handle: Mutex<Option<JoinHandle<()>>>,
}

impl RecordingSession {
    pub fn new(config: SessionConfig, transport: Arc<dyn ChunkTransport>) -> Self {
        Self {
            config,
            transport,
            lifecycle: Mutex::new(()),
            is_recording: Arc::new(AtomicBool::new(false)),
            chunks: Arc::new(Mutex::new(Vec::new())),
            byte_count: Arc::new(AtomicUsize::new(0)),
            sequence: Arc::new(AtomicU32::new(0)),
            started_at: Arc::new(Mutex::new(None)),
            last_artifact: Arc::new(Mutex::new(None)),
            backend: Mutex::new(None),
            consumer_handle: Mutex::new(None),
        }
    }

    pub fn id(&self) -> &str {
        &self.config.session_id
    }

    /// Recorder state as status text for the UI surface
    pub fn state(&self) -> &'static str {
        if self.is_recording.load(Ordering::SeqCst) {
            "recording"
        } else {
            "idle"
        }
    }

    /// Start recording with the given capture backend.
    ///
    /// Errors with `AlreadyRecording` if a session is active, and with the
    /// backend's `DeviceAccess` failure if the input device is refused; in
    /// that case the state stays idle and no chunk sequence is created.
    pub async fn start(&self, mut backend: Box<dyn CaptureBackend>) -> Result<(), SessionError> {
        let _lifecycle = self.lifecycle.lock().await;

        if self.is_recording.load(Ordering::SeqCst) {
            warn!("Start requested while already recording");
            return Err(SessionError::AlreadyRecording);
        }

        info!(
            "Starting recording session: {} ({})",
            self.config.session_id,
            backend.name()
        );

        let mut chunk_rx = match backend.start().await {
            Ok(rx) => rx,
            Err(e) => {
                warn!("Could not access audio input: {}", e);
                return Err(SessionError::Capture(e));
            }
        };

        // Reset the chunk sequence for the new session
        self.chunks.lock().await.clear();
        self.byte_count.store(0, Ordering::SeqCst);
        self.sequence.store(0, Ordering::SeqCst);
        *self.started_at.lock().await = Some(Utc::now());
        *self.last_artifact.lock().await = None;
        *self.backend.lock().await = Some(backend);

        // The state becomes observable only once the device is up and the
        // session is fully initialized
        self.is_recording.store(true, Ordering::SeqCst);

        let transport = Arc::clone(&self.transport);
        let chunks = Arc::clone(&self.chunks);
        let byte_count = Arc::clone(&self.byte_count);
        let sequence = Arc::clone(&self.sequence);
        let session_id = self.config.session_id.clone();

        // One consumer task preserves capture order: each chunk is handled
        // to completion before the next is received.
        let consumer = tokio::spawn(async move {
            while let Some(chunk) = chunk_rx.recv().await {
                if chunk.is_empty() {
                    debug!("Discarding empty chunk");
                    continue;
                }

                // Connection state is sampled when the chunk is produced; a
                // chunk seen while disconnected is retained but never sent
                // later, even after a reconnect.
                let connected = transport.is_connected();
                let seq = sequence.fetch_add(1, Ordering::SeqCst);

                if connected {
                    if let Err(e) = transport.send_chunk(&session_id, seq, &chunk.data).await {
                        // Capture continues; the chunk stays retained locally
                        error!("Failed to forward chunk {}: {}", seq, e);
                    }
                } else {
                    debug!("Transport disconnected; chunk {} retained locally", seq);
                }

                byte_count.fetch_add(chunk.data.len(), Ordering::SeqCst);
                chunks.lock().await.push(chunk.data);
            }

            debug!("Chunk channel closed");
        });

        *self.consumer_handle.lock().await = Some(consumer);

        info!("Recording session started: {}", self.config.session_id);

        Ok(())
    }

    /// Stop recording and finalize.
    ///
    /// Errors with `NotRecording` when idle, with no other observable
    /// effect. Otherwise halts capture (releasing the input device), builds
    /// the combined artifact, publishes it once if connected, and saves the
    /// local WAV copy.
    pub async fn stop(&self) -> Result<SessionStats, SessionError> {
        let _lifecycle = self.lifecycle.lock().await;

        if !self.is_recording.swap(false, Ordering::SeqCst) {
            warn!("Stop requested while idle");
            return Err(SessionError::NotRecording);
        }

        info!("Stopping recording session: {}", self.config.session_id);

        // Halt production and release the input device. This closes the
        // chunk channel once the final partial interval has been emitted,
        // and happens regardless of any transport outcome below.
        if let Some(mut backend) = self.backend.lock().await.take() {
            if let Err(e) = backend.stop().await {
                error!("Failed to stop capture backend: {}", e);
            }
        }

        // Wait for the consumer to drain the remaining chunks
        if let Some(handle) = self.consumer_handle.lock().await.take() {
            if let Err(e) = handle.await {
                error!("Chunk consumer task panicked: {}", e);
            }
        }

        // The artifact is built once and not retained after the session
        let retained = std::mem::take(&mut *self.chunks.lock().await);
        let chunk_count = retained.len();
        let artifact = CombinedArtifact::from_chunks(&retained);

        if self.transport.is_connected() {
            if let Err(e) = self
                .transport
                .send_complete(&self.config.session_id, artifact.data(), chunk_count)
                .await
            {
                error!("Failed to publish complete recording: {}", e);
            }
        } else {
            warn!("Transport disconnected; complete recording not published");
        }

        let finished_at = Utc::now();
        std::fs::create_dir_all(&self.config.output_dir)
            .map_err(|e| SessionError::Finalize(e.to_string()))?;
        let path = self
            .config
            .output_dir
            .join(CombinedArtifact::file_name(finished_at));
        artifact
            .save_wav(&path, self.config.sample_rate, self.config.channels)
            .map_err(|e| SessionError::Finalize(e.to_string()))?;

        *self.last_artifact.lock().await = Some(path.clone());

        let started_at = *self.started_at.lock().await;
        let duration_secs = started_at
            .map(|s| finished_at.signed_duration_since(s).num_milliseconds() as f64 / 1000.0)
            .unwrap_or(0.0);

        info!(
            "Recording saved: {} ({} chunks, {} bytes)",
            path.display(),
            chunk_count,
            artifact.len()
        );

        Ok(SessionStats {
            session_id: self.config.session_id.clone(),
            is_recording: false,
            started_at,
            duration_secs,
            chunk_count,
            byte_count: artifact.len(),
            artifact_path: Some(path),
        })
    }

    /// Current session statistics
    pub async fn status(&self) -> SessionStats {
        let is_recording = self.is_recording.load(Ordering::SeqCst);
        let started_at = *self.started_at.lock().await;

        let duration_secs = if is_recording {
            started_at
                .map(|s| Utc::now().signed_duration_since(s).num_milliseconds() as f64 / 1000.0)
                .unwrap_or(0.0)
        } else {
            0.0
        };

        SessionStats {
            session_id: self.config.session_id.clone(),
            is_recording,
            started_at,
            duration_secs,
            chunk_count: self.chunks.lock().await.len(),
            byte_count: self.byte_count.load(Ordering::SeqCst),
            artifact_path: self.last_artifact.lock().await.clone(),
        }
    }
}
