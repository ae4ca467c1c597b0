// Integration tests for the recording session
//
// These tests drive the session with a scripted capture backend and an
// in-memory transport, verifying chunk retention, forwarding, and
// finalization without a microphone or a broker.

use anyhow::Result;
use async_trait::async_trait;
use audio_relay::capture::{AudioChunk, CaptureBackend};
use audio_relay::error::{CaptureError, SessionError, TransportError};
use audio_relay::session::{RecordingSession, SessionConfig};
use audio_relay::transport::ChunkTransport;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::mpsc;

/// Capture backend that emits a scripted chunk sequence, then closes the
/// channel. Counts device releases via `stop()`.
struct ScriptedBackend {
    script: Vec<Vec<u8>>,
    start_delay: Duration,
    capturing: bool,
    releases: Arc<AtomicUsize>,
}

impl ScriptedBackend {
    fn new(script: Vec<Vec<u8>>, releases: Arc<AtomicUsize>) -> Self {
        Self {
            script,
            start_delay: Duration::ZERO,
            capturing: false,
            releases,
        }
    }

    /// Simulate a device-access request that takes a while to resolve
    fn with_start_delay(mut self, delay: Duration) -> Self {
        self.start_delay = delay;
        self
    }
}

#[async_trait]
impl CaptureBackend for ScriptedBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioChunk>, CaptureError> {
        if !self.start_delay.is_zero() {
            tokio::time::sleep(self.start_delay).await;
        }

        let (tx, rx) = mpsc::channel(100);
        let script = self.script.clone();

        tokio::spawn(async move {
            for (i, data) in script.into_iter().enumerate() {
                let chunk = AudioChunk {
                    data,
                    timestamp_ms: i as u64 * 100,
                };
                if tx.send(chunk).await.is_err() {
                    break;
                }
            }
        });

        self.capturing = true;
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<(), CaptureError> {
        if self.capturing {
            self.capturing = false;
            self.releases.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Backend whose device access is always denied
struct DeniedBackend;

#[async_trait]
impl CaptureBackend for DeniedBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioChunk>, CaptureError> {
        Err(CaptureError::DeviceAccess("permission denied".to_string()))
    }

    async fn stop(&mut self) -> Result<(), CaptureError> {
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        false
    }

    fn name(&self) -> &str {
        "denied"
    }
}

/// In-memory transport that records every send and has a settable
/// connection flag.
struct RecordingTransport {
    connected: AtomicBool,
    chunk_sends: Mutex<Vec<(u32, usize)>>,
    complete_sends: Mutex<Vec<(usize, usize)>>,
}

impl RecordingTransport {
    fn new(connected: bool) -> Arc<Self> {
        Arc::new(Self {
            connected: AtomicBool::new(connected),
            chunk_sends: Mutex::new(Vec::new()),
            complete_sends: Mutex::new(Vec::new()),
        })
    }

    fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    fn chunk_sends(&self) -> Vec<(u32, usize)> {
        self.chunk_sends.lock().unwrap().clone()
    }

    fn complete_sends(&self) -> Vec<(usize, usize)> {
        self.complete_sends.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChunkTransport for RecordingTransport {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn send_chunk(
        &self,
        _session_id: &str,
        sequence: u32,
        data: &[u8],
    ) -> Result<(), TransportError> {
        self.chunk_sends.lock().unwrap().push((sequence, data.len()));
        Ok(())
    }

    async fn send_complete(
        &self,
        _session_id: &str,
        data: &[u8],
        chunk_count: usize,
    ) -> Result<(), TransportError> {
        self.complete_sends
            .lock()
            .unwrap()
            .push((data.len(), chunk_count));
        Ok(())
    }
}

fn test_config(output_dir: PathBuf) -> SessionConfig {
    SessionConfig {
        session_id: "test-session".to_string(),
        sample_rate: 16000,
        channels: 1,
        output_dir,
    }
}

fn wav_files(dir: &std::path::Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.extension().map(|e| e == "wav").unwrap_or(false))
                .collect()
        })
        .unwrap_or_default();
    files.sort();
    files
}

#[tokio::test]
async fn test_connected_scenario_retains_forwards_and_saves() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let transport = RecordingTransport::new(true);
    let releases = Arc::new(AtomicUsize::new(0));

    let session = RecordingSession::new(
        test_config(temp_dir.path().to_path_buf()),
        transport.clone() as Arc<dyn ChunkTransport>,
    );

    // Sizes {0, 50, 100}: the empty chunk must be discarded
    let backend = Box::new(ScriptedBackend::new(
        vec![vec![], vec![1u8; 50], vec![2u8; 100]],
        releases.clone(),
    ));

    session.start(backend).await?;
    let stats = session.stop().await?;

    // Retained sequence is exactly the non-empty sub-sequence, in order
    assert_eq!(stats.chunk_count, 2);
    assert_eq!(stats.byte_count, 150, "artifact length equals sum of retained sizes");

    // Two forward calls, in capture order, then one complete publish
    assert_eq!(transport.chunk_sends(), vec![(0, 50), (1, 100)]);
    assert_eq!(transport.complete_sends(), vec![(150, 2)]);

    // One local file, named recording-<epoch-ms>.wav
    let files = wav_files(temp_dir.path());
    assert_eq!(files.len(), 1);
    let name = files[0].file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("recording-"), "unexpected name: {}", name);
    assert!(name.ends_with(".wav"));
    let millis: i64 = name
        .trim_start_matches("recording-")
        .trim_end_matches(".wav")
        .parse()?;
    assert!(millis > 0);
    assert_eq!(stats.artifact_path, Some(files[0].clone()));

    // Device released exactly once
    assert_eq!(releases.load(Ordering::SeqCst), 1);

    Ok(())
}

#[tokio::test]
async fn test_saved_wav_contains_all_retained_samples() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let transport = RecordingTransport::new(true);
    let releases = Arc::new(AtomicUsize::new(0));

    let session = RecordingSession::new(
        test_config(temp_dir.path().to_path_buf()),
        transport.clone() as Arc<dyn ChunkTransport>,
    );

    // Two chunks of i16 samples as little-endian bytes
    let chunk_a: Vec<u8> = [100i16, -200, 300].iter().flat_map(|s| s.to_le_bytes()).collect();
    let chunk_b: Vec<u8> = [-400i16, 500].iter().flat_map(|s| s.to_le_bytes()).collect();

    let backend = Box::new(ScriptedBackend::new(vec![chunk_a, chunk_b], releases));
    session.start(backend).await?;
    let stats = session.stop().await?;

    let path = stats.artifact_path.expect("artifact path");
    let reader = hound::WavReader::open(&path)?;
    let spec = reader.spec();
    assert_eq!(spec.sample_rate, 16000);
    assert_eq!(spec.channels, 1);
    assert_eq!(spec.bits_per_sample, 16);

    let samples: Vec<i16> = reader.into_samples::<i16>().collect::<Result<_, _>>()?;
    assert_eq!(samples, vec![100, -200, 300, -400, 500]);

    Ok(())
}

#[tokio::test]
async fn test_disconnected_chunk_is_retained_but_never_forwarded() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let transport = RecordingTransport::new(false);
    let releases = Arc::new(AtomicUsize::new(0));

    let session = RecordingSession::new(
        test_config(temp_dir.path().to_path_buf()),
        transport.clone() as Arc<dyn ChunkTransport>,
    );

    let backend = Box::new(ScriptedBackend::new(vec![vec![7u8; 80]], releases));
    session.start(backend).await?;

    // Wait until the chunk has been retained (the connection state was
    // sampled before retention became visible)
    for _ in 0..100 {
        if session.status().await.chunk_count == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(session.status().await.chunk_count, 1);

    // Reconnect: the already-produced chunk must not be backfilled
    transport.set_connected(true);
    let stats = session.stop().await?;

    assert_eq!(stats.chunk_count, 1);
    assert_eq!(stats.byte_count, 80);
    assert!(transport.chunk_sends().is_empty(), "no chunk forwards expected");
    // Connected again by stop time, so the artifact is published
    assert_eq!(transport.complete_sends(), vec![(80, 1)]);

    Ok(())
}

#[tokio::test]
async fn test_disconnected_at_stop_skips_complete_publish() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let transport = RecordingTransport::new(false);
    let releases = Arc::new(AtomicUsize::new(0));

    let session = RecordingSession::new(
        test_config(temp_dir.path().to_path_buf()),
        transport.clone() as Arc<dyn ChunkTransport>,
    );

    let backend = Box::new(ScriptedBackend::new(vec![vec![1u8; 10]], releases));
    session.start(backend).await?;
    let stats = session.stop().await?;

    assert!(transport.complete_sends().is_empty());
    // The local copy is still saved
    assert!(stats.artifact_path.unwrap().exists());

    Ok(())
}

#[tokio::test]
async fn test_stop_when_idle_has_no_observable_effect() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let transport = RecordingTransport::new(true);

    let session = RecordingSession::new(
        test_config(temp_dir.path().to_path_buf()),
        transport.clone() as Arc<dyn ChunkTransport>,
    );

    let err = session.stop().await.expect_err("stop while idle must fail");
    assert!(matches!(err, SessionError::NotRecording));

    // No artifact built, nothing published, no file written
    assert!(transport.complete_sends().is_empty());
    assert!(wav_files(temp_dir.path()).is_empty());

    Ok(())
}

#[tokio::test]
async fn test_start_while_recording_is_rejected() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let transport = RecordingTransport::new(true);
    let releases = Arc::new(AtomicUsize::new(0));

    let session = RecordingSession::new(
        test_config(temp_dir.path().to_path_buf()),
        transport.clone() as Arc<dyn ChunkTransport>,
    );

    let backend = Box::new(ScriptedBackend::new(vec![vec![1u8; 20]], releases.clone()));
    session.start(backend).await?;

    let second = Box::new(ScriptedBackend::new(vec![vec![2u8; 30]], releases.clone()));
    let err = session
        .start(second)
        .await
        .expect_err("second start must fail");
    assert!(matches!(err, SessionError::AlreadyRecording));

    // The first session is unaffected and still stops cleanly
    let stats = session.stop().await?;
    assert_eq!(stats.chunk_count, 1);
    assert_eq!(stats.byte_count, 20);
    assert_eq!(releases.load(Ordering::SeqCst), 1);

    Ok(())
}

#[tokio::test]
async fn test_device_access_denied_leaves_state_idle() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let transport = RecordingTransport::new(true);

    let session = RecordingSession::new(
        test_config(temp_dir.path().to_path_buf()),
        transport.clone() as Arc<dyn ChunkTransport>,
    );

    let err = session
        .start(Box::new(DeniedBackend))
        .await
        .expect_err("denied device must fail start");
    assert!(matches!(err, SessionError::Capture(CaptureError::DeviceAccess(_))));

    // No session was created: state idle, nothing retained, nothing sent
    assert_eq!(session.state(), "idle");
    let status = session.status().await;
    assert!(!status.is_recording);
    assert_eq!(status.chunk_count, 0);
    assert!(transport.chunk_sends().is_empty());
    assert!(wav_files(temp_dir.path()).is_empty());

    Ok(())
}

#[tokio::test]
async fn test_stop_during_pending_device_access_stays_consistent() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let transport = RecordingTransport::new(true);
    let releases = Arc::new(AtomicUsize::new(0));

    let session = Arc::new(RecordingSession::new(
        test_config(temp_dir.path().to_path_buf()),
        transport.clone() as Arc<dyn ChunkTransport>,
    ));

    // Device access resolves after 200ms; the stop lands mid-request
    let backend = Box::new(
        ScriptedBackend::new(vec![vec![1u8; 50]], releases.clone())
            .with_start_delay(Duration::from_millis(200)),
    );

    let starter = {
        let session = Arc::clone(&session);
        tokio::spawn(async move { session.start(backend).await })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    let stop_result = session.stop().await;

    // The start completes normally; the stop is ordered after it and
    // finalizes the fully-initialized session instead of racing it
    starter.await.expect("start task panicked")?;
    let stats = stop_result?;

    assert_eq!(stats.chunk_count, 1);
    assert_eq!(stats.byte_count, 50);
    assert_eq!(releases.load(Ordering::SeqCst), 1, "device released exactly once");

    // The session ends consistent: idle, nothing retained, one artifact
    assert_eq!(session.state(), "idle");
    assert_eq!(session.status().await.chunk_count, 0);
    assert_eq!(wav_files(temp_dir.path()).len(), 1);

    // And a later stop is a plain idle rejection, not a wedged session
    let err = session.stop().await.expect_err("second stop must fail");
    assert!(matches!(err, SessionError::NotRecording));

    Ok(())
}

#[tokio::test]
async fn test_restart_resets_the_chunk_sequence() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let transport = RecordingTransport::new(true);
    let releases = Arc::new(AtomicUsize::new(0));

    let session = RecordingSession::new(
        test_config(temp_dir.path().to_path_buf()),
        transport.clone() as Arc<dyn ChunkTransport>,
    );

    let first = Box::new(ScriptedBackend::new(vec![vec![1u8; 40]], releases.clone()));
    session.start(first).await?;
    let stats = session.stop().await?;
    assert_eq!(stats.chunk_count, 1);

    // Artifact names come from the finalization timestamp in milliseconds;
    // keep the two stops in distinct milliseconds
    tokio::time::sleep(Duration::from_millis(5)).await;

    let second = Box::new(ScriptedBackend::new(vec![vec![2u8; 60]], releases.clone()));
    session.start(second).await?;
    let stats = session.stop().await?;

    // Only the second session's chunk; sequence numbers restart at 0
    assert_eq!(stats.chunk_count, 1);
    assert_eq!(stats.byte_count, 60);
    let sends = transport.chunk_sends();
    assert_eq!(sends, vec![(0, 40), (0, 60)]);

    // One artifact per session
    assert_eq!(wav_files(temp_dir.path()).len(), 2);
    assert_eq!(releases.load(Ordering::SeqCst), 2);

    Ok(())
}
