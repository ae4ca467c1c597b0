//! Microphone capture backend using cpal
//!
//! The cpal stream is not `Send`, so it lives on a dedicated thread for the
//! lifetime of the capture; the thread drops the stream on stop, which
//! releases the input device. A tokio task drains the shared sample buffer
//! on a fixed interval and emits one chunk per tick.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SampleFormat;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use super::backend::{AudioChunk, CaptureBackend, CaptureConfig};
use crate::error::CaptureError;

/// Native format reported by the device once its stream is running
#[derive(Debug, Clone, Copy)]
struct DeviceFormat {
    sample_rate: u32,
    channels: u16,
}

pub struct MicrophoneBackend {
    config: CaptureConfig,
    capturing: bool,
    stop_flag: Arc<AtomicBool>,
    stream_thread: Option<std::thread::JoinHandle<()>>,
    drain_handle: Option<JoinHandle<()>>,
}

impl MicrophoneBackend {
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            capturing: false,
            stop_flag: Arc::new(AtomicBool::new(false)),
            stream_thread: None,
            drain_handle: None,
        }
    }

    /// Open the default input device and run its stream until the stop flag
    /// is set. Runs on a dedicated thread; reports readiness (or the access
    /// failure) through `ready_tx`.
    fn run_stream(
        buffer: Arc<Mutex<Vec<i16>>>,
        stop_flag: Arc<AtomicBool>,
        ready_tx: std::sync::mpsc::Sender<Result<DeviceFormat, CaptureError>>,
    ) {
        let host = cpal::default_host();
        let device = match host.default_input_device() {
            Some(d) => d,
            None => {
                let _ = ready_tx.send(Err(CaptureError::NoDevice));
                return;
            }
        };

        let supported = match device.default_input_config() {
            Ok(c) => c,
            Err(e) => {
                let _ = ready_tx.send(Err(CaptureError::DeviceAccess(e.to_string())));
                return;
            }
        };

        let sample_format = supported.sample_format();
        let stream_config: cpal::StreamConfig = supported.config();
        let format = DeviceFormat {
            sample_rate: stream_config.sample_rate.0,
            channels: stream_config.channels,
        };

        let err_fn = |e: cpal::StreamError| error!("Input stream error: {}", e);

        let stream = match sample_format {
            SampleFormat::I16 => device.build_input_stream(
                &stream_config,
                {
                    let buffer = Arc::clone(&buffer);
                    move |data: &[i16], _: &cpal::InputCallbackInfo| {
                        if let Ok(mut buf) = buffer.lock() {
                            buf.extend_from_slice(data);
                        }
                    }
                },
                err_fn,
                None,
            ),
            SampleFormat::F32 => device.build_input_stream(
                &stream_config,
                {
                    let buffer = Arc::clone(&buffer);
                    move |data: &[f32], _: &cpal::InputCallbackInfo| {
                        if let Ok(mut buf) = buffer.lock() {
                            buf.extend(data.iter().map(|&s| {
                                (s * i16::MAX as f32).clamp(i16::MIN as f32, i16::MAX as f32)
                                    as i16
                            }));
                        }
                    }
                },
                err_fn,
                None,
            ),
            other => {
                let _ = ready_tx.send(Err(CaptureError::DeviceAccess(format!(
                    "unsupported sample format: {:?}",
                    other
                ))));
                return;
            }
        };

        let stream = match stream {
            Ok(s) => s,
            Err(e) => {
                let _ = ready_tx.send(Err(CaptureError::DeviceAccess(e.to_string())));
                return;
            }
        };

        if let Err(e) = stream.play() {
            let _ = ready_tx.send(Err(CaptureError::DeviceAccess(e.to_string())));
            return;
        }

        let _ = ready_tx.send(Ok(format));

        while !stop_flag.load(Ordering::SeqCst) {
            std::thread::sleep(Duration::from_millis(20));
        }

        // Dropping the stream releases the input device
        drop(stream);
    }
}

impl Drop for MicrophoneBackend {
    fn drop(&mut self) {
        // The stream thread exits only on the stop flag; a backend dropped
        // without stop() must still let it terminate and release the device
        self.stop_flag.store(true, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl CaptureBackend for MicrophoneBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioChunk>, CaptureError> {
        if self.capturing {
            return Err(CaptureError::DeviceAccess("already capturing".to_string()));
        }

        self.stop_flag.store(false, Ordering::SeqCst);

        let buffer: Arc<Mutex<Vec<i16>>> = Arc::new(Mutex::new(Vec::new()));

        let (ready_tx, ready_rx) = std::sync::mpsc::channel();
        let thread_buffer = Arc::clone(&buffer);
        let thread_stop = Arc::clone(&self.stop_flag);

        let stream_thread = std::thread::spawn(move || {
            Self::run_stream(thread_buffer, thread_stop, ready_tx);
        });

        // The stream thread reports back as soon as the device is acquired
        // (or refused); recv only blocks for that handshake.
        let format = tokio::task::spawn_blocking(move || ready_rx.recv())
            .await
            .map_err(|e| CaptureError::DeviceAccess(e.to_string()))?
            .map_err(|_| CaptureError::DeviceAccess("capture thread exited".to_string()))??;

        info!(
            "Microphone capture started: device {}Hz {}ch, target {}Hz {}ch, {}ms chunks",
            format.sample_rate,
            format.channels,
            self.config.sample_rate,
            self.config.channels,
            self.config.chunk_interval_ms
        );

        let (tx, rx) = mpsc::channel(100);
        let drain_buffer = Arc::clone(&buffer);
        let drain_stop = Arc::clone(&self.stop_flag);
        let target_rate = self.config.sample_rate;
        let target_channels = self.config.channels;
        let interval_ms = self.config.chunk_interval_ms;

        let drain_handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_millis(interval_ms));
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let started = tokio::time::Instant::now();

            loop {
                interval.tick().await;
                let stopping = drain_stop.load(Ordering::SeqCst);

                let samples = match drain_buffer.lock() {
                    Ok(mut buf) => std::mem::take(&mut *buf),
                    Err(_) => {
                        warn!("Sample buffer poisoned; stopping drain");
                        break;
                    }
                };

                let (samples, channels) = if format.channels == 2 && target_channels == 1 {
                    (mix_to_mono(&samples), 1)
                } else {
                    (samples, format.channels)
                };
                // Decimation would break interleaving on multi-channel audio
                let samples = if channels == 1 {
                    decimate(&samples, format.sample_rate, target_rate)
                } else {
                    samples
                };

                let data: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
                let chunk = AudioChunk {
                    data,
                    timestamp_ms: started.elapsed().as_millis() as u64,
                };

                if tx.send(chunk).await.is_err() {
                    break;
                }

                if stopping {
                    break;
                }
            }
        });

        self.stream_thread = Some(stream_thread);
        self.drain_handle = Some(drain_handle);
        self.capturing = true;

        Ok(rx)
    }

    async fn stop(&mut self) -> Result<(), CaptureError> {
        if !self.capturing {
            return Ok(());
        }
        self.capturing = false;

        self.stop_flag.store(true, Ordering::SeqCst);

        // Join the stream thread first so no samples arrive after the final
        // drain; the join releases the device.
        if let Some(thread) = self.stream_thread.take() {
            let _ = tokio::task::spawn_blocking(move || thread.join()).await;
        }

        if let Some(drain) = self.drain_handle.take() {
            if let Err(e) = drain.await {
                error!("Chunk drain task panicked: {}", e);
            }
        }

        info!("Microphone capture stopped, input device released");

        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing
    }

    fn name(&self) -> &str {
        "cpal microphone"
    }
}

/// Mix interleaved stereo down to mono by summing channel pairs
pub fn mix_to_mono(samples: &[i16]) -> Vec<i16> {
    let mut mono = Vec::with_capacity(samples.len() / 2);

    for pair in samples.chunks_exact(2) {
        let sum = pair[0] as i32 + pair[1] as i32;
        mono.push(sum.clamp(i16::MIN as i32, i16::MAX as i32) as i16);
    }

    mono
}

/// Downsample by decimation: take every Nth sample. Returns the input
/// unchanged when the rates already match or the ratio is not reducible.
pub fn decimate(samples: &[i16], source_rate: u32, target_rate: u32) -> Vec<i16> {
    if source_rate == target_rate || target_rate == 0 {
        return samples.to_vec();
    }

    let ratio = source_rate / target_rate;
    if ratio <= 1 {
        return samples.to_vec();
    }

    samples.iter().step_by(ratio as usize).copied().collect()
}
