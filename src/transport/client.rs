use async_nats::Client;
use base64::Engine;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info, warn};

use super::messages::{AudioChunkMessage, RecordingCompleteMessage};
use crate::error::TransportError;

/// What the recording session observes of the transport.
///
/// The connection flag is read at the moment each chunk is handled; a chunk
/// seen while disconnected is never sent later.
#[async_trait::async_trait]
pub trait ChunkTransport: Send + Sync {
    /// Current connection state
    fn is_connected(&self) -> bool;

    /// Publish one chunk for an active session
    async fn send_chunk(
        &self,
        session_id: &str,
        sequence: u32,
        data: &[u8],
    ) -> Result<(), TransportError>;

    /// Publish the combined artifact, once per session
    async fn send_complete(
        &self,
        session_id: &str,
        data: &[u8],
        chunk_count: usize,
    ) -> Result<(), TransportError>;
}

/// NATS-backed transport with a process-wide connection flag
pub struct NatsTransport {
    client: Client,
    connected: Arc<AtomicBool>,
}

impl NatsTransport {
    /// Connect to the configured endpoint.
    ///
    /// Connection events from the client flip the shared flag; reconnect
    /// policy is left entirely to the NATS client.
    pub async fn connect(url: &str) -> Result<Self, TransportError> {
        info!("Connecting to transport at {}", url);

        let connected = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&connected);

        let client = async_nats::ConnectOptions::new()
            .retry_on_initial_connect()
            .event_callback(move |event| {
                let flag = Arc::clone(&flag);
                async move {
                    match event {
                        async_nats::Event::Connected => {
                            flag.store(true, Ordering::SeqCst);
                            info!("Transport connected");
                        }
                        async_nats::Event::Disconnected => {
                            flag.store(false, Ordering::SeqCst);
                            warn!("Transport disconnected");
                        }
                        async_nats::Event::ClientError(err) => {
                            error!("Transport error: {:?}", err);
                        }
                        other => {
                            info!("Transport event: {:?}", other);
                        }
                    }
                }
            })
            .connect(url)
            .await
            .map_err(|e| TransportError::Connect {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self { client, connected })
    }

    /// Connection state as status text for the UI surface
    pub fn status(&self) -> &'static str {
        if self.is_connected() {
            "connected"
        } else {
            "disconnected"
        }
    }

    /// Flush outstanding publishes. Idempotent; the connection itself is
    /// cleaned up on drop.
    pub async fn close(&self) -> Result<(), TransportError> {
        info!("Closing transport connection");
        self.client.flush().await.map_err(|e| TransportError::Publish {
            subject: "flush".to_string(),
            reason: e.to_string(),
        })
    }

    async fn publish(&self, subject: String, payload: Vec<u8>) -> Result<(), TransportError> {
        self.client
            .publish(subject.clone(), payload.into())
            .await
            .map_err(|e| TransportError::Publish {
                subject,
                reason: e.to_string(),
            })
    }
}

#[async_trait::async_trait]
impl ChunkTransport for NatsTransport {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn send_chunk(
        &self,
        session_id: &str,
        sequence: u32,
        data: &[u8],
    ) -> Result<(), TransportError> {
        let subject = format!("audio.chunk.{}", session_id);

        let message = AudioChunkMessage {
            session_id: session_id.to_string(),
            sequence,
            data: base64::engine::general_purpose::STANDARD.encode(data),
            byte_len: data.len(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        let payload = serde_json::to_vec(&message).map_err(|e| TransportError::Publish {
            subject: subject.clone(),
            reason: e.to_string(),
        })?;

        self.publish(subject.clone(), payload).await?;

        info!(
            "Published chunk to {} (sequence={}, bytes={})",
            subject,
            sequence,
            data.len()
        );

        Ok(())
    }

    async fn send_complete(
        &self,
        session_id: &str,
        data: &[u8],
        chunk_count: usize,
    ) -> Result<(), TransportError> {
        let subject = format!("audio.complete.{}", session_id);

        let message = RecordingCompleteMessage {
            session_id: session_id.to_string(),
            data: base64::engine::general_purpose::STANDARD.encode(data),
            byte_len: data.len(),
            chunk_count,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        let payload = serde_json::to_vec(&message).map_err(|e| TransportError::Publish {
            subject: subject.clone(),
            reason: e.to_string(),
        })?;

        self.publish(subject.clone(), payload).await?;

        info!(
            "Published complete recording to {} ({} chunks, {} bytes)",
            subject,
            chunk_count,
            data.len()
        );

        Ok(())
    }
}
