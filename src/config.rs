use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub transport: TransportConfig,
    pub capture: CaptureSettings,
    pub recordings: RecordingsConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct TransportConfig {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct CaptureSettings {
    pub sample_rate: u32,
    pub channels: u16,
    /// How often the capture backend emits a chunk, in milliseconds
    pub chunk_interval_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct RecordingsConfig {
    pub output_dir: String,
}

impl Config {
    /// Load configuration, layering an optional file over built-in defaults
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .set_default("service.name", "audio-relay")?
            .set_default("service.http.bind", "127.0.0.1")?
            .set_default("service.http.port", 7777_i64)?
            .set_default("transport.url", "nats://localhost:4222")?
            .set_default("capture.sample_rate", 16000_i64)?
            .set_default("capture.channels", 1_i64)?
            .set_default("capture.chunk_interval_ms", 100_i64)?
            .set_default("recordings.output_dir", "recordings")?
            .add_source(config::File::with_name(path).required(false))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
