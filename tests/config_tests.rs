use anyhow::Result;
use audio_relay::Config;
use std::io::Write;
use tempfile::TempDir;

#[test]
fn test_defaults_without_config_file() -> Result<()> {
    let cfg = Config::load("does/not/exist")?;

    assert_eq!(cfg.service.name, "audio-relay");
    assert_eq!(cfg.service.http.port, 7777);
    assert_eq!(cfg.transport.url, "nats://localhost:4222");
    assert_eq!(cfg.capture.sample_rate, 16000);
    assert_eq!(cfg.capture.channels, 1);
    assert_eq!(cfg.capture.chunk_interval_ms, 100);
    assert_eq!(cfg.recordings.output_dir, "recordings");

    Ok(())
}

#[test]
fn test_file_overrides_defaults() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("relay.toml");

    let mut file = std::fs::File::create(&path)?;
    writeln!(file, "[transport]")?;
    writeln!(file, "url = \"nats://example.com:4222\"")?;
    writeln!(file, "[capture]")?;
    writeln!(file, "chunk_interval_ms = 250")?;

    let base = path.with_extension("");
    let cfg = Config::load(base.to_str().unwrap())?;

    assert_eq!(cfg.transport.url, "nats://example.com:4222");
    assert_eq!(cfg.capture.chunk_interval_ms, 250);
    // Untouched sections keep their defaults
    assert_eq!(cfg.service.http.port, 7777);
    assert_eq!(cfg.capture.sample_rate, 16000);

    Ok(())
}
