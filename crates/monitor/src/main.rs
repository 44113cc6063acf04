//! Fatigue Monitor - Main Entry Point
//!
//! Usage: `fatigue-monitor [recording.jsonl] [settings.toml]`

use monitor::{init_logging, run, Recording, Settings};
use std::path::PathBuf;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let recording_arg = args.next().map(PathBuf::from);
    let settings_arg = args.next().map(PathBuf::from);

    let settings = Settings::load(settings_arg.as_deref())?;
    init_logging(settings.log_json)?;

    info!("=== Fatigue Monitor v{} ===", env!("CARGO_PKG_VERSION"));

    let path = recording_arg
        .or_else(|| settings.recording.clone())
        .ok_or("usage: fatigue-monitor <recording.jsonl> [settings.toml]")?;
    let recording = Recording::load(&path)?;
    info!(
        "Replaying {} ({} frames, {:?})",
        path.display(),
        recording.len(),
        recording.span()
    );

    let summary = run(&settings, &recording).await?;
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}
