//! Fatigue Monitor Runtime
//!
//! Settings, logging and the recording replay behind the `fatigue-monitor`
//! binary.

pub mod recording;
pub mod replay;
pub mod settings;

pub use recording::{RecordedFrame, Recording, RecordingError};
pub use replay::{replay_frames, run, spawn_paced_source, ReplayLandmarks, ReplaySummary};
pub use settings::Settings;

use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Initialize logging. `RUST_LOG` overrides the default `info` level.
pub fn init_logging(json: bool) -> Result<(), SetGlobalDefaultError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true);

    if json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    }
}
