//! Alerting System
//!
//! Debounces the audible alert cue with a global cooldown and defines the
//! sinks that actually play it.

mod cue;
mod manager;

pub use cue::{AudioCue, CountingCue, LogCue};
pub use manager::{AlertConfig, AlertManager};
