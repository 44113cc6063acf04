//! Layered settings
//!
//! Defaults, then an optional TOML file, then `FATIGUE__*` environment
//! variables (`FATIGUE__DMS__SUSTAIN_MS=2000`). A `preset` replaces the
//! default `[dms]` thresholds; explicit `[dms]` keys still win over it.

use alerting::AlertConfig;
use anyhow::Context;
use config::{Config, Environment, File};
use dms::{CalibrationConfig, DmsConfig, DmsPreset};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings file looked up in the working directory when none is given
pub const DEFAULT_SETTINGS_FILE: &str = "fatigue-monitor";

/// Binary settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Threshold set the `dms` section starts from
    pub preset: DmsPreset,
    pub dms: DmsConfig,
    pub alerting: AlertConfig,
    pub calibration: CalibrationConfig,

    /// Directory holding `user_profile.json`
    pub profile_dir: PathBuf,

    /// Recording to replay when none is given on the command line
    pub recording: Option<PathBuf>,

    /// Ignore any stored profile and calibrate again
    pub recalibrate: bool,

    /// Emit logs as JSON
    pub log_json: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            preset: DmsPreset::default(),
            dms: DmsConfig::default(),
            alerting: AlertConfig::default(),
            calibration: CalibrationConfig::default(),
            profile_dir: PathBuf::from("."),
            recording: None,
            recalibrate: false,
            log_json: false,
        }
    }
}

impl Settings {
    /// Load settings. An explicit file must exist; the default file is optional.
    pub fn load(file: Option<&Path>) -> anyhow::Result<Self> {
        let file_source = match file {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_SETTINGS_FILE).required(false),
        };

        let layered = Config::builder()
            .add_source(file_source)
            .add_source(Environment::with_prefix("FATIGUE").separator("__"))
            .build()
            .context("Failed to read settings")?;

        // An unknown preset name is reported by the final deserialize
        let preset = layered.get::<DmsPreset>("preset").unwrap_or_default();
        let preset_layer = Config::try_from(&PresetLayer {
            dms: DmsConfig::from_preset(preset),
        })
        .context("Failed to apply preset")?;

        Config::builder()
            .add_source(preset_layer)
            .add_source(layered)
            .build()
            .context("Failed to read settings")?
            .try_deserialize()
            .context("Invalid settings")
    }
}

#[derive(Serialize)]
struct PresetLayer {
    dms: DmsConfig,
}
