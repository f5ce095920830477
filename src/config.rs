/*
* Guardian Configuration
* ----------------------
* @project: system-guardian
* @status: defaults-first-questions-later
*
* Hierarchical configuration, lowest to highest priority:
*
* 1. Hardcoded defaults (the values below, so the binary runs anywhere)
* 2. config/default.toml (base configuration, generated by `init`)
* 3. config/local.toml (machine-specific overrides, never committed)
* 4. Environment variables with the GUARDIAN_ prefix
*
* Two sections:
* - [monitoring]: how often we poll the host and how much slack the
*   sample channel gets before we start dropping.
* - [detection]: warm-up size, training window, z threshold, and the
*   optional retrain cadence for long runs.
*/

use std::path::Path;

use config::{Config, File};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core::errors::GuardianError;
use crate::monitoring::session::{DEFAULT_MIN_SAMPLES, DEFAULT_Z_THRESHOLD};

#[derive(Debug, Serialize, Deserialize)]
pub struct Settings {
    pub monitoring: MonitoringSettings,
    pub detection: DetectionSettings,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MonitoringSettings {
    /// Seconds between samples. Floored at 0.2s by the sampler.
    pub sample_interval_secs: f64,
    /// Bounded capacity of the sample hand-off channel.
    pub channel_capacity: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DetectionSettings {
    /// Samples required before the first baseline can be trained.
    pub min_samples: usize,
    /// Trailing window used when (re)training the baseline.
    pub train_window: usize,
    /// Max absolute z-score a sample may reach before it is flagged.
    pub z_threshold: f64,
    /// Retrain the baseline every N samples; 0 disables retraining.
    pub retrain_every_samples: usize,
}

impl Settings {
    pub fn new() -> Result<Self, GuardianError> {
        let config_path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config".to_string());

        info!("Loading configuration from path: {}", config_path);

        let config = Config::builder()
            // Start with default settings
            .set_default("monitoring.sample_interval_secs", 1.0)?
            .set_default("monitoring.channel_capacity", 64_i64)?
            .set_default("detection.min_samples", DEFAULT_MIN_SAMPLES as i64)?
            .set_default("detection.train_window", 300_i64)?
            .set_default("detection.z_threshold", DEFAULT_Z_THRESHOLD)?
            .set_default("detection.retrain_every_samples", 0_i64)?
            // Add configuration from files
            .add_source(File::with_name(&format!("{}/default", config_path)).required(false))
            .add_source(File::with_name(&format!("{}/local", config_path)).required(false))
            // Add environment variables with prefix "GUARDIAN_"
            .add_source(config::Environment::with_prefix("GUARDIAN"))
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Load settings from one explicit file, on top of the hardcoded
    /// defaults.
    pub fn new_from_file(path: &Path) -> Result<Self, GuardianError> {
        let config = Config::builder()
            .set_default("monitoring.sample_interval_secs", 1.0)?
            .set_default("monitoring.channel_capacity", 64_i64)?
            .set_default("detection.min_samples", DEFAULT_MIN_SAMPLES as i64)?
            .set_default("detection.train_window", 300_i64)?
            .set_default("detection.z_threshold", DEFAULT_Z_THRESHOLD)?
            .set_default("detection.retrain_every_samples", 0_i64)?
            .add_source(File::from(path.to_path_buf()))
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

pub fn generate_default_config() -> Settings {
    Settings {
        monitoring: MonitoringSettings {
            sample_interval_secs: 1.0,
            channel_capacity: 64,
        },
        detection: DetectionSettings {
            min_samples: DEFAULT_MIN_SAMPLES,
            train_window: 300,
            z_threshold: DEFAULT_Z_THRESHOLD,
            retrain_every_samples: 0,
        },
    }
}
