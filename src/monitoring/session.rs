/*
* Guardian Metrics Session
* ------------------------
* @project: system-guardian
* @status: suspicious-of-every-spike
*
* This module is the heart of our anomaly detection system. The deal:
*
* 1. Sample: one timestamped observation of the four metrics we track
*    (CPU %, RAM %, Disk %, Net KB/s) - immutable once recorded.
*
* 2. Baseline: per-feature mean + standard deviation trained over the
*    sample log (or a trailing window of it). Replaced wholesale on every
*    train, never merged with the previous one.
*
* 3. Anomaly: produced when the newest sample's worst z-score crosses the
*    threshold. Carries the full z vector and a human-readable reason
*    naming the guilty feature ("CPU z=80.00" and friends).
*
* 4. Session: owns all three. Single writer: one task appends and scores,
*    everyone else just reads the verdicts.
*
* Scoring is plain z-score math: (value - mean) / std, flag on max |z|.
* Deterministic every time, no ML framework involved.
*/

use serde::{Deserialize, Serialize};

use crate::core::errors::GuardianError;

/// Number of tracked features, in fixed order: cpu, ram, disk, network.
pub const FEATURE_COUNT: usize = 4;

/// Display labels for the tracked features, same order as `FEATURE_COUNT`.
pub const FEATURE_LABELS: [&str; FEATURE_COUNT] = ["CPU", "RAM", "Disk", "Net"];

/// Standard deviations below this are clamped to 1.0 so a constant-valued
/// feature cannot blow up the z-score division.
pub const STD_DEV_FLOOR: f64 = 1e-6;

/// Default warm-up requirement before a baseline can be trained.
pub const DEFAULT_MIN_SAMPLES: usize = 60;

/// Default z-score threshold for flagging an anomaly.
pub const DEFAULT_Z_THRESHOLD: f64 = 3.0;

/// One observation of the tracked system metrics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Unix timestamp in seconds.
    pub timestamp: f64,
    pub cpu_percent: f64,
    pub ram_percent: f64,
    pub disk_percent: f64,
    pub network_kbps: f64,
}

impl Sample {
    pub fn new(
        timestamp: f64,
        cpu_percent: f64,
        ram_percent: f64,
        disk_percent: f64,
        network_kbps: f64,
    ) -> Self {
        Self {
            timestamp,
            cpu_percent,
            ram_percent,
            disk_percent,
            network_kbps,
        }
    }

    /// Feature vector in fixed order: cpu, ram, disk, network.
    pub fn features(&self) -> [f64; FEATURE_COUNT] {
        [
            self.cpu_percent,
            self.ram_percent,
            self.disk_percent,
            self.network_kbps,
        ]
    }
}

/// Trained per-feature reference used for scoring.
///
/// `std_dev` never contains a component below `STD_DEV_FLOOR`; degenerate
/// values are clamped to exactly 1.0 at train time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    pub mean: [f64; FEATURE_COUNT],
    pub std_dev: [f64; FEATURE_COUNT],
    /// How many samples the baseline was trained on.
    pub sample_count: usize,
}

/// A sample that crossed the z-score threshold, with the evidence attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    pub timestamp: f64,
    pub cpu_percent: f64,
    pub ram_percent: f64,
    pub disk_percent: f64,
    pub network_kbps: f64,
    /// Per-feature z-scores, same order as `FEATURE_LABELS`.
    pub z_scores: [f64; FEATURE_COUNT],
    /// Maximum absolute z-score across the four features.
    pub score: f64,
    /// Dominant feature and its z-value, e.g. `"CPU z=80.00"`.
    pub reason: String,
}

/// Stores samples, trains a mean/std baseline, runs z-score detection.
///
/// The sample and anomaly logs grow without bound for the lifetime of the
/// process; the session is sized for interactive monitoring runs, not
/// multi-week archival. All mutation must happen from a single task - the
/// sampler only ever hands over immutable `Sample` values.
#[derive(Debug, Default)]
pub struct Session {
    samples: Vec<Sample>,
    baseline: Option<Baseline>,
    anomalies: Vec<Anomaly>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sample to the log. Always succeeds.
    pub fn add_sample(&mut self, sample: Sample) {
        self.samples.push(sample);
    }

    /// Number of samples recorded so far.
    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// The most recently added sample, if any.
    pub fn last_sample(&self) -> Option<&Sample> {
        self.samples.last()
    }

    /// Currently trained baseline, if any.
    pub fn baseline(&self) -> Option<&Baseline> {
        self.baseline.as_ref()
    }

    /// Anomalies recorded since the last clear.
    pub fn anomalies(&self) -> &[Anomaly] {
        &self.anomalies
    }

    /// True once enough samples have accumulated to train a stable baseline.
    pub fn can_train(&self, min_samples: usize) -> bool {
        self.samples.len() >= min_samples
    }

    /// Train a new baseline on the full log, or on the trailing `window`
    /// samples when `window` is a positive count.
    ///
    /// Replaces the current baseline entirely. Uses the population standard
    /// deviation (denominator N); components below `STD_DEV_FLOOR` are
    /// clamped to 1.0.
    pub fn train(&mut self, window: Option<usize>) -> Result<Baseline, GuardianError> {
        let data = match window {
            Some(w) if w > 0 => {
                let start = self.samples.len().saturating_sub(w);
                &self.samples[start..]
            }
            _ => &self.samples[..],
        };

        if data.is_empty() {
            return Err(GuardianError::EmptyDataset);
        }

        let n = data.len() as f64;
        let mut mean = [0.0; FEATURE_COUNT];
        for sample in data {
            let x = sample.features();
            for i in 0..FEATURE_COUNT {
                mean[i] += x[i];
            }
        }
        for m in &mut mean {
            *m /= n;
        }

        let mut std_dev = [0.0; FEATURE_COUNT];
        for sample in data {
            let x = sample.features();
            for i in 0..FEATURE_COUNT {
                let d = x[i] - mean[i];
                std_dev[i] += d * d;
            }
        }
        for s in &mut std_dev {
            *s = (*s / n).sqrt();
            if s.abs() < STD_DEV_FLOOR {
                *s = 1.0;
            }
        }

        let baseline = Baseline {
            mean,
            std_dev,
            sample_count: data.len(),
        };
        self.baseline = Some(baseline.clone());
        Ok(baseline)
    }

    /// True iff a baseline is trained and at least one sample exists.
    pub fn can_detect(&self) -> bool {
        self.baseline.is_some() && !self.samples.is_empty()
    }

    /// Score the most recently added sample against the current baseline.
    ///
    /// Returns `None` when no baseline is trained yet (a normal state, not
    /// an error) or when the sample scores under the threshold. When the
    /// maximum absolute z-score reaches `z_threshold`, the anomaly is
    /// recorded in the log and returned.
    pub fn detect_last(&mut self, z_threshold: f64) -> Option<Anomaly> {
        if !self.can_detect() {
            return None;
        }

        let sample = *self.samples.last()?;
        let baseline = self.baseline.as_ref()?;

        let x = sample.features();
        let mut z_scores = [0.0; FEATURE_COUNT];
        for i in 0..FEATURE_COUNT {
            z_scores[i] = (x[i] - baseline.mean[i]) / baseline.std_dev[i];
        }

        // Dominant feature: max |z|, ties go to the first in feature order.
        let mut dominant = 0;
        for i in 1..FEATURE_COUNT {
            if z_scores[i].abs() > z_scores[dominant].abs() {
                dominant = i;
            }
        }
        let score = z_scores[dominant].abs();
        let reason = format!("{} z={:.2}", FEATURE_LABELS[dominant], z_scores[dominant]);

        if score >= z_threshold {
            let anomaly = Anomaly {
                timestamp: sample.timestamp,
                cpu_percent: sample.cpu_percent,
                ram_percent: sample.ram_percent,
                disk_percent: sample.disk_percent,
                network_kbps: sample.network_kbps,
                z_scores,
                score,
                reason,
            };
            self.anomalies.push(anomaly.clone());
            return Some(anomaly);
        }

        None
    }

    /// Empty the anomaly log. Samples and baseline are untouched.
    pub fn clear_anomalies(&mut self) {
        self.anomalies.clear();
    }
}
