pub mod cli;
pub mod config;
pub mod core;
pub mod monitoring;

// Re-exports
pub use crate::config::Settings;
pub use crate::core::errors::GuardianError;
pub use crate::monitoring::sampler::{SamplerHandle, SystemProbe};
pub use crate::monitoring::session::{Anomaly, Baseline, Sample, Session};
