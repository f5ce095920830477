pub mod sampler;
pub mod session;

// exports for lazy devs like us
pub use sampler::{SamplerHandle, SystemProbe};
pub use session::{Anomaly, Baseline, Sample, Session};
