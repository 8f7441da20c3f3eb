mod estimator;
mod rtt;

pub use estimator::{ClientId, FixedLatency, LatencyEstimator, SanitizedLatency, sanitize_latency};
pub use rtt::RttLatencyTable;
