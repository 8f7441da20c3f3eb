use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClientId(pub u32);

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "client {}", self.0)
    }
}

/// Boundary to whatever tracks per-client round trips. Values are hints and
/// are bounded before use.
pub trait LatencyEstimator: Send + Sync {
    /// Estimated one-way delay in milliseconds, `None` when unknown.
    fn estimated_one_way_latency_ms(&self, client: ClientId) -> Option<f32>;
}

impl<F> LatencyEstimator for F
where
    F: Fn(ClientId) -> Option<f32> + Send + Sync,
{
    fn estimated_one_way_latency_ms(&self, client: ClientId) -> Option<f32> {
        self(client)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedLatency {
    latency_ms: f32,
}

impl FixedLatency {
    pub fn new(latency_ms: f32) -> Self {
        Self { latency_ms }
    }
}

impl LatencyEstimator for FixedLatency {
    fn estimated_one_way_latency_ms(&self, _client: ClientId) -> Option<f32> {
        Some(self.latency_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SanitizedLatency {
    pub latency: Duration,
    pub clamped: bool,
}

impl SanitizedLatency {
    pub fn as_millis_f32(&self) -> f32 {
        self.latency.as_secs_f32() * 1000.0
    }
}

/// Unknown → zero. NaN or negative → zero, flagged. Above `max` → `max`, flagged.
pub fn sanitize_latency(raw_ms: Option<f32>, max: Duration) -> SanitizedLatency {
    let max_ms = max.as_secs_f64() * 1000.0;

    match raw_ms {
        None => SanitizedLatency {
            latency: Duration::ZERO,
            clamped: false,
        },
        Some(ms) if ms.is_nan() || ms < 0.0 => SanitizedLatency {
            latency: Duration::ZERO,
            clamped: true,
        },
        Some(ms) if f64::from(ms) > max_ms => SanitizedLatency {
            latency: max,
            clamped: true,
        },
        Some(ms) => SanitizedLatency {
            latency: Duration::from_secs_f64(f64::from(ms) / 1000.0),
            clamped: false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX: Duration = Duration::from_millis(500);

    #[test]
    fn passes_sane_values() {
        let latency = sanitize_latency(Some(80.0), MAX);
        assert!(!latency.clamped);
        assert!((latency.as_millis_f32() - 80.0).abs() < 1e-3);
    }

    #[test]
    fn clamps_anomalies() {
        for raw in [-5.0, f32::NAN, f32::NEG_INFINITY] {
            let latency = sanitize_latency(Some(raw), MAX);
            assert_eq!(latency.latency, Duration::ZERO);
            assert!(latency.clamped);
        }

        for raw in [10_000.0, f32::INFINITY] {
            let latency = sanitize_latency(Some(raw), MAX);
            assert_eq!(latency.latency, MAX);
            assert!(latency.clamped);
        }
    }

    #[test]
    fn unknown_is_zero_unflagged() {
        let latency = sanitize_latency(None, MAX);
        assert_eq!(latency.latency, Duration::ZERO);
        assert!(!latency.clamped);
    }

    #[test]
    fn closures_are_estimators() {
        let estimator = |client: ClientId| (client.0 == 1).then_some(42.0_f32);
        assert_eq!(estimator.estimated_one_way_latency_ms(ClientId(1)), Some(42.0));
        assert_eq!(estimator.estimated_one_way_latency_ms(ClientId(2)), None);
    }
}
