use std::fmt;
use std::ops::{Add, Sub};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// A point on the single authoritative server timeline, in microseconds.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ServerTime(u64);

impl ServerTime {
    pub const ZERO: Self = Self(0);

    pub const fn from_micros(micros: u64) -> Self {
        Self(micros)
    }

    pub const fn from_millis(millis: u64) -> Self {
        Self(millis.saturating_mul(1000))
    }

    pub fn from_duration(elapsed: Duration) -> Self {
        Self(duration_micros(elapsed))
    }

    pub const fn as_micros(self) -> u64 {
        self.0
    }

    pub fn as_millis_f64(self) -> f64 {
        self.0 as f64 / 1000.0
    }

    pub fn saturating_add(self, duration: Duration) -> Self {
        Self(self.0.saturating_add(duration_micros(duration)))
    }

    pub fn saturating_sub(self, duration: Duration) -> Self {
        Self(self.0.saturating_sub(duration_micros(duration)))
    }

    /// Zero when `earlier` is actually later.
    pub fn duration_since(self, earlier: ServerTime) -> Duration {
        Duration::from_micros(self.0.saturating_sub(earlier.0))
    }

    /// Fractional position of `self` inside `[from, to]`, unclamped.
    pub fn fraction_between(self, from: ServerTime, to: ServerTime) -> f32 {
        let span = to.0.saturating_sub(from.0);
        if span == 0 {
            return 0.0;
        }
        (self.0 as f64 - from.0 as f64) as f32 / span as f32
    }
}

impl Add<Duration> for ServerTime {
    type Output = ServerTime;

    fn add(self, rhs: Duration) -> ServerTime {
        self.saturating_add(rhs)
    }
}

impl Sub<Duration> for ServerTime {
    type Output = ServerTime;

    fn sub(self, rhs: Duration) -> ServerTime {
        self.saturating_sub(rhs)
    }
}

impl fmt::Display for ServerTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}ms", self.as_millis_f64())
    }
}

fn duration_micros(duration: Duration) -> u64 {
    u64::try_from(duration.as_micros()).unwrap_or(u64::MAX)
}

/// Monotonic source of [`ServerTime`], anchored when the clock is created.
#[derive(Debug, Clone, Copy)]
pub struct ServerClock {
    start: Instant,
}

impl Default for ServerClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn now(&self) -> ServerTime {
        ServerTime::from_duration(self.start.elapsed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn saturating_arithmetic() {
        let t = ServerTime::from_millis(50);
        assert_eq!(t - Duration::from_millis(80), ServerTime::ZERO);
        assert_eq!(t + Duration::from_millis(25), ServerTime::from_millis(75));
        assert_eq!(
            ServerTime::from_millis(10).duration_since(t),
            Duration::ZERO
        );
    }

    #[test]
    fn fraction_between_bounds() {
        let from = ServerTime::from_millis(0);
        let to = ServerTime::from_millis(100);

        assert!((ServerTime::from_millis(50).fraction_between(from, to) - 0.5).abs() < 1e-6);
        assert_eq!(ServerTime::from_millis(50).fraction_between(to, to), 0.0);
    }

    #[test]
    fn clock_is_monotonic() {
        let clock = ServerClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
