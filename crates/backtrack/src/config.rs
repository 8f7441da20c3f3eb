use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::CompensationError;
use crate::history::HistoryBuffer;

pub const DEFAULT_TICK_RATE: u32 = 60;
pub const DEFAULT_COMPENSATION_WINDOW_MS: u64 = 1000;
/// Snapshots per entity; one minute of history at 1 kHz.
pub const MAX_BUFFER_CAPACITY: usize = 60_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompensationConfig {
    /// How far back a verification may rewind.
    pub max_compensation_window_ms: u64,
    pub tick_rate: u32,
    /// Upper bound applied to latency estimates before use.
    pub max_latency_ms: u64,
    /// Derived from window and tick rate when unset.
    pub buffer_capacity_per_entity: Option<usize>,
}

impl Default for CompensationConfig {
    fn default() -> Self {
        Self {
            max_compensation_window_ms: DEFAULT_COMPENSATION_WINDOW_MS,
            tick_rate: DEFAULT_TICK_RATE,
            max_latency_ms: DEFAULT_COMPENSATION_WINDOW_MS,
            buffer_capacity_per_entity: None,
        }
    }
}

impl CompensationConfig {
    pub fn max_compensation_window(&self) -> Duration {
        Duration::from_millis(self.max_compensation_window_ms)
    }

    pub fn max_latency(&self) -> Duration {
        Duration::from_millis(self.max_latency_ms)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate.max(1) as f64)
    }

    /// Ticks needed to cover the window, plus one on each side so a query at
    /// the window's edge still has a bracketing pair.
    pub fn derived_capacity(&self) -> usize {
        let ticks = self
            .max_compensation_window_ms
            .saturating_mul(u64::from(self.tick_rate))
            .div_ceil(1000);
        usize::try_from(ticks)
            .unwrap_or(usize::MAX)
            .saturating_add(2)
    }

    pub fn buffer_capacity(&self) -> usize {
        self.buffer_capacity_per_entity
            .unwrap_or_else(|| self.derived_capacity())
            .max(HistoryBuffer::MIN_CAPACITY)
    }

    pub fn validate(&self) -> Result<(), CompensationError> {
        if self.tick_rate == 0 {
            return Err(CompensationError::InvalidConfig(
                "tick_rate must be positive".into(),
            ));
        }
        if self.max_compensation_window_ms == 0 {
            return Err(CompensationError::InvalidConfig(
                "max_compensation_window_ms must be positive".into(),
            ));
        }
        let needed = self.derived_capacity();
        if needed > MAX_BUFFER_CAPACITY {
            return Err(CompensationError::InvalidConfig(format!(
                "a {} ms window at {} Hz needs {} snapshots per entity, limit is {}",
                self.max_compensation_window_ms, self.tick_rate, needed, MAX_BUFFER_CAPACITY
            )));
        }
        if let Some(capacity) = self.buffer_capacity_per_entity {
            if capacity > MAX_BUFFER_CAPACITY {
                return Err(CompensationError::InvalidConfig(format!(
                    "buffer_capacity_per_entity {} exceeds limit {}",
                    capacity, MAX_BUFFER_CAPACITY
                )));
            }
            if capacity < needed {
                return Err(CompensationError::InvalidConfig(format!(
                    "buffer_capacity_per_entity {} cannot cover a {} ms window at {} Hz (needs {})",
                    capacity, self.max_compensation_window_ms, self.tick_rate, needed
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_capacity_covers_one_second() {
        let config = CompensationConfig::default();
        assert_eq!(config.buffer_capacity(), 62);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn capacity_rounds_up() {
        let config = CompensationConfig {
            max_compensation_window_ms: 250,
            tick_rate: 30,
            ..Default::default()
        };
        assert_eq!(config.derived_capacity(), 10);
    }

    #[test]
    fn rejects_undersized_override() {
        let config = CompensationConfig {
            buffer_capacity_per_entity: Some(10),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(CompensationError::InvalidConfig(_))
        ));
    }

    #[test]
    fn huge_window_is_rejected_not_overflowed() {
        let config = CompensationConfig {
            max_compensation_window_ms: u64::MAX / 2,
            ..Default::default()
        };

        assert!(config.derived_capacity() >= MAX_BUFFER_CAPACITY);
        assert!(matches!(
            config.validate(),
            Err(CompensationError::InvalidConfig(_))
        ));
    }

    #[test]
    fn rejects_zero_tick_rate() {
        let config = CompensationConfig {
            tick_rate: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
