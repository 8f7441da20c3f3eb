use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use backtrack::CompensationConfig;

use crate::simulation::TargetConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub count: usize,
    pub fire_interval_ms: u64,
    pub min_latency_ms: u32,
    pub max_latency_ms: u32,
    pub jitter_ms: u32,
    /// Fraction of shots aimed at the target, the rest deliberately miss.
    pub accuracy: f32,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            count: 4,
            fire_interval_ms: 250,
            min_latency_ms: 20,
            max_latency_ms: 150,
            jitter_ms: 5,
            accuracy: 0.8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub run_secs: u64,
    pub audit_capacity: usize,
    pub compensation: CompensationConfig,
    pub targets: TargetConfig,
    pub bots: BotConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            run_secs: 10,
            audit_capacity: backtrack::event::DEFAULT_MAX_RECORDS,
            compensation: CompensationConfig::default(),
            targets: TargetConfig::default(),
            bots: BotConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: ServerConfig = toml::from_str(
            r#"
            run_secs = 3

            [compensation]
            max_compensation_window_ms = 250

            [bots]
            count = 2
            "#,
        )
        .unwrap();

        assert_eq!(config.run_secs, 3);
        assert_eq!(config.compensation.max_compensation_window_ms, 250);
        assert_eq!(config.compensation.tick_rate, backtrack::DEFAULT_TICK_RATE);
        assert_eq!(config.bots.count, 2);
        assert_eq!(config.bots.fire_interval_ms, 250);
        assert_eq!(config.targets.count, TargetConfig::default().count);
    }
}
