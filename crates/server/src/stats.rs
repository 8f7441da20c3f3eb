use std::sync::atomic::{AtomicU64, Ordering};

use backtrack::{EntityId, HitReport};

#[derive(Debug, Default)]
pub struct ServerStats {
    shots: AtomicU64,
    hits: AtomicU64,
    confirmed: AtomicU64,
    denied: AtomicU64,
    stray_hits: AtomicU64,
    flagged: AtomicU64,
    compensation_us: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatsSnapshot {
    pub shots: u64,
    pub hits: u64,
    /// Aimed shots the server agreed with.
    pub confirmed: u64,
    /// Aimed shots the server rejected.
    pub denied: u64,
    /// Deliberate misses that still hit something.
    pub stray_hits: u64,
    pub flagged: u64,
    pub mean_compensation_ms: f64,
}

impl StatsSnapshot {
    pub fn confirm_rate(&self) -> f64 {
        let aimed = self.confirmed + self.denied;
        if aimed == 0 {
            0.0
        } else {
            self.confirmed as f64 / aimed as f64
        }
    }
}

impl ServerStats {
    pub fn record(&self, report: &HitReport, aimed_at: Option<EntityId>) {
        self.shots.fetch_add(1, Ordering::Relaxed);
        self.compensation_us.fetch_add(
            u64::try_from(report.compensation().as_micros()).unwrap_or(u64::MAX),
            Ordering::Relaxed,
        );

        if report.is_hit() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        }
        if report.flags.is_suspicious() {
            self.flagged.fetch_add(1, Ordering::Relaxed);
        }

        match aimed_at {
            Some(target) => {
                let agreed = matches!(report.result_for(target), Some(Ok(result)) if result.hit);
                let counter = if agreed { &self.confirmed } else { &self.denied };
                counter.fetch_add(1, Ordering::Relaxed);
            }
            None if report.is_hit() => {
                self.stray_hits.fetch_add(1, Ordering::Relaxed);
            }
            None => {}
        }
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let shots = self.shots.load(Ordering::Relaxed);
        let compensation_us = self.compensation_us.load(Ordering::Relaxed);
        StatsSnapshot {
            shots,
            hits: self.hits.load(Ordering::Relaxed),
            confirmed: self.confirmed.load(Ordering::Relaxed),
            denied: self.denied.load(Ordering::Relaxed),
            stray_hits: self.stray_hits.load(Ordering::Relaxed),
            flagged: self.flagged.load(Ordering::Relaxed),
            mean_compensation_ms: if shots == 0 {
                0.0
            } else {
                compensation_us as f64 / shots as f64 / 1000.0
            },
        }
    }
}
