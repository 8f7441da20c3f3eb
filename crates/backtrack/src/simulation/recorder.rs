use crate::history::RecordOutcome;
use crate::registry::EntityRegistry;

use super::time::ServerTime;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordStats {
    pub recorded: usize,
    pub replaced: usize,
    pub evicted: usize,
    pub rejected: usize,
}

/// Appends one snapshot per registered entity per tick.
#[derive(Debug, Default)]
pub struct SnapshotRecorder {
    last_sweep: Option<ServerTime>,
    sweeps: u64,
}

impl SnapshotRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_sweep(&self) -> Option<ServerTime> {
        self.last_sweep
    }

    pub fn sweeps(&self) -> u64 {
        self.sweeps
    }

    /// The caller must hold the registry for the whole pass so spawn and
    /// despawn cannot interleave with it.
    pub fn sweep(&mut self, registry: &EntityRegistry, server_time: ServerTime) -> RecordStats {
        if let Some(last) = self.last_sweep {
            if server_time < last {
                log::warn!("tick time went backwards: {} after {}", server_time, last);
            }
        }

        let mut stats = RecordStats::default();
        for (id, track) in registry.iter() {
            match track.write().record(server_time) {
                Ok(RecordOutcome::Appended) => stats.recorded += 1,
                Ok(RecordOutcome::Evicted) => {
                    stats.recorded += 1;
                    stats.evicted += 1;
                }
                Ok(RecordOutcome::Replaced) => stats.replaced += 1,
                Err(err) => {
                    log::warn!("entity {}: {}", id, err);
                    stats.rejected += 1;
                }
            }
        }

        self.last_sweep = Some(self.last_sweep.map_or(server_time, |last| last.max(server_time)));
        self.sweeps += 1;
        log::trace!(
            "sweep {} at {}: {} recorded, {} replaced",
            self.sweeps,
            server_time,
            stats.recorded,
            stats.replaced
        );

        stats
    }
}
