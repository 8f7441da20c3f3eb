use std::collections::VecDeque;

use crate::error::CompensationError;
use crate::simulation::ServerTime;

use super::snapshot::Snapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Appended,
    Replaced,
    Evicted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clamp {
    None,
    BeforeOldest,
    AfterNewest,
}

/// The snapshots surrounding a queried timestamp. `before == after` when the
/// query hit a recorded tick exactly or fell outside the retained range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bracket {
    pub before: Snapshot,
    pub after: Snapshot,
    pub clamp: Clamp,
}

impl Bracket {
    fn single(snapshot: Snapshot, clamp: Clamp) -> Self {
        Self {
            before: snapshot,
            after: snapshot,
            clamp,
        }
    }

    pub fn is_single(&self) -> bool {
        self.before.timestamp == self.after.timestamp
    }
}

/// Fixed-capacity ring of snapshots ordered by strictly increasing timestamp.
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    snapshots: VecDeque<Snapshot>,
    capacity: usize,
}

impl HistoryBuffer {
    pub const MIN_CAPACITY: usize = 2;

    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(Self::MIN_CAPACITY);
        Self {
            snapshots: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn record(&mut self, snapshot: Snapshot) -> Result<RecordOutcome, CompensationError> {
        if let Some(newest) = self.snapshots.back_mut() {
            if snapshot.timestamp == newest.timestamp {
                *newest = snapshot;
                return Ok(RecordOutcome::Replaced);
            }
            if snapshot.timestamp < newest.timestamp {
                return Err(CompensationError::NonMonotonicTimestamp {
                    timestamp: snapshot.timestamp,
                    newest: newest.timestamp,
                });
            }
        }

        let outcome = if self.snapshots.len() >= self.capacity {
            self.snapshots.pop_front();
            RecordOutcome::Evicted
        } else {
            RecordOutcome::Appended
        };
        self.snapshots.push_back(snapshot);

        Ok(outcome)
    }

    /// Returns the bracketing pair for `timestamp`, or `None` while empty.
    /// Never extrapolates: out-of-range queries clamp to the nearest end.
    pub fn query(&self, timestamp: ServerTime) -> Option<Bracket> {
        let oldest = *self.snapshots.front()?;
        let newest = *self.snapshots.back()?;

        if timestamp <= oldest.timestamp {
            let clamp = if timestamp < oldest.timestamp {
                Clamp::BeforeOldest
            } else {
                Clamp::None
            };
            return Some(Bracket::single(oldest, clamp));
        }

        if timestamp >= newest.timestamp {
            let clamp = if timestamp > newest.timestamp {
                Clamp::AfterNewest
            } else {
                Clamp::None
            };
            return Some(Bracket::single(newest, clamp));
        }

        // oldest < timestamp < newest, so 0 < index < len
        let index = self
            .snapshots
            .partition_point(|s| s.timestamp < timestamp);
        let after = self.snapshots[index];
        if after.timestamp == timestamp {
            return Some(Bracket::single(after, Clamp::None));
        }

        Some(Bracket {
            before: self.snapshots[index - 1],
            after,
            clamp: Clamp::None,
        })
    }

    pub fn oldest(&self) -> Option<&Snapshot> {
        self.snapshots.front()
    }

    pub fn newest(&self) -> Option<&Snapshot> {
        self.snapshots.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Snapshot> {
        self.snapshots.iter()
    }

    pub fn clear(&mut self) {
        self.snapshots.clear();
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}
