use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CompensationError;
use crate::history::{HistoryBuffer, RecordOutcome, Snapshot, Transform};
use crate::simulation::ServerTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u32);

impl EntityId {
    pub fn id(self) -> u32 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Live transform plus recorded past of one damageable entity.
#[derive(Debug)]
pub struct EntityTrack {
    live: Transform,
    history: HistoryBuffer,
}

impl EntityTrack {
    pub(crate) fn new(live: Transform, history: HistoryBuffer) -> Self {
        Self { live, history }
    }

    pub fn live(&self) -> &Transform {
        &self.live
    }

    pub fn history(&self) -> &HistoryBuffer {
        &self.history
    }

    pub(crate) fn set_live(&mut self, transform: Transform) {
        self.live = transform;
    }

    pub(crate) fn record(
        &mut self,
        timestamp: ServerTime,
    ) -> Result<RecordOutcome, CompensationError> {
        self.history.record(Snapshot::new(timestamp, self.live))
    }

    pub(crate) fn into_history(self) -> HistoryBuffer {
        self.history
    }
}
