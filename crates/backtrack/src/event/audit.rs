use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use rkyv::{Archive, Deserialize, Serialize, rancor};

use crate::verify::CompensationFlags;

use super::bus::CompensationObserver;
use super::types::CompensationEvent;

pub const DEFAULT_MAX_RECORDS: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub enum AuditOutcome {
    Hit,
    Miss,
    NotCompensable,
}

/// Flat, archivable form of one verified candidate.
#[derive(Debug, Clone, Copy, PartialEq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct AuditRecord {
    pub attacker: u32,
    pub target: u32,
    pub client_action_time_us: u64,
    pub rewound_time_us: u64,
    pub compensation_us: u64,
    pub latency_ms: f32,
    pub outcome: AuditOutcome,
    pub flags: u8,
}

impl AuditRecord {
    pub fn from_event(event: &CompensationEvent) -> Option<Self> {
        match event {
            CompensationEvent::HitVerified {
                attacker,
                target,
                client_action_time,
                rewound_timestamp,
                compensation,
                latency_ms,
                hit,
                flags,
            } => Some(Self {
                attacker: attacker.0,
                target: target.0,
                client_action_time_us: client_action_time.as_micros(),
                rewound_time_us: rewound_timestamp.as_micros(),
                compensation_us: u64::try_from(compensation.as_micros()).unwrap_or(u64::MAX),
                latency_ms: *latency_ms,
                outcome: if *hit {
                    AuditOutcome::Hit
                } else {
                    AuditOutcome::Miss
                },
                flags: flags.bits(),
            }),
            CompensationEvent::CandidateRejected {
                attacker,
                target,
                client_action_time,
                ..
            } => Some(Self {
                attacker: attacker.0,
                target: target.0,
                client_action_time_us: client_action_time.as_micros(),
                rewound_time_us: 0,
                compensation_us: 0,
                latency_ms: 0.0,
                outcome: AuditOutcome::NotCompensable,
                flags: 0,
            }),
            _ => None,
        }
    }

    pub fn flags(&self) -> CompensationFlags {
        CompensationFlags::from_bits_truncate(self.flags)
    }

    pub fn is_hit(&self) -> bool {
        self.outcome == AuditOutcome::Hit
    }

    pub fn is_suspicious(&self) -> bool {
        self.flags().is_suspicious()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("serialization failed: {0}")]
    Serialize(rancor::Error),
    #[error("deserialization failed: {0}")]
    Deserialize(rancor::Error),
}

pub fn encode_records(records: Vec<AuditRecord>) -> Result<Vec<u8>, AuditError> {
    rkyv::to_bytes::<rancor::Error>(&records)
        .map(|bytes| bytes.to_vec())
        .map_err(AuditError::Serialize)
}

pub fn decode_records(data: &[u8]) -> Result<Vec<AuditRecord>, AuditError> {
    rkyv::from_bytes::<Vec<AuditRecord>, rancor::Error>(data).map_err(AuditError::Deserialize)
}

/// Bounded trail of verification outcomes; the oldest record falls off when full.
#[derive(Debug)]
pub struct AuditLog {
    records: Mutex<VecDeque<AuditRecord>>,
    max_records: usize,
    dropped: AtomicU64,
}

impl AuditLog {
    pub fn new(max_records: usize) -> Self {
        let max_records = max_records.max(1);
        Self {
            records: Mutex::new(VecDeque::with_capacity(max_records.min(DEFAULT_MAX_RECORDS))),
            max_records,
            dropped: AtomicU64::new(0),
        }
    }

    pub fn push(&self, record: AuditRecord) {
        let mut records = self.records.lock();
        if records.len() >= self.max_records {
            records.pop_front();
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        records.push_back(record);
    }

    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().iter().copied().collect()
    }

    pub fn flagged(&self) -> Vec<AuditRecord> {
        self.records
            .lock()
            .iter()
            .filter(|r| r.is_suspicious())
            .copied()
            .collect()
    }

    pub fn drain(&self) -> Vec<AuditRecord> {
        self.records.lock().drain(..).collect()
    }

    pub fn export(&self) -> Result<Vec<u8>, AuditError> {
        encode_records(self.records())
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RECORDS)
    }
}

impl CompensationObserver for AuditLog {
    fn on_event(&self, event: &CompensationEvent) {
        if let Some(record) = AuditRecord::from_event(event) {
            self.push(record);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::error::CompensationError;
    use crate::latency::ClientId;
    use crate::registry::EntityId;
    use crate::simulation::ServerTime;

    fn verified(target: u32, hit: bool, flags: CompensationFlags) -> CompensationEvent {
        CompensationEvent::HitVerified {
            attacker: ClientId(7),
            target: EntityId(target),
            client_action_time: ServerTime::from_millis(900),
            rewound_timestamp: ServerTime::from_millis(850),
            compensation: Duration::from_millis(150),
            latency_ms: 50.0,
            hit,
            flags,
        }
    }

    #[test]
    fn records_verification_events_only() {
        let log = AuditLog::new(16);

        log.on_event(&CompensationEvent::EntityRegistered {
            entity: EntityId(1),
            time: ServerTime::ZERO,
        });
        log.on_event(&verified(1, true, CompensationFlags::empty()));
        log.on_event(&CompensationEvent::CandidateRejected {
            attacker: ClientId(7),
            target: EntityId(2),
            client_action_time: ServerTime::ZERO,
            reason: CompensationError::EntityNotCompensable(EntityId(2)),
        });

        let records = log.records();
        assert_eq!(records.len(), 2);
        assert!(records[0].is_hit());
        assert_eq!(records[0].compensation_us, 150_000);
        assert_eq!(records[1].outcome, AuditOutcome::NotCompensable);
    }

    #[test]
    fn bounded_drops_oldest() {
        let log = AuditLog::new(2);

        for target in 1..=3 {
            log.on_event(&verified(target, false, CompensationFlags::empty()));
        }

        let targets: Vec<_> = log.records().iter().map(|r| r.target).collect();
        assert_eq!(targets, vec![2, 3]);
        assert_eq!(log.dropped(), 1);
    }

    #[test]
    fn flagged_filters_suspicious() {
        let log = AuditLog::default();

        log.on_event(&verified(1, true, CompensationFlags::LIVE_FALLBACK));
        log.on_event(&verified(2, true, CompensationFlags::OUT_OF_WINDOW));

        let flagged = log.flagged();
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].target, 2);
        assert!(flagged[0].flags().contains(CompensationFlags::OUT_OF_WINDOW));
    }

    #[test]
    fn export_decodes() {
        let log = AuditLog::default();
        log.on_event(&verified(3, true, CompensationFlags::LATENCY_CLAMPED));

        let bytes = log.export().unwrap();
        let decoded = decode_records(&bytes).unwrap();

        assert_eq!(decoded, log.records());
    }

    #[test]
    fn drain_empties() {
        let log = AuditLog::default();
        log.on_event(&verified(1, false, CompensationFlags::empty()));

        assert_eq!(log.drain().len(), 1);
        assert!(log.is_empty());
    }
}
