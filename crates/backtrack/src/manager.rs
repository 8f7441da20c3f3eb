use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};

use crate::config::CompensationConfig;
use crate::error::CompensationError;
use crate::event::{CompensationEvent, CompensationObserver, EventBus, ObserverId};
use crate::history::Transform;
use crate::latency::LatencyEstimator;
use crate::registry::{EntityId, EntityRegistry};
use crate::rewind::{RewindResolver, RewoundState};
use crate::simulation::{RecordStats, ServerTime, SnapshotRecorder};
use crate::verify::{HitReport, HitRequest, HitVerifier};

/// Entry point for the game server: owns the registry, records every tick,
/// and answers hit requests against rewound state.
///
/// One simulation thread calls [`on_tick`](Self::on_tick) and the
/// registration methods; any number of request handlers may call
/// [`request_hit_verification`](Self::request_hit_verification) concurrently.
pub struct LagCompensator {
    config: CompensationConfig,
    registry: RwLock<EntityRegistry>,
    recorder: Mutex<SnapshotRecorder>,
    verifier: HitVerifier,
    latency: Arc<dyn LatencyEstimator>,
    events: EventBus,
    now_micros: AtomicU64,
}

impl LagCompensator {
    pub fn new(
        config: CompensationConfig,
        latency: Arc<dyn LatencyEstimator>,
    ) -> Result<Self, CompensationError> {
        config.validate()?;

        let capacity = config.buffer_capacity();
        log::info!(
            "lag compensation: {} ms window, {} Hz, {} snapshots per entity",
            config.max_compensation_window_ms,
            config.tick_rate,
            capacity
        );

        Ok(Self {
            verifier: HitVerifier::new(&config),
            registry: RwLock::new(EntityRegistry::new(capacity)),
            recorder: Mutex::new(SnapshotRecorder::new()),
            latency,
            events: EventBus::new(),
            now_micros: AtomicU64::new(0),
            config,
        })
    }

    pub fn config(&self) -> &CompensationConfig {
        &self.config
    }

    pub fn subscribe(&self, observer: Arc<dyn CompensationObserver>) -> ObserverId {
        self.events.subscribe(observer)
    }

    pub fn unsubscribe(&self, id: ObserverId) -> bool {
        self.events.unsubscribe(id)
    }

    /// Latest tick time recorded, the upper edge of the compensation window.
    pub fn now(&self) -> ServerTime {
        ServerTime::from_micros(self.now_micros.load(Ordering::Acquire))
    }

    pub fn register_entity(
        &self,
        entity: EntityId,
        initial: Transform,
    ) -> Result<(), CompensationError> {
        self.registry.write().register(entity, initial)?;
        log::debug!("registered entity {}", entity);

        self.emit(|| CompensationEvent::EntityRegistered {
            entity,
            time: self.now(),
        });
        Ok(())
    }

    /// Drops the entity and its history. Later requests naming it miss.
    pub fn unregister_entity(&self, entity: EntityId) -> bool {
        let removed = self.registry.write().unregister(entity);
        if removed {
            log::debug!("unregistered entity {}", entity);
            self.emit(|| CompensationEvent::EntityUnregistered {
                entity,
                time: self.now(),
            });
        }
        removed
    }

    pub fn update_transform(
        &self,
        entity: EntityId,
        transform: Transform,
    ) -> Result<(), CompensationError> {
        self.registry.read().update_transform(entity, transform)
    }

    pub fn live_transform(&self, entity: EntityId) -> Option<Transform> {
        self.registry.read().live_transform(entity)
    }

    pub fn is_registered(&self, entity: EntityId) -> bool {
        self.registry.read().contains(entity)
    }

    pub fn entity_count(&self) -> usize {
        self.registry.read().len()
    }

    /// Oldest and newest recorded timestamps for `entity`.
    pub fn history_span(&self, entity: EntityId) -> Option<(ServerTime, ServerTime)> {
        let registry = self.registry.read();
        let track = registry.get(entity)?.read();
        let history = track.history();
        Some((history.oldest()?.timestamp, history.newest()?.timestamp))
    }

    /// Records one snapshot per registered entity at `time`.
    pub fn on_tick(&self, time: ServerTime) -> RecordStats {
        let stats = {
            let registry = self.registry.read();
            self.recorder.lock().sweep(&registry, time)
        };
        self.now_micros.fetch_max(time.as_micros(), Ordering::AcqRel);

        self.emit(|| CompensationEvent::TickRecorded { time, stats });
        stats
    }

    /// Rewinds a single entity without window or latency adjustment.
    pub fn rewind(
        &self,
        entity: EntityId,
        target: ServerTime,
    ) -> Result<RewoundState, CompensationError> {
        RewindResolver::resolve(&self.registry.read(), entity, target)
    }

    pub fn request_hit_verification(&self, request: &HitRequest) -> HitReport {
        let now = self.now();
        let report = {
            let registry = self.registry.read();
            self.verifier
                .verify(&registry, self.latency.as_ref(), now, request)
        };

        if report.flags.is_suspicious() {
            log::warn!(
                "{} request at {} flagged {:?}",
                request.attacker,
                request.client_action_time,
                report.flags
            );
        }

        if self.events.has_observers() {
            for candidate in &report.candidates {
                let event = match &candidate.outcome {
                    Ok(result) => CompensationEvent::HitVerified {
                        attacker: report.attacker,
                        target: candidate.entity,
                        client_action_time: report.client_action_time,
                        rewound_timestamp: result.rewound_timestamp,
                        compensation: report.compensation(),
                        latency_ms: report.latency_ms,
                        hit: result.hit,
                        flags: report.flags_for(result),
                    },
                    Err(reason) => CompensationEvent::CandidateRejected {
                        attacker: report.attacker,
                        target: candidate.entity,
                        client_action_time: report.client_action_time,
                        reason: reason.clone(),
                    },
                };
                self.events.emit(&event);
            }
        }

        report
    }

    fn emit(&self, event: impl FnOnce() -> CompensationEvent) {
        if self.events.has_observers() {
            self.events.emit(&event());
        }
    }
}
