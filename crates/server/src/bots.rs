use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use glam::Vec3;
use tokio::sync::mpsc;

use backtrack::{ClientId, EntityId, HitRequest, LagCompensator, RttLatencyTable, WeaponShape};

use crate::config::BotConfig;
use crate::events::ShotMessage;

const WEAPON_RANGE: f32 = 500.0;
/// Extra height above a target's bounds for deliberate misses.
const MISS_OFFSET: f32 = 2.0;

fn rand_u64(salt: u64) -> u64 {
    let mut hasher = DefaultHasher::new();
    Instant::now().hash(&mut hasher);
    salt.hash(&mut hasher);
    hasher.finish()
}

fn rand_percent(salt: u64) -> f32 {
    (rand_u64(salt) % 10_000) as f32 / 10_000.0
}

/// Simulated client: sees the world one latency late and sends its shots
/// one latency later still.
pub struct Bot {
    client: ClientId,
    position: Vec3,
    latency: Duration,
    jitter_ms: u32,
    fire_interval: Duration,
    accuracy: f32,
    targets: Vec<EntityId>,
}

impl Bot {
    pub fn new(index: usize, config: &BotConfig, centre: Vec3, targets: Vec<EntityId>) -> Self {
        let client = ClientId(index as u32 + 1);
        let spread = config.max_latency_ms.saturating_sub(config.min_latency_ms);
        let latency_ms = config.min_latency_ms
            + (rand_u64(u64::from(client.0)) % (u64::from(spread) + 1)) as u32;

        let offset = index as f32 * 0.5;
        Self {
            client,
            position: centre + Vec3::new(offset, 0.0, -offset),
            latency: Duration::from_millis(u64::from(latency_ms)),
            jitter_ms: config.jitter_ms,
            fire_interval: Duration::from_millis(config.fire_interval_ms.max(1)),
            accuracy: config.accuracy.clamp(0.0, 1.0),
            targets,
        }
    }

    pub fn client(&self) -> ClientId {
        self.client
    }

    pub fn latency(&self) -> Duration {
        self.latency
    }

    fn one_way_delay(&self, salt: u64) -> Duration {
        let jitter = rand_u64(salt) % (u64::from(self.jitter_ms) + 1);
        self.latency + Duration::from_millis(jitter)
    }

    pub async fn run(
        self,
        compensator: Arc<LagCompensator>,
        rtt: Arc<RttLatencyTable>,
        shots: mpsc::Sender<ShotMessage>,
        running: Arc<AtomicBool>,
    ) {
        let mut interval = tokio::time::interval(self.fire_interval);
        let mut salt = u64::from(self.client.0) << 32;

        while running.load(Ordering::Relaxed) {
            interval.tick().await;
            salt = salt.wrapping_add(1);
            if self.targets.is_empty() {
                continue;
            }

            let delay = self.one_way_delay(salt);
            rtt.record_rtt_sample(self.client, (delay * 2).as_secs_f32() * 1000.0);

            // what the client renders is one trip behind the server
            let fired_at = compensator.now();
            let seen_at = fired_at.saturating_sub(delay);
            let target = self.targets[(rand_u64(salt) % self.targets.len() as u64) as usize];
            let seen = match compensator.rewind(target, seen_at) {
                Ok(state) => state,
                Err(err) => {
                    log::debug!("{}: {}", self.client, err);
                    continue;
                }
            };

            let aimed = rand_percent(salt ^ 0x5eed) < self.accuracy;
            let aim_point = if aimed {
                seen.transform.position
            } else {
                seen.transform.position
                    + Vec3::Y * (seen.transform.bounds.bounding_radius() + MISS_OFFSET)
            };

            let request = HitRequest::new(
                self.client,
                WeaponShape::ray(self.position, aim_point - self.position, WEAPON_RANGE),
                fired_at,
            )
            .with_candidates(self.targets.iter().copied());

            tokio::time::sleep(delay).await;
            let message = ShotMessage {
                request,
                aimed_at: aimed.then_some(target),
                sent_at: Instant::now(),
            };
            if shots.send(message).await.is_err() {
                break;
            }
        }

        log::debug!("{} stopped", self.client);
    }
}
