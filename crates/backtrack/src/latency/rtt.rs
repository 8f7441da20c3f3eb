use std::collections::HashMap;

use parking_lot::RwLock;

use super::estimator::{ClientId, LatencyEstimator};

#[derive(Debug, Clone, Copy)]
struct RttEstimate {
    srtt: f32,
    rtt_var: f32,
    samples: u32,
}

impl RttEstimate {
    const INITIAL_SRTT_MS: f32 = 100.0;
    const INITIAL_RTT_VAR_MS: f32 = 50.0;

    fn new() -> Self {
        Self {
            srtt: Self::INITIAL_SRTT_MS,
            rtt_var: Self::INITIAL_RTT_VAR_MS,
            samples: 0,
        }
    }

    fn update(&mut self, rtt: f32) {
        const ALPHA: f32 = 0.125;
        const BETA: f32 = 0.25;

        if self.samples == 0 {
            self.srtt = rtt;
            self.rtt_var = rtt / 2.0;
        } else {
            let diff = (rtt - self.srtt).abs();
            self.rtt_var = (1.0 - BETA) * self.rtt_var + BETA * diff;
            self.srtt = (1.0 - ALPHA) * self.srtt + ALPHA * rtt;
        }
        self.samples = self.samples.saturating_add(1);
    }
}

/// Smoothed round-trip times per client, fed by the transport's ping/ack path.
#[derive(Debug, Default)]
pub struct RttLatencyTable {
    clients: RwLock<HashMap<ClientId, RttEstimate>>,
}

impl RttLatencyTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_rtt_sample(&self, client: ClientId, rtt_ms: f32) {
        if !rtt_ms.is_finite() || rtt_ms < 0.0 {
            log::warn!("{}: discarding rtt sample {}", client, rtt_ms);
            return;
        }

        self.clients
            .write()
            .entry(client)
            .or_insert_with(RttEstimate::new)
            .update(rtt_ms);
    }

    pub fn remove(&self, client: ClientId) -> bool {
        self.clients.write().remove(&client).is_some()
    }

    pub fn srtt(&self, client: ClientId) -> Option<f32> {
        self.clients.read().get(&client).map(|e| e.srtt)
    }

    pub fn rtt_var(&self, client: ClientId) -> Option<f32> {
        self.clients.read().get(&client).map(|e| e.rtt_var)
    }

    pub fn sample_count(&self, client: ClientId) -> u32 {
        self.clients.read().get(&client).map_or(0, |e| e.samples)
    }

    pub fn len(&self) -> usize {
        self.clients.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.read().is_empty()
    }
}

impl LatencyEstimator for RttLatencyTable {
    fn estimated_one_way_latency_ms(&self, client: ClientId) -> Option<f32> {
        self.srtt(client).map(|srtt| srtt / 2.0)
    }
}
