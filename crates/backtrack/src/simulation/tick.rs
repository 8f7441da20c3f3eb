use std::sync::Arc;
use std::time::Duration;

use crate::manager::LagCompensator;

use super::time::ServerTime;

pub struct FixedTimestep {
    tick_rate: u32,
    dt: Duration,
    accumulator: Duration,
}

impl FixedTimestep {
    const MAX_CATCH_UP_TICKS: u32 = 8;

    pub fn new(tick_rate: u32) -> Self {
        let tick_rate = tick_rate.max(1);
        Self {
            tick_rate,
            dt: Duration::from_secs_f64(1.0 / tick_rate as f64),
            accumulator: Duration::ZERO,
        }
    }

    pub fn tick_rate(&self) -> u32 {
        self.tick_rate
    }

    pub fn dt(&self) -> Duration {
        self.dt
    }

    pub fn accumulate(&mut self, delta: Duration) {
        self.accumulator += delta.min(self.dt * Self::MAX_CATCH_UP_TICKS);
    }

    pub fn should_tick(&self) -> bool {
        self.accumulator >= self.dt
    }

    pub fn consume_tick(&mut self) -> bool {
        if self.accumulator >= self.dt {
            self.accumulator -= self.dt;
            true
        } else {
            false
        }
    }

}

/// Drives the authoritative tick: movement first, then the history sweep, so
/// the recorded snapshot is exactly what the tick will broadcast.
pub struct SimulationLoop<F> {
    compensator: Arc<LagCompensator>,
    timestep: FixedTimestep,
    tick: u64,
    tick_fn: F,
}

impl<F> SimulationLoop<F>
where
    F: FnMut(&LagCompensator, ServerTime),
{
    pub fn new(compensator: Arc<LagCompensator>, tick_fn: F) -> Self {
        let timestep = FixedTimestep::new(compensator.config().tick_rate);
        Self {
            compensator,
            timestep,
            tick: 0,
            tick_fn,
        }
    }

    pub fn compensator(&self) -> &Arc<LagCompensator> {
        &self.compensator
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn server_time(&self) -> ServerTime {
        let micros = self.timestep.dt().as_micros() as u64;
        ServerTime::from_micros(micros.saturating_mul(self.tick))
    }

    pub fn update(&mut self, delta: Duration) -> u32 {
        self.timestep.accumulate(delta);

        let mut ticks_run = 0;
        while self.timestep.consume_tick() {
            self.tick += 1;
            let time = self.server_time();
            (self.tick_fn)(&self.compensator, time);
            self.compensator.on_tick(time);
            ticks_run += 1;
        }

        ticks_run
    }
}
