use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use anyhow::Result;
use tokio::sync::mpsc;

use backtrack::{AuditLog, LagCompensator, RttLatencyTable, ServerTime, SimulationLoop};

use crate::bots::Bot;
use crate::config::ServerConfig;
use crate::events::{ShotMessage, log_event};
use crate::simulation::TargetField;
use crate::stats::ServerStats;

const SHOT_QUEUE: usize = 1024;

pub struct CompensationServer {
    config: ServerConfig,
    compensator: Arc<LagCompensator>,
    rtt: Arc<RttLatencyTable>,
    audit: Arc<AuditLog>,
    field: Arc<TargetField>,
    stats: Arc<ServerStats>,
    running: Arc<AtomicBool>,
}

impl CompensationServer {
    pub fn new(config: ServerConfig) -> Result<Self> {
        let rtt = Arc::new(RttLatencyTable::new());
        let compensator = Arc::new(LagCompensator::new(
            config.compensation.clone(),
            rtt.clone(),
        )?);

        let audit = Arc::new(AuditLog::new(config.audit_capacity));
        compensator.subscribe(audit.clone());
        compensator.subscribe(Arc::new(log_event));

        let field = Arc::new(TargetField::new(config.targets.clone()));
        field.spawn(&compensator)?;

        Ok(Self {
            config,
            compensator,
            rtt,
            audit,
            field,
            stats: Arc::new(ServerStats::default()),
            running: Arc::new(AtomicBool::new(true)),
        })
    }

    pub fn compensator(&self) -> &Arc<LagCompensator> {
        &self.compensator
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    pub fn stats(&self) -> &ServerStats {
        &self.stats
    }

    pub async fn run(&self) -> Result<()> {
        let (tx, rx) = mpsc::channel(SHOT_QUEUE);

        let ticker = tokio::task::spawn_blocking({
            let compensator = Arc::clone(&self.compensator);
            let field = Arc::clone(&self.field);
            let running = Arc::clone(&self.running);
            move || run_ticks(compensator, field, running)
        });

        let handler = tokio::spawn(handle_shots(
            rx,
            Arc::clone(&self.compensator),
            Arc::clone(&self.stats),
        ));

        let mut bots = Vec::with_capacity(self.config.bots.count);
        for index in 0..self.config.bots.count {
            let bot = Bot::new(
                index,
                &self.config.bots,
                self.field.centre(),
                self.field.ids().to_vec(),
            );
            log::info!("{} joined with {:?} latency", bot.client(), bot.latency());
            bots.push(tokio::spawn(bot.run(
                Arc::clone(&self.compensator),
                Arc::clone(&self.rtt),
                tx.clone(),
                Arc::clone(&self.running),
            )));
        }
        drop(tx);

        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs(self.config.run_secs)) => {}
            _ = tokio::signal::ctrl_c() => log::info!("interrupted"),
        }
        self.running.store(false, Ordering::SeqCst);

        for bot in bots {
            bot.await?;
        }
        handler.await?;
        ticker.await?;

        self.field.despawn(&self.compensator);
        Ok(())
    }
}

fn run_ticks(compensator: Arc<LagCompensator>, field: Arc<TargetField>, running: Arc<AtomicBool>) {
    let mut sim = SimulationLoop::new(compensator, move |comp: &LagCompensator, time: ServerTime| {
        field.advance(comp, time)
    });
    let mut last_tick_time = Instant::now();

    while running.load(Ordering::SeqCst) {
        let now = Instant::now();
        sim.update(now - last_tick_time);
        last_tick_time = now;
        std::thread::sleep(Duration::from_millis(1));
    }

    log::info!("tick loop stopped at {} after {} ticks", sim.server_time(), sim.tick());
}

async fn handle_shots(
    mut rx: mpsc::Receiver<ShotMessage>,
    compensator: Arc<LagCompensator>,
    stats: Arc<ServerStats>,
) {
    while let Some(shot) = rx.recv().await {
        let report = compensator.request_hit_verification(&shot.request);
        log::trace!(
            "{} queued {:?}, best {:?}",
            report.attacker,
            shot.sent_at.elapsed(),
            report.best
        );
        stats.record(&report, shot.aimed_at);
    }
}
