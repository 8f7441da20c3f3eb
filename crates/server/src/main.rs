mod bots;
mod config;
mod events;
mod server;
mod simulation;
mod stats;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use config::ServerConfig;
use server::CompensationServer;

#[derive(Parser)]
#[command(name = "backtrack-server")]
#[command(about = "Lag compensation server with simulated clients")]
struct Args {
    #[arg(short, long, help = "TOML configuration file")]
    config: Option<PathBuf>,

    #[arg(short, long)]
    tick_rate: Option<u32>,

    #[arg(short, long, help = "Maximum rewind in ms")]
    window: Option<u64>,

    #[arg(short, long, help = "Run time in seconds")]
    duration: Option<u64>,

    #[arg(short, long, help = "Number of simulated clients")]
    bots: Option<usize>,

    #[arg(long)]
    targets: Option<usize>,

    #[arg(long, help = "Minimum client latency in ms")]
    min_latency: Option<u32>,

    #[arg(long, help = "Maximum client latency in ms")]
    max_latency: Option<u32>,

    #[arg(long, help = "Jitter in ms")]
    jitter: Option<u32>,

    #[arg(long, help = "Write the audit trail here on exit")]
    audit_out: Option<PathBuf>,
}

impl Args {
    fn apply(&self, config: &mut ServerConfig) {
        if let Some(tick_rate) = self.tick_rate {
            config.compensation.tick_rate = tick_rate;
        }
        if let Some(window) = self.window {
            config.compensation.max_compensation_window_ms = window;
        }
        if let Some(duration) = self.duration {
            config.run_secs = duration;
        }
        if let Some(bots) = self.bots {
            config.bots.count = bots;
        }
        if let Some(targets) = self.targets {
            config.targets.count = targets;
        }
        if let Some(min_latency) = self.min_latency {
            config.bots.min_latency_ms = min_latency;
        }
        if let Some(max_latency) = self.max_latency {
            config.bots.max_latency_ms = max_latency;
        }
        if let Some(jitter) = self.jitter {
            config.bots.jitter_ms = jitter;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut config = match &args.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    args.apply(&mut config);

    let run_secs = config.run_secs;
    let server = CompensationServer::new(config)?;
    log::info!(
        "Server running for {} s with a {} ms compensation window",
        run_secs,
        server.compensator().config().max_compensation_window_ms
    );
    server.run().await?;

    let summary = server.stats().snapshot();
    log::info!(
        "{} shots, {} hits, {} confirmed, {} denied ({:.1}% agreement), {} stray",
        summary.shots,
        summary.hits,
        summary.confirmed,
        summary.denied,
        summary.confirm_rate() * 100.0,
        summary.stray_hits
    );
    log::info!(
        "mean rewind {:.1} ms, {} flagged requests, {} audit records ({} dropped)",
        summary.mean_compensation_ms,
        summary.flagged,
        server.audit().len(),
        server.audit().dropped()
    );

    if let Some(path) = &args.audit_out {
        let bytes = server.audit().export()?;
        std::fs::write(path, &bytes).with_context(|| format!("writing {}", path.display()))?;
        log::info!("wrote {} bytes of audit trail to {}", bytes.len(), path.display());
    }

    log::info!("Server shutting down");
    Ok(())
}
