//! Sluice Simulator
//!
//! Drives a Sluice router with a synthetic workload and reports how requests
//! were spread across backends.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use sluice_core::{BackendId, Router};
use tokio::time::Instant;
use tracing::info;

mod chaos;
mod config;
mod workload;

use config::SimConfig;

/// Command-line arguments. Flags override values from the config file.
#[derive(Debug, Parser)]
#[command(name = "sluice-sim", version, about = "Drive the Sluice router with a synthetic workload")]
struct Args {
    /// TOML file with [router], [workload] and optional [chaos] sections
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Total requests to send
    #[arg(long)]
    requests: Option<usize>,

    /// Distinct client ids
    #[arg(long)]
    clients: Option<usize>,

    /// Processing time per request in milliseconds
    #[arg(long)]
    processing_ms: Option<u64>,

    /// Maximum concurrently admitted requests
    #[arg(long)]
    admission_limit: Option<usize>,
}

impl Args {
    fn apply(&self, config: &mut SimConfig) {
        if let Some(requests) = self.requests {
            config.workload.requests = requests;
        }
        if let Some(clients) = self.clients {
            config.workload.clients = clients;
        }
        if let Some(processing_ms) = self.processing_ms {
            config.workload.processing_ms = processing_ms;
        }
        if let Some(limit) = self.admission_limit {
            config.router.admission_limit = limit;
        }
    }
}

/// Loads the simulation config, builds the router, runs the workload and
/// logs the resulting distribution.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sluice_core=info".parse()?)
                .add_directive("sluice_sim=info".parse()?),
        )
        .with_target(true)
        .init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => SimConfig::from_path(path)?,
        None => SimConfig::default(),
    };
    args.apply(&mut config);

    let router = Arc::new(Router::from_config(&config.router)?);
    let requests = workload::generate(&config.workload);
    info!(
        requests = requests.len(),
        clients = config.workload.clients,
        processing_ms = config.workload.processing_ms,
        "starting simulation"
    );

    let chaos = config.chaos.as_ref().map(|chaos| {
        chaos::spawn_chaos(
            router.clone(),
            BackendId(chaos.backend.clone()),
            Duration::from_millis(chaos.interval_ms),
        )
    });

    let start = Instant::now();
    let summary = workload::run(router.clone(), requests).await;
    let elapsed = start.elapsed();

    if let Some(handle) = chaos {
        handle.abort();
    }
    router.close();

    for backend in router.servers().iter() {
        let served = summary.served.get(&backend.id().0).copied().unwrap_or(0);
        info!(
            backend = %backend.id(),
            weight = backend.weight(),
            alive = backend.is_alive(),
            served,
            "backend summary"
        );
    }

    let stats = router.stats();
    info!(
        succeeded = summary.succeeded(),
        unavailable = summary.unavailable,
        failed = summary.failed,
        closed = summary.closed,
        peak_admitted = stats.peak_admitted,
        admission_limit = stats.admission_limit,
        elapsed_ms = elapsed.as_millis() as u64,
        "simulation finished"
    );

    Ok(())
}
