//! Statecraft - Headless Game Host

use std::path::PathBuf;

use clap::Parser;
use statecraft_server::{build_engine, Scheduler, ServerConfig, TickOutcome};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "statecraft-server")]
#[command(about = "Run a Statecraft game headless")]
struct Cli {
    /// Engine configuration (RON)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Scenario to load (RON)
    #[arg(long)]
    scenario: Option<PathBuf>,
    /// Override the configured tick interval, in milliseconds
    #[arg(long)]
    tick_interval_ms: Option<u64>,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    tracing::info!("Starting Statecraft host");

    let cli = Cli::parse();
    let config = ServerConfig {
        config_path: cli.config,
        scenario_path: cli.scenario,
        ..ServerConfig::default()
    };

    let mut engine = match build_engine(&config) {
        Ok(engine) => engine,
        Err(e) => {
            tracing::error!("Failed to set up game: {e}");
            std::process::exit(1);
        }
    };
    if let Some(ms) = cli.tick_interval_ms {
        engine.set_tick_interval(ms);
    }
    tracing::info!("Tick interval {}ms", engine.tick_interval_ms());

    let mut scheduler = Scheduler::with_capacity(engine, config.event_capacity);
    let mut events = scheduler.subscribe();
    let reporter = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => match event.outcome {
                    TickOutcome::Update(snapshot) => tracing::info!(
                        tick = event.tick,
                        pending = snapshot.diplomacy.pending_actions.len(),
                        projects = snapshot.research.active_projects.len(),
                        "tick"
                    ),
                    TickOutcome::Fault(fault) => tracing::warn!("{fault}"),
                },
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("event reporter lagged and skipped {skipped} event(s)");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    scheduler.start();
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
    }
    scheduler.stop();
    scheduler.join().await;
    drop(scheduler);
    let _ = reporter.await;
}
