//! fleetscaled — the fleetscale daemon.
//!
//! Single binary that assembles the autoscaling control loop:
//! - Configuration (fleetscale.toml)
//! - Debounce-state store
//! - Provider backend
//! - Decision loop
//! - Telemetry intake API
//! - Load-balancer refresh
//!
//! # Usage
//!
//! ```text
//! fleetscaled run --config fleetscale.toml --provider digitalocean
//! fleetscaled check --config fleetscale.toml --provider digitalocean
//! fleetscaled report --endpoint http://10.0.0.10:9100 --interval 60
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use fleetscale_autoscale::{Autoscaler, FleetNaming};
use fleetscale_balancer::Balancer;
use fleetscale_core::{FleetConfig, ProviderIdentity};
use fleetscale_provider::Backend;
use fleetscale_state::DebounceStore;
use fleetscaled::intake::{self, IntakeState};
use fleetscaled::refresh::FleetRefresher;
use fleetscaled::report::{self, Reporter};
use tokio::sync::{mpsc, watch};
use tracing::{error, info, info_span};

#[derive(Parser)]
#[command(
    name = "fleetscaled",
    about = "fleetscale: CPU-driven horizontal autoscaler",
    version,
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the decision loop and the telemetry intake.
    Run {
        /// Path to the TOML configuration file.
        #[arg(short, long, default_value = "fleetscale.toml")]
        config: PathBuf,

        /// Hosting provider being scaled (currently only: digitalocean).
        #[arg(short = 'p', long)]
        provider: ProviderIdentity,

        /// Override the intake listen address from the config.
        #[arg(short, long)]
        listen: Option<SocketAddr>,
    },
    /// Validate the configuration and show the current fleet.
    Check {
        #[arg(short, long, default_value = "fleetscale.toml")]
        config: PathBuf,

        #[arg(short = 'p', long)]
        provider: ProviderIdentity,

        /// Also query the provider for current fleet members.
        #[arg(long)]
        list: bool,
    },
    /// Sample local CPU idle percentage and send it to the intake.
    Report {
        /// Base URL of the intake, e.g. http://10.0.0.10:9100
        #[arg(short, long)]
        endpoint: String,

        /// Hostname to report as (default: this machine's hostname).
        #[arg(long)]
        host: Option<String>,

        /// Keep reporting every N seconds instead of reporting once.
        #[arg(short, long)]
        interval: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("info,fleetscaled=debug,fleetscale=debug")
            }),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            config,
            provider,
            listen,
        } => run(&config, provider, listen).await,
        Command::Check {
            config,
            provider,
            list,
        } => check(&config, provider, list).await,
        Command::Report {
            endpoint,
            host,
            interval,
        } => report(&endpoint, host, interval).await,
    }
}

async fn run(
    config_path: &Path,
    provider: ProviderIdentity,
    listen: Option<SocketAddr>,
) -> anyhow::Result<()> {
    info!(%provider, config = ?config_path, "fleetscale daemon starting");

    // ── Initialize subsystems ──────────────────────────────────

    let config = FleetConfig::from_file(config_path)?;
    let naming = FleetNaming::new(config.naming(provider)?.clone())?;

    let store = DebounceStore::open(&config.state.path)?;
    info!(path = ?config.state.path, "debounce store opened");

    let backend = Arc::new(Backend::from_config(provider, &config)?);
    info!(%provider, "provider backend initialized");

    let balancer = config.balancer.clone().map(Balancer::new);
    if balancer.is_none() {
        info!("no [balancer] section, fleet changes will only be logged");
    }
    let refresher = FleetRefresher::new(Arc::clone(&backend), naming.clone(), balancer);

    let autoscaler = Autoscaler::new(config.global.clone(), naming, store.clone(), backend)
        .with_span(info_span!("autoscaler", %provider))
        .with_on_scaled(refresher.into_callback());

    // ── Shutdown signal ────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ── Decision loop ──────────────────────────────────────────

    let (events_tx, events_rx) = mpsc::channel(config.intake.queue_depth);
    let autoscale_handle = tokio::spawn(async move {
        autoscaler.run(events_rx, shutdown_rx).await;
    });

    // ── Start intake server ────────────────────────────────────

    let router = intake::build_router(IntakeState {
        events: events_tx,
        store,
    });
    let addr = listen.unwrap_or(config.intake.listen);
    info!(%addr, "telemetry intake starting");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Graceful shutdown on Ctrl-C.
    let server = axum::serve(listener, router).with_graceful_shutdown(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for shutdown signal");
        }
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    server.await?;

    // Let the decision loop finish the event in hand.
    let _ = autoscale_handle.await;

    info!("fleetscale daemon stopped");
    Ok(())
}

async fn check(config_path: &Path, provider: ProviderIdentity, list: bool) -> anyhow::Result<()> {
    let config = FleetConfig::from_file(config_path)?;
    let naming = FleetNaming::new(config.naming(provider)?.clone())?;
    let backend = Backend::from_config(provider, &config)?;

    let g = &config.global;
    println!("configuration ok: {}", config_path.display());
    println!(
        "  servers: {}..{}  cpu band: {}%..{}%  dwell: {}s",
        g.min_servers, g.max_servers, g.min_cpu_utilization, g.max_cpu_utilization, g.time_threshold
    );
    println!("  naming:  {}", naming.name_for(1));
    println!("  state:   {}", config.state.path.display());

    if list {
        let refresher = FleetRefresher::new(backend, naming, None);
        let targets = refresher.current_targets().await?;
        println!("  fleet:   {} backends", targets.len());
        for target in targets {
            println!("    {:<40} {}", target.name, target.address);
        }
    }

    Ok(())
}

async fn report(endpoint: &str, host: Option<String>, interval: Option<u64>) -> anyhow::Result<()> {
    let host = match host {
        Some(host) => host,
        None => report::local_hostname().await?,
    };
    let reporter = Reporter::new(endpoint, host)?;

    match interval {
        Some(secs) => {
            reporter.run(Duration::from_secs(secs.max(1))).await;
            Ok(())
        }
        None => {
            reporter.report_once().await?;
            Ok(())
        }
    }
}
