//! pv-migrate
//!
//! Command-line entry point: resolves cluster access, builds a request and
//! hands it to the engine.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use pv_migrate::adapters::{KubeConnector, LoggingEventPublisher};
use pv_migrate::domain::{ClusterAccess, Request, TransferOptions};
use pv_migrate::domain::{DEFAULT_RSYNC_IMAGE, DEFAULT_SSHD_IMAGE};
use pv_migrate::error::Result;
use pv_migrate::migrator::{Engine, EngineConfig, MigrationReport, StrategyRegistry};

// =============================================================================
// CLI Arguments
// =============================================================================

/// Migrate data from one Kubernetes PersistentVolumeClaim to another
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info", global = true)]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON", global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Migrate data from SOURCE to DEST
    #[command(alias = "m")]
    Migrate(MigrateArgs),
}

#[derive(Args, Debug)]
struct MigrateArgs {
    /// Source PersistentVolumeClaim
    source: String,

    /// Destination PersistentVolumeClaim
    dest: String,

    /// Path of the kubeconfig file of the source claim
    #[arg(short = 'k', long)]
    source_kubeconfig: Option<PathBuf>,

    /// Context in the kubeconfig file of the source claim
    #[arg(short = 'c', long)]
    source_context: Option<String>,

    /// Namespace of the source claim
    #[arg(short = 'n', long)]
    source_namespace: Option<String>,

    /// Path of the kubeconfig file of the destination claim
    #[arg(short = 'K', long)]
    dest_kubeconfig: Option<PathBuf>,

    /// Context in the kubeconfig file of the destination claim
    #[arg(short = 'C', long)]
    dest_context: Option<String>,

    /// Namespace of the destination claim
    #[arg(short = 'N', long)]
    dest_namespace: Option<String>,

    /// Delete extraneous files on the destination
    #[arg(short = 'd', long)]
    dest_delete_extraneous_files: bool,

    /// Do not fail if the source or destination claim is mounted
    #[arg(short = 'i', long)]
    ignore_mounted: bool,

    /// Comma-separated list of strategies to try, in order
    #[arg(short = 's', long, value_delimiter = ',')]
    override_strategies: Vec<String>,

    /// Image to use for running rsync
    #[arg(short = 'r', long, default_value = DEFAULT_RSYNC_IMAGE)]
    rsync_image: String,

    /// Image to use for running sshd
    #[arg(short = 'S', long, default_value = DEFAULT_SSHD_IMAGE)]
    sshd_image: String,

    /// How long a provisioned pod or service may take to become ready
    #[arg(long, env = "READINESS_TIMEOUT_SECONDS", default_value = "300")]
    readiness_timeout_seconds: u64,

    /// Report every strategy evaluation, not only executions
    #[arg(short = 'v', long)]
    verbose: bool,

    /// How long the transfer may run
    #[arg(long, env = "TRANSFER_TIMEOUT_MINUTES", default_value = "1440")]
    transfer_timeout_minutes: u64,
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(&cli);

    let result = match cli.command {
        Command::Migrate(args) => migrate(args).await,
    };

    match result {
        Ok(report) => {
            info!(
                "Migration succeeded with {} in {:?}",
                report.strategy, report.duration
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Migration failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn migrate(args: MigrateArgs) -> Result<MigrationReport> {
    let mut connector = KubeConnector::new();

    let source = connector
        .locate(
            &ClusterAccess::new(args.source_kubeconfig, args.source_context),
            args.source_namespace,
            args.source,
        )
        .await?;
    let destination = connector
        .locate(
            &ClusterAccess::new(args.dest_kubeconfig, args.dest_context),
            args.dest_namespace,
            args.dest,
        )
        .await?;

    info!("Source: {} ({})", source, source.access);
    info!("Destination: {} ({})", destination, destination.access);

    let strategies: Vec<String> = args
        .override_strategies
        .iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    let request = Request::new(
        source,
        destination,
        TransferOptions {
            delete_extraneous: args.dest_delete_extraneous_files,
            ignore_mounted: args.ignore_mounted,
        },
    )
    .with_strategies(strategies)
    .with_images(args.rsync_image, args.sshd_image);

    let config = EngineConfig {
        readiness_timeout: Duration::from_secs(args.readiness_timeout_seconds),
        transfer_timeout: Duration::from_secs(args.transfer_timeout_minutes * 60),
        ..Default::default()
    };

    let engine = Engine::new(
        StrategyRegistry::builtin(),
        config,
        Arc::new(LoggingEventPublisher::new(args.verbose)),
    );
    let clusters = connector.into_cluster_set();

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cleaning up");
            interrupt.cancel();
        }
    });

    engine.run(&request, &clusters, &cancel).await
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(cli: &Cli) {
    let level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let directives = format!(
        "{},hyper=warn,kube=info,tower=warn",
        level.as_str().to_lowercase()
    );
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives));

    if cli.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    }
}
