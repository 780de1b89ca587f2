mod remote;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use darkroom_config::{ConfigLoad, ConfigLoader, ConfigLoaderOptions, apply_guard_rails};
use darkroom_core::{GatherConfig, Orchestrator, RunReport, SidecarInventory};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::remote::Remote;

/// CLI entry point
#[derive(Parser, Debug)]
#[command(name = "darkroomctl")]
#[command(about = "Mirror a photo catalog into local thumbnails and metadata sidecars")]
struct Cli {
    /// Config file (TOML, or JSON with a .json extension)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Environment file to load before reading DARKROOM_* variables
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run one reconciliation pass against a remote
    Gather(GatherArgs),
    /// List the metadata sidecars present under the base directory
    Sidecars(SidecarArgs),
}

#[derive(Debug, Args)]
struct GatherArgs {
    /// Remote store, e.g. dir:///mnt/bucket
    remote: Remote,

    /// Local base directory (overrides config)
    #[arg(long)]
    base_dir: Option<PathBuf>,

    /// Maximum simultaneously active asset tasks (overrides config)
    #[arg(long)]
    concurrency: Option<usize>,

    /// Catalog prefix to enumerate (overrides config)
    #[arg(long)]
    prefix: Option<String>,

    /// Catalog page size (overrides config)
    #[arg(long)]
    page_size: Option<usize>,
}

#[derive(Debug, Args)]
struct SidecarArgs {
    /// Local base directory (overrides config)
    #[arg(long)]
    base_dir: Option<PathBuf>,

    /// Print one JSON document instead of a table
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                // Per-asset chatter stays at debug; override via RUST_LOG.
                "info,gather::page=info,gather::summary=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = load_config(&cli)?;

    match cli.command {
        Command::Gather(args) => run_gather(config, args).await,
        Command::Sidecars(args) => run_sidecars(config, args).await,
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<GatherConfig> {
    let ConfigLoad {
        config,
        source,
        env_overrides,
        warnings,
    } = ConfigLoader::with_options(ConfigLoaderOptions {
        config_path: cli.config.clone(),
        env_file: cli.env_file.clone(),
        working_dir: None,
    })
    .load()
    .context("failed to load configuration")?;

    match source.path() {
        Some(path) => info!(path = %path.display(), ?source, "configuration loaded"),
        None => info!("no config file; using defaults"),
    }
    if !env_overrides.is_empty() {
        info!(overrides = ?env_overrides, "environment overrides applied");
    }
    for warning in &warnings.items {
        match &warning.hint {
            Some(hint) => {
                warn!(message = %warning.message, hint = %hint, "configuration warning")
            }
            None => warn!(message = %warning.message, "configuration warning"),
        }
    }

    Ok(config)
}

async fn run_gather(mut config: GatherConfig, args: GatherArgs) -> anyhow::Result<()> {
    if let Some(base_dir) = args.base_dir {
        config.base_dir = base_dir;
    }
    if let Some(concurrency) = args.concurrency {
        config.max_concurrent_assets = concurrency;
    }
    if let Some(prefix) = args.prefix {
        config.prefix = prefix;
    }
    if let Some(page_size) = args.page_size {
        config.page_size = page_size;
    }
    apply_guard_rails(&config).context("invalid command-line overrides")?;

    let store = args.remote.connect();
    let orchestrator = Orchestrator::new(Arc::new(config), store.clone(), store);

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received; settling in-flight assets");
            on_signal.cancel();
        }
    });

    info!(remote = %args.remote, "gather starting");
    let report = orchestrator
        .run(cancel)
        .await
        .with_context(|| format!("gather against {} aborted", args.remote))?;

    print_report(&report);
    Ok(())
}

fn print_report(report: &RunReport) {
    println!("pages:                {}", report.pages);
    println!("assets seen:          {}", report.assets_seen);
    println!("  completed:          {}", report.completed);
    println!("  skipped:            {}", report.skipped);
    println!("  failed:             {}", report.failed.len());
    println!("  interrupted:        {}", report.interrupted);
    println!("sources fetched:      {}", report.fetched);
    println!("thumbnails generated: {}", report.thumbnails_generated);
    println!("metadata copied:      {}", report.metadata_copied);
    println!("metadata unresolved:  {}", report.metadata_unresolved.len());
    println!("peak active tasks:    {}", report.peak_active_tasks);

    if !report.failed.is_empty() {
        println!("Failures:");
        for failure in &report.failed {
            println!("  - {} [{}]: {}", failure.asset, failure.stage, failure.message);
        }
    }
    if report.cancelled {
        println!("Run was cancelled; rerun to finish the remaining assets.");
    }
}

async fn run_sidecars(mut config: GatherConfig, args: SidecarArgs) -> anyhow::Result<()> {
    if let Some(base_dir) = args.base_dir {
        config.base_dir = base_dir;
    }

    let inventory = SidecarInventory::new(config.layout().metadata_dir());
    let entries = tokio::task::spawn_blocking(move || inventory.scan())
        .await
        .context("sidecar scan task failed")?;

    if args.json {
        let documents: Vec<_> = entries
            .iter()
            .map(|entry| match &entry.sidecar {
                Ok(sidecar) => serde_json::json!({ "asset": entry.asset, "sidecar": sidecar }),
                Err(err) => serde_json::json!({ "asset": entry.asset, "error": err.to_string() }),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&documents)?);
        return Ok(());
    }

    for entry in &entries {
        match &entry.sidecar {
            Ok(sidecar) => println!(
                "{}\t{}\t{}\t{}",
                entry.asset,
                sidecar.camera().unwrap_or_else(|| "-".into()),
                sidecar
                    .date_time_original
                    .as_deref()
                    .unwrap_or("-"),
                sidecar
                    .rating
                    .map(|r| r.to_string())
                    .unwrap_or_else(|| "-".into()),
            ),
            Err(err) => println!("{}\tunreadable: {err}", entry.asset),
        }
    }
    info!(count = entries.len(), "sidecars listed");
    Ok(())
}
