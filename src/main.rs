use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use gate_tracker::config::{Config, ConfigOverrides};
use gate_tracker::output::csv::status_to_csv;
use gate_tracker::output::json::render_json;
use gate_tracker::output::table::{render_discovered_table, render_status_table};
use gate_tracker::reconcile::reconcile;
use gate_tracker::resolver::rpc::RpcResolver;
use gate_tracker::resolver::{ActivationResolver, FeatureAccount};
use gate_tracker::schedule::proposals::{fill_missing_links, ProposalLinks};
use gate_tracker::schedule::wiki::WikiScheduleSource;
use gate_tracker::schedule::ScheduleSource;
use gate_tracker::store::schema::FeatureRecord;
use gate_tracker::store::FeatureStore;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

#[derive(Debug, Parser)]
#[command(
    name = "gate-tracker",
    about = "Feature-gate rollout tracking across Solana clusters"
)]
struct Cli {
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Path of the feature store JSON file
    #[arg(short, long)]
    store: Option<PathBuf>,
    #[arg(short, long)]
    rpc: Option<String>,
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Pull the schedule source and reconcile it into the local store
    Sync {
        /// Skip the SIMD proposal link lookup
        #[arg(long)]
        skip_links: bool,
    },
    /// Resolve mainnet activation epochs from on-chain feature accounts
    Resolve {
        /// Query every unresolved feature, not just those already through
        /// devnet and testnet
        #[arg(long)]
        all: bool,
    },
    /// Show the tracked feature set
    Status {
        /// Only features without a mainnet activation epoch
        #[arg(long)]
        unresolved: bool,
    },
    Config {
        #[arg(long)]
        init: bool,
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load(Some(&config_path))?;
    config.apply_overrides(ConfigOverrides {
        store_path: cli
            .store
            .as_ref()
            .map(|p| p.to_string_lossy().into_owned()),
        rpc_url: cli.rpc.clone(),
    });

    if let Commands::Config { init, show } = &cli.command {
        return handle_config_command(*init, *show, &config, &config_path);
    }

    let store = FeatureStore::new(config.resolved_store_path());
    match &cli.command {
        Commands::Sync { skip_links } => run_sync(&config, &store, *skip_links, cli.output).await,
        Commands::Resolve { all } => run_resolve(&config, &store, *all).await,
        Commands::Status { unresolved } => run_status(&store, *unresolved, cli.output),
        Commands::Config { .. } => unreachable!("config command handled before dispatch"),
    }
}

fn handle_config_command(
    init: bool,
    show: bool,
    config: &Config,
    config_path: &PathBuf,
) -> Result<()> {
    if init {
        Config::write_template(config_path)?;
        println!("Wrote config template to {}", config_path.display());
    }
    if show || !init {
        println!("{}", render_json(config)?);
    }
    Ok(())
}

async fn run_sync(
    config: &Config,
    store: &FeatureStore,
    skip_links: bool,
    output: OutputFormat,
) -> Result<()> {
    let source = WikiScheduleSource::new(config.schedule.wiki_url.clone());
    let batch = source.fetch_candidates().await?;
    info!(
        source = %batch.source_url,
        hash = %batch.raw_hash,
        rows = batch.candidates.len(),
        "fetched schedule"
    );

    let persisted = store.load()?;
    let mut outcome = reconcile(persisted, batch.candidates);

    if !skip_links {
        match ProposalLinks::fetch(&config.proposals.api_url).await {
            Ok(links) => {
                let filled = fill_missing_links(&mut outcome.updated, &links);
                if filled > 0 {
                    info!(filled, known = links.len(), "resolved proposal links");
                }
            }
            Err(error) => warn!("proposal link fetch failed, leaving links as-is: {error}"),
        }
    }

    if outcome.newly_discovered.is_empty() {
        info!("no new features discovered");
    } else {
        println!("New features:");
        match output {
            OutputFormat::Table => {
                println!("{}", render_discovered_table(&outcome.newly_discovered));
            }
            OutputFormat::Json => println!("{}", render_json(&outcome.newly_discovered)?),
            OutputFormat::Csv => println!("{}", status_to_csv(&outcome.newly_discovered)?),
        }
    }

    store.save(&outcome.updated)?;
    info!(
        total = outcome.updated.len(),
        new = outcome.newly_discovered.len(),
        path = %store.path().display(),
        "feature store updated"
    );
    Ok(())
}

async fn run_resolve(config: &Config, store: &FeatureStore, all: bool) -> Result<()> {
    let mut records = store.load()?;
    let resolver = RpcResolver::new(config.rpc.url.clone());
    let schedule = resolver.get_epoch_schedule().await?;

    let mut resolved = 0usize;
    let mut failures = 0usize;
    for record in &mut records {
        if !wants_resolution(record, all) {
            continue;
        }
        info!(key = %record.key, "fetching feature account");
        let data = match resolver.get_account_data(&record.key).await {
            Ok(data) => data,
            Err(error) => {
                warn!(key = %record.key, "account fetch failed: {error}");
                failures += 1;
                continue;
            }
        };
        let Some(data) = data else {
            info!(key = %record.key, "feature account not found, still pending");
            continue;
        };
        match FeatureAccount::from_bytes(&data) {
            Ok(account) => match account.effective_epoch(&schedule) {
                Some(epoch) => {
                    info!(key = %record.key, epoch, "mainnet activation resolved");
                    record.mainnet_activation_epoch = Some(epoch);
                    resolved += 1;
                }
                None => info!(key = %record.key, "initialized but not activated"),
            },
            Err(error) => {
                warn!(key = %record.key, "malformed feature account: {error}");
                failures += 1;
            }
        }
    }

    store.save(&records)?;
    info!(resolved, failures, "resolution pass complete");
    Ok(())
}

/// A feature is worth an RPC round-trip once it has cleared devnet and
/// testnet; `--all` widens the pass to every unresolved record.
fn wants_resolution(record: &FeatureRecord, all: bool) -> bool {
    if record.mainnet_activation_epoch.is_some() {
        return false;
    }
    all || (record.devnet_activation_epoch.is_some() && record.testnet_activation_epoch.is_some())
}

fn run_status(store: &FeatureStore, unresolved: bool, output: OutputFormat) -> Result<()> {
    let mut records = store.load()?;
    if unresolved {
        records.retain(|r| r.mainnet_activation_epoch.is_none());
    }
    match output {
        OutputFormat::Table => println!("{}", render_status_table(&records)),
        OutputFormat::Json => println!("{}", render_json(&records)?),
        OutputFormat::Csv => println!("{}", status_to_csv(&records)?),
    }
    Ok(())
}
