//! CLI binary for lnpilot: map the Lightning network and open channels to good peers.

use anyhow::{Context, Result};
use clap::Parser;
use lnpilot_core::config::{PilotConfig, expand_home};
use lnpilot_core::graph::NetworkGraph;
use lnpilot_pilot::{
    AcquireOptions, AllocationExecutor, AllocationReport, Allocator, CrawlOptions, DegreeAllocator,
    DnsSeedResolver, GraphCrawler, PeeringBootstrapper, Strategy, acquire_graph,
};
use lnpilot_rpc::UnixSocketRpc;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(
    name = "lnpilot",
    about = "Autopilot that opens Lightning channels to well-connected nodes"
)]
struct Cli {
    /// Satoshis to spread across the new channels [default: 1000000]
    #[arg(short, long)]
    balance: Option<u64>,

    /// Number of channels to open [default: 21]
    #[arg(short, long)]
    channels: Option<usize>,

    /// Path to the node's JSON-RPC socket [default: ~/.lightning/lightning-rpc]
    #[arg(short = 'r', long = "path-to-rpc-interface")]
    rpc_path: Option<PathBuf>,

    /// Candidate selection strategy: diverse, merge
    #[arg(short, long, default_value = "diverse")]
    strategy: Strategy,

    /// Keep only the top share of each ranking (0.1 and 10 both mean the top 10%)
    #[arg(short, long = "percentile-cutoff")]
    percentile: Option<f64>,

    /// Do not write the crawled graph to disk
    #[arg(short, long)]
    dont_store: bool,

    /// Load the graph from this snapshot instead of crawling (falls back to a crawl if missing)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Where to write the crawled graph (defaults to snapshot.path)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Config file (defaults to ./lnpilot.toml)
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    run(&cli, &config)
}

/// File and env first, then command-line flags on top.
fn load_config(cli: &Cli) -> Result<PilotConfig> {
    let config = match &cli.config {
        Some(path) => {
            if !path.is_file() {
                anyhow::bail!("config file not found: {}", path.display());
            }
            PilotConfig::load_file(path)?
        }
        None => {
            let cwd = std::env::current_dir().context("failed to get current directory")?;
            PilotConfig::load(&cwd)?
        }
    };
    apply_flags(cli, config)
}

fn apply_flags(cli: &Cli, mut config: PilotConfig) -> Result<PilotConfig> {
    if let Some(balance) = cli.balance {
        config.allocation.balance = balance;
    }
    if let Some(channels) = cli.channels {
        config.allocation.channels = channels;
    }
    if let Some(path) = &cli.rpc_path {
        config.rpc.path.clone_from(path);
    }
    config.validate()?;
    Ok(config)
}

fn acquire_options(cli: &Cli, config: &PilotConfig) -> AcquireOptions {
    AcquireOptions {
        input: cli.input.clone(),
        output: cli
            .output
            .clone()
            .unwrap_or_else(|| config.snapshot.path.clone()),
        dont_store: cli.dont_store,
        snapshot: config.snapshot.clone(),
    }
}

fn run(cli: &Cli, config: &PilotConfig) -> Result<()> {
    use indicatif::{ProgressBar, ProgressStyle};

    let rpc_path = expand_home(&config.rpc.path);
    let mut rpc = UnixSocketRpc::connect(&rpc_path)
        .with_context(|| format!("failed to connect to the node at {}", rpc_path.display()))?;

    let crawler = GraphCrawler::new(
        PeeringBootstrapper::new(
            DnsSeedResolver::new(config.bootstrap.domain.clone()),
            Duration::from_millis(config.bootstrap.connect_delay_ms),
        ),
        CrawlOptions {
            poll_interval: Duration::from_millis(config.crawl.poll_interval_ms),
            max_node_polls: config.crawl.max_node_polls,
        },
    );
    let options = acquire_options(cli, config);

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message("Acquiring network graph...");
    spinner.enable_steady_tick(Duration::from_millis(120));
    let acquired = acquire_graph(&mut rpc, &crawler, &options);
    spinner.finish_and_clear();
    let graph = acquired.context("could not obtain the network graph")?;

    print_graph_summary(&graph);

    let allocator = DegreeAllocator {
        min_channel_sat: config.allocation.min_channel_sat,
    };
    let candidates = allocator.find_candidates(
        &graph,
        config.allocation.channels,
        cli.strategy,
        cli.percentile,
    );
    if candidates.is_empty() {
        eprintln!("No channel candidates found; nothing to open.");
        return Ok(());
    }
    eprintln!(
        "Selected {} candidate(s) with the {} strategy",
        candidates.len(),
        cli.strategy
    );

    let report = AllocationExecutor::new(&allocator).connect(
        &mut rpc,
        &graph,
        &candidates,
        config.allocation.balance,
    );
    print_allocation_summary(&report);

    tracing::info!("Autopilot finished");
    Ok(())
}

fn print_graph_summary(graph: &NetworkGraph) {
    eprintln!("\nNetwork graph ready");
    eprintln!("  Nodes: {}", graph.node_count());
    eprintln!("  Channels: {}", graph.edge_count());
}

fn print_allocation_summary(report: &AllocationReport) {
    eprintln!("\nChannel allocation:");
    for open in &report.opened {
        eprintln!("  opened  {} ({} sat)", open.node_id, open.satoshis);
    }
    for failed in &report.failed {
        eprintln!(
            "  failed  {} ({} sat): {}",
            failed.node_id, failed.satoshis, failed.error
        );
    }
    eprintln!(
        "  {}/{} channels opened, {} sat requested",
        report.opened.len(),
        report.attempted(),
        report.total_requested_sat()
    );
}
