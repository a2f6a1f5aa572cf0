//! Waymirror main entry point
//!
//! Command-line interface for rebuilding a browsable local mirror of a
//! website from public web-archive captures.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use waymirror::config::{self, load_config, Config};
use waymirror::mirror::MirrorRunner;

/// Waymirror: offline site reconstruction from web-archive captures
///
/// Discovers every archived capture of a domain, downloads page content and
/// embedded assets, rewrites in-page references to the local copies, and
/// generates an index of everything it saved.
#[derive(Parser, Debug)]
#[command(name = "waymirror")]
#[command(version = "1.0.0")]
#[command(about = "Rebuild a website from web-archive captures", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Domain to mirror (e.g. example.com)
    #[arg(short, long)]
    domain: Option<String>,

    /// Output directory for the reconstructed site
    #[arg(short, long)]
    output: Option<String>,

    /// Earliest capture date (several formats, or a keyword like last_year)
    #[arg(long)]
    start_date: Option<String>,

    /// Latest capture date
    #[arg(long)]
    end_date: Option<String>,

    /// Stop after this many captures
    #[arg(long)]
    max_pages: Option<usize>,

    /// Concurrent downloads (1-12)
    #[arg(short, long)]
    threads: Option<usize>,

    /// Keep only the newest capture of each URL
    #[arg(long)]
    single_version: bool,

    /// Disable the on-disk content cache
    #[arg(long)]
    no_cache: bool,

    /// Pause new downloads while system memory is under pressure
    #[arg(long)]
    safe_memory: bool,

    /// Skip detection of the domain's earliest capture date
    #[arg(long)]
    no_auto_detect: bool,

    /// Per-request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.quiet);

    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            load_config(path)
                .with_context(|| format!("failed to load config {}", path.display()))?
        }
        None => Config::default(),
    };
    apply_cli_overrides(&mut config, &cli);
    config::validate(&mut config).context("invalid configuration")?;

    let output_dir = config.mirror.output_dir.clone();

    // Ctrl-C stops new work from being dispatched; in-flight fetches finish.
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing in-flight work...");
            let _ = shutdown_tx.send(true);
        }
    });

    let outcome = MirrorRunner::new(config, shutdown_rx).run().await?;

    println!("\n=== Mirror Summary ===");
    println!(
        "  Pages saved:     {}/{}",
        outcome.pages_saved, outcome.pages_total
    );
    println!(
        "  Resources saved: {}/{}",
        outcome.resources_saved, outcome.resources_total
    );
    println!(
        "  Indexed:         {} URLs, {} versions",
        outcome.index.urls, outcome.index.pages
    );
    println!("\nOpen {}/index.html in a browser.", output_dir);

    Ok(())
}

/// CLI flags override whatever the config file said.
fn apply_cli_overrides(config: &mut Config, cli: &Cli) {
    if let Some(domain) = &cli.domain {
        config.mirror.domain = domain.clone();
    }
    if let Some(output) = &cli.output {
        config.mirror.output_dir = output.clone();
    }
    if let Some(start) = &cli.start_date {
        config.mirror.start_date = Some(start.clone());
    }
    if let Some(end) = &cli.end_date {
        config.mirror.end_date = Some(end.clone());
    }
    if let Some(max) = cli.max_pages {
        config.mirror.max_pages = Some(max);
    }
    if let Some(threads) = cli.threads {
        config.network.threads = threads;
    }
    if let Some(timeout) = cli.timeout {
        config.network.timeout_secs = timeout;
    }
    if cli.single_version {
        config.mirror.all_versions = false;
    }
    if cli.no_cache {
        config.cache.enabled = false;
    }
    if cli.safe_memory {
        config.memory.safe = true;
    }
    if cli.no_auto_detect {
        config.mirror.auto_detect_date = false;
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("waymirror=info,warn"),
            1 => EnvFilter::new("waymirror=debug,info"),
            2 => EnvFilter::new("waymirror=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}
