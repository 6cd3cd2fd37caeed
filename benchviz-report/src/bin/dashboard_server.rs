//! benchviz Dashboard Server
//!
//! Serves the configured report pages and re-filters their charts whenever
//! the browser posts a changed form.

use anyhow::{Context, Result};
use benchviz_common::{load_config, logging, ConfigSource, ReportConfig};
use benchviz_report::dashboard::{router, AppState};
use benchviz_report::page::load_pages;
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "benchviz-dashboard")]
#[command(about = "benchviz Benchmark Dashboard Server")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// TOML configuration file; built-in pages and BENCHVIZ_* overrides when absent
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Server bind address, overrides the configured host and port
    #[arg(short, long)]
    bind: Option<SocketAddr>,

    /// Enable development mode (more verbose logging)
    #[arg(long)]
    dev: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the dashboard server
    Serve,
    /// Load every page once and report which ones fail
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.json_logs {
        logging::init_json(cli.dev);
    } else {
        logging::init(cli.dev);
    }

    let source = match &cli.config {
        Some(path) => ConfigSource::File(path.clone()),
        None => ConfigSource::Environment,
    };
    let config = load_config(source).context("Failed to load configuration")?;
    let base = config_base(cli.config.as_deref());

    match cli.command {
        Some(Commands::Serve) | None => serve_dashboard(cli.bind, config, base).await,
        Some(Commands::Check) => check_pages(config, base).await,
    }
}

/// Relative page sources resolve against the config file's directory
fn config_base(config: Option<&std::path::Path>) -> PathBuf {
    config
        .and_then(|path| path.parent())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

async fn serve_dashboard(bind: Option<SocketAddr>, config: ReportConfig, base: PathBuf) -> Result<()> {
    let bind_addr = match bind {
        Some(addr) => addr.to_string(),
        None => config.dashboard.bind_address(),
    };

    let state = AppState::load(config, base).await;
    if state.page_count() == 0 {
        warn!("No page could be loaded; only the index will be served");
    }
    let app = router(state);

    info!("Starting benchviz dashboard on {}", bind_addr);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .context("Failed to bind server")?;

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

async fn check_pages(config: ReportConfig, base: PathBuf) -> Result<()> {
    let pages = load_pages(&config, &base).await;
    for page in &pages {
        let summary = page.summary();
        println!(
            "✅ {} ({}): {} runs, {} charts of {}",
            summary.id, summary.kind, summary.runs, summary.charts, summary.field
        );
    }

    let failed = config.pages.len() - pages.len();
    if failed > 0 {
        anyhow::bail!("{} of {} pages failed to load", failed, config.pages.len());
    }
    Ok(())
}
