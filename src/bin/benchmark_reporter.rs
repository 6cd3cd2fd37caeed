//! benchviz Benchmark Report Generator
//!
//! Renders the configured pages to static HTML, or appends a fresh harness
//! output file to a history file.

use anyhow::{bail, Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::path::{Path, PathBuf};

use benchviz::common::{load_config, logging, ConfigSource};
use benchviz::report::{append_run, load_pages, ReportGenerator};

fn cli() -> Command {
    Command::new("benchviz Benchmark Reporter")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Renders benchmark history JSON into interactive chart pages")
        .subcommand_required(true)
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable debug logging")
                .global(true)
                .action(ArgAction::SetTrue),
        )
        .subcommand(
            Command::new("render")
                .about("Write every configured page as static HTML")
                .arg(
                    Arg::new("config")
                        .short('c')
                        .long("config")
                        .value_name("FILE")
                        .help("TOML configuration; built-in pages and BENCHVIZ_* overrides when absent"),
                )
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .value_name("DIR")
                        .help("Output directory for HTML pages"),
                )
                .arg(
                    Arg::new("title")
                        .short('t')
                        .long("title")
                        .value_name("TITLE")
                        .help("Report title"),
                )
                .arg(
                    Arg::new("page")
                        .short('p')
                        .long("page")
                        .value_name("ID")
                        .help("Only render these pages")
                        .action(ArgAction::Append),
                )
                .arg(
                    Arg::new("exclude")
                        .short('x')
                        .long("exclude")
                        .value_name("GROUP=VALUE")
                        .help("Uncheck a control before rendering, e.g. layout=Sparse or size=0")
                        .action(ArgAction::Append),
                ),
        )
        .subcommand(
            Command::new("append")
                .about("Append a benchmark run to a history file")
                .arg(
                    Arg::new("history")
                        .long("history")
                        .value_name("FILE")
                        .help("History file, created when missing")
                        .required(true),
                )
                .arg(
                    Arg::new("run")
                        .long("run")
                        .value_name("FILE")
                        .help("Google Benchmark JSON output of one run")
                        .required(true),
                ),
        )
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    logging::init(matches.get_flag("verbose"));

    match matches.subcommand() {
        Some(("render", args)) => render(args).await,
        Some(("append", args)) => append(args).await,
        _ => bail!("no subcommand given"),
    }
}

/// Split `group=value` pairs given with `--exclude`
fn parse_exclusions(values: Vec<&String>) -> Result<Vec<(String, String)>> {
    values
        .into_iter()
        .map(|pair| match pair.split_once('=') {
            Some((group, value)) if !group.is_empty() => Ok((group.to_string(), value.to_string())),
            _ => bail!("invalid exclusion {:?}, expected GROUP=VALUE", pair),
        })
        .collect()
}

async fn render(args: &ArgMatches) -> Result<()> {
    let config_path = args.get_one::<String>("config").map(PathBuf::from);
    let source = match &config_path {
        Some(path) => ConfigSource::File(path.clone()),
        None => ConfigSource::Environment,
    };
    let mut config = load_config(source).context("Failed to load configuration")?;

    if let Some(output) = args.get_one::<String>("output") {
        config.output_dir = PathBuf::from(output);
    }
    if let Some(title) = args.get_one::<String>("title") {
        config.title = title.clone();
    }
    if let Some(ids) = args.get_many::<String>("page") {
        let ids: Vec<&String> = ids.collect();
        config.pages.retain(|page| ids.contains(&&page.id));
        if config.pages.is_empty() {
            bail!("none of the requested pages are configured");
        }
    }
    let exclusions = parse_exclusions(args.get_many::<String>("exclude").map(|v| v.collect()).unwrap_or_default())?;

    println!("🚀 benchviz Reporter Starting...");
    println!("📊 Output Directory: {}", config.output_dir.display());

    let base = config_path
        .as_deref()
        .and_then(Path::parent)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));

    println!("📁 Loading {} pages...", config.pages.len());
    let mut pages = load_pages(&config, &base).await;
    if pages.is_empty() {
        bail!("no page could be loaded");
    }

    println!("🔨 Generating HTML pages...");
    let generator = ReportGenerator::new(config);
    let written = generator
        .generate(&mut pages, &exclusions)
        .context("Failed to generate report")?;

    for path in &written {
        println!("  📄 {}", path.display());
    }
    println!(
        "✅ Open {}/index.html in your browser to view the report",
        generator.output_dir().display()
    );
    Ok(())
}

async fn append(args: &ArgMatches) -> Result<()> {
    let (Some(history), Some(run)) = (
        args.get_one::<String>("history"),
        args.get_one::<String>("run"),
    ) else {
        bail!("--history and --run are required");
    };

    let history = append_run(Path::new(history), Path::new(run))
        .await
        .with_context(|| format!("Failed to append {} to {}", run, history))?;
    println!("✅ History now holds {} runs", history.len());
    Ok(())
}
