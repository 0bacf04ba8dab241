//! `livepatch` command line: replay recorded responses and diff pages

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use livepatch_artifact::{Unit, UnitCollection, UnitIntent};
use livepatch_core::{from_chunks, PipelineConfig, SessionMode, SessionReport, StreamOrchestrator};
use livepatch_diff::compute_changed_ranges;
use livepatch_render::MemoryDocument;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Serialize)]
struct ReplayOutput<'a> {
    report: &'a SessionReport,
    error: Option<String>,
    units: Vec<&'a Unit>,
}

fn cli() -> Command {
    Command::new("livepatch")
        .version(livepatch_core::VERSION)
        .about("Stream LLM output into live, incrementally patched pages")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML pipeline configuration"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines on stderr"),
        )
        .subcommand(
            Command::new("replay")
                .about("Feed a recorded response through the orchestrator and print a JSON report")
                .arg(
                    Arg::new("transcript")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Recorded model response"),
                )
                .arg(
                    Arg::new("page")
                        .long("page")
                        .value_parser(value_parser!(PathBuf))
                        .help("Current page to patch"),
                )
                .arg(
                    Arg::new("path")
                        .long("path")
                        .help("Unit path of the page (defaults to the configured page path)"),
                )
                .arg(
                    Arg::new("chunk-size")
                        .long("chunk-size")
                        .default_value("64")
                        .value_parser(value_parser!(usize))
                        .help("Chars per replayed chunk"),
                )
                .arg(
                    Arg::new("mode")
                        .long("mode")
                        .value_parser(["delta", "pages"])
                        .help("Override the configured session mode"),
                )
                .arg(
                    Arg::new("html-out")
                        .long("html-out")
                        .value_parser(value_parser!(PathBuf))
                        .help("Write the patched page here"),
                ),
        )
        .subcommand(
            Command::new("diff")
                .about("Print changed-line ranges of NEW relative to OLD")
                .arg(
                    Arg::new("old")
                        .required(true)
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("new")
                        .required(true)
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                ),
        )
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(matches: &ArgMatches) -> Result<PipelineConfig> {
    match matches.get_one::<PathBuf>("config") {
        Some(path) => PipelineConfig::load(path).context("loading configuration"),
        None => Ok(PipelineConfig::default()),
    }
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

/// Split into chunks of `size` chars
fn chunk(text: &str, size: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(size.max(1))
        .map(|c| c.iter().collect())
        .collect()
}

async fn replay(mut config: PipelineConfig, args: &ArgMatches) -> Result<bool> {
    if let Some(mode) = args.get_one::<String>("mode") {
        config.mode = if mode == "pages" {
            SessionMode::Pages
        } else {
            SessionMode::Delta
        };
    }
    let transcript_path = args
        .get_one::<PathBuf>("transcript")
        .context("transcript path is required")?;
    let transcript = read(transcript_path)?;
    let chunk_size = args.get_one::<usize>("chunk-size").copied().unwrap_or(64);
    let path = args
        .get_one::<String>("path")
        .cloned()
        .unwrap_or_else(|| config.default_page_path.clone());

    let mut units = UnitCollection::new();
    let document = match args.get_one::<PathBuf>("page") {
        Some(page_path) => {
            let page = read(page_path)?;
            units.upsert(Unit::new(path.as_str(), page.as_str(), UnitIntent::Title));
            MemoryDocument::from_html(&page)
        }
        None => MemoryDocument::new(),
    };

    let mut orchestrator = StreamOrchestrator::new(config, document).with_units(units);
    let chunks = chunk(&transcript, chunk_size);
    tracing::info!(chunks = chunks.len(), path = %path, "replaying transcript");

    let result = orchestrator
        .run(from_chunks(chunks), Some(&path), |progress| {
            tracing::debug!(
                chars = progress.chars,
                tokens = progress.approx_tokens,
                applied = progress.applied,
                "progress"
            );
        })
        .await;

    let report = orchestrator
        .last_report()
        .context("session produced no report")?;
    let output = ReplayOutput {
        report,
        error: result.as_ref().err().map(ToString::to_string),
        units: orchestrator.units().iter().collect(),
    };
    println!("{}", serde_json::to_string_pretty(&output)?);

    if let Some(out) = args.get_one::<PathBuf>("html-out") {
        std::fs::write(out, orchestrator.target().render_html())
            .with_context(|| format!("writing {}", out.display()))?;
    }
    Ok(result.is_ok())
}

fn diff(args: &ArgMatches) -> Result<()> {
    let old_path = args.get_one::<PathBuf>("old").context("old path is required")?;
    let new_path = args.get_one::<PathBuf>("new").context("new path is required")?;
    let ranges = compute_changed_ranges(&read(old_path)?, &read(new_path)?);

    if args.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&ranges)?);
    } else {
        for range in &ranges {
            println!("{range}");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("log-json"));
    let config = load_config(&matches)?;

    match matches.subcommand() {
        Some(("replay", args)) => {
            if !replay(config, args).await? {
                std::process::exit(1);
            }
        }
        Some(("diff", args)) => diff(args)?,
        _ => unreachable!("subcommand is required"),
    }
    Ok(())
}
