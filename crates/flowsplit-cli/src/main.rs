//! `flowsplit` command line
//!
//! Replays recorded model responses through a decomposition session and
//! prints the resulting tree, layout, or test-case mind map.

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use flowsplit_core::{DecompositionSession, ReplayBackend, SessionConfig};
use flowsplit_tree::DecompositionTree;
use serde::Serialize;
use std::fmt::Write;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    Command::new("flowsplit")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Stream model output into a weighted task tree")
        .subcommand_required(true)
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .global(true)
                .help("Log filter, e.g. debug or flowsplit_core=trace (overrides RUST_LOG)"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines"),
        )
        .subcommand(
            Command::new("replay")
                .about("Decompose --input using a recorded workflow response")
                .arg(
                    Arg::new("transcript")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("File holding the raw model response"),
                )
                .arg(
                    Arg::new("input")
                        .long("input")
                        .required(true)
                        .help("Text of the work item to decompose"),
                )
                .arg(
                    Arg::new("chunk-size")
                        .long("chunk-size")
                        .default_value("16")
                        .value_parser(value_parser!(usize))
                        .help("Characters per replayed fragment (0 = whole response)"),
                )
                .arg(
                    Arg::new("config")
                        .long("config")
                        .value_parser(value_parser!(PathBuf))
                        .help("Session configuration TOML"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output report, tree and layout as JSON"),
                ),
        )
        .subcommand(
            Command::new("test-cases")
                .about("Parse a recorded test-case response into a mind map")
                .arg(
                    Arg::new("transcript")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("File holding the raw model response"),
                )
                .arg(
                    Arg::new("input")
                        .long("input")
                        .default_value("test scope")
                        .help("Description of what is under test"),
                )
                .arg(
                    Arg::new("config")
                        .long("config")
                        .value_parser(value_parser!(PathBuf))
                        .help("Session configuration TOML"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output cases and mind map as JSON"),
                ),
        )
}

fn init_tracing(level: Option<&String>, json: bool) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(args: &ArgMatches) -> Result<SessionConfig> {
    match args.get_one::<PathBuf>("config") {
        Some(path) => SessionConfig::load(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(SessionConfig::default()),
    }
}

async fn read_transcript(args: &ArgMatches) -> Result<String> {
    let path = args
        .get_one::<PathBuf>("transcript")
        .context("transcript path missing")?;
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading transcript {}", path.display()))?;
    tracing::debug!(path = %path.display(), bytes = text.len(), "transcript loaded");
    Ok(text)
}

/// Indented tree with percentage weights
fn render_weighted(tree: &DecompositionTree) -> String {
    let mut out = String::new();
    if let Some(root) = tree.root() {
        for node in root {
            let _ = writeln!(
                out,
                "{}{} ({:.1}%)",
                "  ".repeat(node.depth()),
                node.label(),
                node.weight() * 100.0
            );
        }
    }
    out
}

#[derive(Serialize)]
struct ReplayOutput<'a> {
    report: &'a flowsplit_core::DecompositionReport,
    tree: Option<&'a flowsplit_tree::DecompositionNode>,
    layout: flowsplit_tree::LayoutGraph,
}

async fn run_replay(args: &ArgMatches) -> Result<()> {
    let config = load_config(args)?;
    let transcript = read_transcript(args).await?;
    let input = args.get_one::<String>("input").context("--input missing")?;
    let chunk_size = args.get_one::<usize>("chunk-size").copied().unwrap_or(16);

    let session = DecompositionSession::new(config)?;
    let backend = ReplayBackend::new(chunk_size).with_transcript(transcript);
    let report = session.start(input, &backend).await?;

    let tree = session.snapshot();
    if args.get_flag("json") {
        let output = ReplayOutput {
            report: &report,
            tree: tree.root(),
            layout: session.layout(None),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print!("{}", render_weighted(&tree));
        if report.adjusted {
            println!(
                "(ratios summed to {:.3}; rescaled to 1)",
                report.original_sum
            );
        }
        if report.malformed > 0 {
            println!("({} malformed records skipped)", report.malformed);
        }
    }
    Ok(())
}

async fn run_test_cases(args: &ArgMatches) -> Result<()> {
    let config = load_config(args)?;
    let transcript = read_transcript(args).await?;
    let input = args.get_one::<String>("input").context("--input missing")?;

    let session = DecompositionSession::new(config)?;
    let backend = ReplayBackend::new(0).with_transcript(transcript);
    let report = session.generate_test_cases(input, &backend).await?;

    if args.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report.mind_map.render());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    init_tracing(
        matches.get_one::<String>("log-level"),
        matches.get_flag("log-json"),
    );

    match matches.subcommand() {
        Some(("replay", args)) => run_replay(args).await,
        Some(("test-cases", args)) => run_test_cases(args).await,
        _ => unreachable!("subcommand is required"),
    }
}
