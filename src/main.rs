//! Trustscore: heuristic trust scoring for LLM outputs (CLI)

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde_json::Value;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use trustscore::analyzer::patterns::RuleBook;
use trustscore::analyzer::registry::registry_with_rules;
use trustscore::batch::{self, DEFAULT_PARALLELISM};
use trustscore::config::load_config;
use trustscore::reporter::{ConsoleReporter, JsonReporter};
use trustscore::{global_engine, GuardEngine};

/// Exit code for unreadable or missing input
const EXIT_INPUT_ERROR: u8 = 2;
/// Exit code when the score is below `--threshold`
const EXIT_BELOW_THRESHOLD: u8 = 3;

/// Trustscore: heuristic trust scoring for LLM outputs
#[derive(Parser, Debug)]
#[command(name = "trustscore")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Score a single output read from a file or stdin
    Check {
        /// File containing the output (text or JSON)
        #[arg(long, conflicts_with = "stdin")]
        file: Option<PathBuf>,

        /// Read the output from stdin
        #[arg(long)]
        stdin: bool,

        /// Minimum score threshold (exit 3 if below)
        #[arg(long, short)]
        threshold: Option<u8>,

        /// Output format as JSON
        #[arg(long, short)]
        json: bool,

        /// Include summary, metadata and issue locations
        #[arg(long, short)]
        verbose: bool,

        /// Path to config file (default: search .trustscorerc.json in current dir and parents)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Rule file replacing the bundled rules
        #[arg(long)]
        rules: Option<PathBuf>,
    },

    /// Score every line of a JSON Lines file
    Batch {
        /// Input file, one JSON value per line
        #[arg(long)]
        file: PathBuf,

        /// Write `{"id", "report"}` lines to this file
        #[arg(long)]
        out: Option<PathBuf>,

        /// Number of worker threads
        #[arg(long, value_name = "N", default_value_t = DEFAULT_PARALLELISM)]
        parallel: usize,

        /// Path to config file (default: search .trustscorerc.json in current dir and parents)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Print the summary as JSON
        #[arg(long, short)]
        json: bool,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args = Args::parse();
    let result = match args.command {
        Commands::Check {
            file,
            stdin,
            threshold,
            json,
            verbose,
            config,
            rules,
        } => run_check(CheckArgs {
            file,
            stdin,
            threshold,
            json,
            verbose,
            config,
            rules,
        }),
        Commands::Batch {
            file,
            out,
            parallel,
            config,
            json,
        } => run_batch(&file, out.as_deref(), parallel, config.as_deref(), json),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {:#}", "Error".red(), e);
            ExitCode::FAILURE
        }
    }
}

struct CheckArgs {
    file: Option<PathBuf>,
    stdin: bool,
    threshold: Option<u8>,
    json: bool,
    verbose: bool,
    config: Option<PathBuf>,
    rules: Option<PathBuf>,
}

fn run_check(args: CheckArgs) -> Result<ExitCode> {
    let input = match read_input(args.file.as_deref(), args.stdin) {
        Ok(input) => input,
        Err(e) => {
            eprintln!("{}: {:#}", "Error".red(), e);
            return Ok(ExitCode::from(EXIT_INPUT_ERROR));
        }
    };

    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    let config =
        load_config(&cwd, args.config.as_deref())?.merge_with_cli(args.threshold, args.verbose);

    let custom_engine;
    let engine: &GuardEngine = match &args.rules {
        Some(path) => {
            custom_engine =
                GuardEngine::with_registry(registry_with_rules(&RuleBook::from_path_or_bundled(path)));
            &custom_engine
        }
        None => global_engine(),
    };

    // JSON input is validated as structured output, anything else as text
    let output = serde_json::from_str::<Value>(&input).unwrap_or(Value::String(input));
    let report = engine.validate(&output, &config)?;

    if args.json {
        println!("{}", JsonReporter::new().pretty().report(&report));
    } else {
        let mut reporter = ConsoleReporter::new();
        if config.verbose {
            reporter = reporter.verbose();
        }
        reporter.report(&report);
    }

    if let Some(threshold) = config.threshold {
        if report.score < threshold {
            if !args.json {
                eprintln!(
                    "{}: score {} is below threshold {}",
                    "Failed".red().bold(),
                    report.score,
                    threshold
                );
            }
            return Ok(ExitCode::from(EXIT_BELOW_THRESHOLD));
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn read_input(file: Option<&Path>, stdin: bool) -> Result<String> {
    if stdin {
        let mut input = String::new();
        std::io::stdin()
            .read_to_string(&mut input)
            .context("Failed to read stdin")?;
        return Ok(input);
    }
    let Some(path) = file else {
        anyhow::bail!("No input: provide --file or --stdin");
    };
    if !path.exists() {
        anyhow::bail!("File not found: {}", path.display());
    }
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn run_batch(
    file: &Path,
    out: Option<&Path>,
    parallel: usize,
    config_path: Option<&Path>,
    json: bool,
) -> Result<ExitCode> {
    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    let config = load_config(&cwd, config_path)?;

    let summary = match batch::process_file(global_engine(), file, out, &config, parallel) {
        Ok(summary) => summary,
        Err(e) => {
            eprintln!("{}: {:#}", "Batch run failed".red(), e);
            return Ok(ExitCode::from(EXIT_INPUT_ERROR));
        }
    };

    if json {
        println!("{}", JsonReporter::new().pretty().report_batch(&summary));
    } else {
        ConsoleReporter::new().report_batch(&summary);
        if let Some(out) = out {
            println!("Wrote {} record(s) to {}", summary.total, out.display());
        }
    }
    Ok(ExitCode::SUCCESS)
}
