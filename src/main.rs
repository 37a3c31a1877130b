use anyhow::{Context, Result};
use atomic_write_file::AtomicWriteFile;
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use risk_score::batch::{BatchCoordinator, BatchResult, Table};
use risk_score::error::{BatchError, ProcessError};
use risk_score::output;
use risk_score::record::RawRecord;
use risk_score::scoring::ScoringEngine;

const EXIT_SUCCESS: i32 = 0;
const EXIT_VALIDATION: i32 = 1;
const EXIT_STRUCTURAL: i32 = 2;
const EXIT_IO: i32 = 3;
const EXIT_CONFIG: i32 = 4;

#[derive(Subcommand, Debug)]
enum Commands {
    /// Score a single record given as JSON (read from stdin when omitted)
    Score {
        /// e.g. '{"crime_index": 5, "accident_rate": 4, "socioeconomic_level": 7, "weather": "Clear"}'
        record: Option<String>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Score every row of a CSV file
    Batch {
        /// Input CSV ("-" for stdin)
        input: PathBuf,

        /// Output CSV (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Concurrent row workers, 1-16
        #[arg(short, long)]
        workers: Option<usize>,
    },
    /// Check the columns of a CSV file without scoring any row
    Validate {
        /// Input CSV ("-" for stdin)
        input: PathBuf,
    },
    /// Show the active scoring and batch configuration
    Info {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Parser, Debug)]
#[command(name = "risk-score")]
#[command(about = "Normalized 0-100 risk scores from raw risk indicators", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to config file (defaults to ~/.config/risk-score/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Disable noise so identical input always gives identical scores
    #[arg(long, global = true)]
    deterministic: bool,

    /// Override the configured noise level (0-1)
    #[arg(long, global = true, conflicts_with = "deterministic")]
    noise: Option<f64>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    risk_score::logging::setup_logging(risk_score::logging::default_level(cli.verbose));

    let config_path = cli.config.map(PathBuf::from);
    let config = match risk_score::config::load_config(config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {:#}", e);
            std::process::exit(EXIT_CONFIG);
        }
    };

    let mut scoring = config.scoring();
    if let Some(noise) = cli.noise {
        scoring.noise_level = Some(noise);
    }
    if cli.deterministic {
        scoring.noise_level = Some(0.0);
    }

    let engine = match ScoringEngine::new(&scoring) {
        Ok(e) => Arc::new(e),
        Err(e) => {
            eprintln!("Scoring config errors:");
            for error in e.0 {
                eprintln!("  - {}", error);
            }
            std::process::exit(EXIT_CONFIG);
        }
    };

    let use_colors = output::should_use_colors();

    let code = match cli.command {
        Commands::Score { record, json } => run_score(&engine, record, json, cli.verbose, use_colors),
        Commands::Batch {
            input,
            output: output_path,
            workers,
        } => {
            let workers = workers.unwrap_or_else(|| config.workers());
            let coordinator = match BatchCoordinator::with_workers(engine, workers) {
                Ok(c) => c,
                Err(e) => {
                    eprintln!("Config error: {}", e);
                    std::process::exit(EXIT_CONFIG);
                }
            };
            run_batch(&coordinator, &input, output_path.as_deref(), cli.verbose).await
        }
        Commands::Validate { input } => run_validate(&input),
        Commands::Info { json } => {
            let coordinator = match BatchCoordinator::with_workers(engine, config.workers()) {
                Ok(c) => c,
                Err(e) => {
                    eprintln!("Config error: {}", e);
                    std::process::exit(EXIT_CONFIG);
                }
            };
            run_info(&coordinator, json)
        }
    };

    std::process::exit(code);
}

fn read_record(record: Option<String>) -> Result<RawRecord> {
    let text = match record {
        Some(text) => text,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read record from stdin")?;
            buf
        }
    };
    serde_json::from_str(&text).context("Invalid record JSON")
}

fn run_score(engine: &ScoringEngine, record: Option<String>, json: bool, verbose: bool, use_colors: bool) -> i32 {
    let raw = match read_record(record) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("{:#}", e);
            return EXIT_VALIDATION;
        }
    };

    let result = match engine.process(&raw) {
        Ok(r) => r,
        Err(ProcessError::Validation(e)) => {
            eprintln!("Validation error: {}", e);
            return EXIT_VALIDATION;
        }
        Err(e) => {
            eprintln!("{}", e);
            return EXIT_VALIDATION;
        }
    };

    if json {
        match serde_json::to_string_pretty(&result) {
            Ok(s) => println!("{}", s),
            Err(e) => {
                eprintln!("Failed to serialize result: {}", e);
                return EXIT_IO;
            }
        }
    } else {
        println!("{}", output::format_score_result(&result, use_colors));
        if verbose {
            println!();
            println!("{}", output::format_breakdown(&result));
        }
    }
    EXIT_SUCCESS
}

fn open_input(path: &Path) -> Result<Box<dyn Read>> {
    if path == Path::new("-") {
        return Ok(Box::new(std::io::stdin()));
    }
    let file = File::open(path)
        .with_context(|| format!("Failed to open input file {}", path.display()))?;
    Ok(Box::new(file))
}

fn write_output(result: &BatchResult, path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => {
            let mut file = AtomicWriteFile::open(path)
                .with_context(|| format!("Failed to open output file {}", path.display()))?;
            result.write_csv(&mut file)?;
            file.commit()
                .with_context(|| format!("Failed to save output file {}", path.display()))?;
        }
        None => result.write_csv(std::io::stdout().lock())?,
    }
    Ok(())
}

async fn run_batch(coordinator: &BatchCoordinator, input: &Path, output_path: Option<&Path>, verbose: bool) -> i32 {
    let reader = match open_input(input) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("{:#}", e);
            return EXIT_IO;
        }
    };

    let result = match coordinator.process_csv(reader).await {
        Ok(r) => r,
        Err(e @ (BatchError::Structural(_) | BatchError::Parse(_))) => {
            eprintln!("{}", e);
            return EXIT_STRUCTURAL;
        }
        Err(e) => {
            eprintln!("{}", e);
            return EXIT_IO;
        }
    };

    if let Err(e) = write_output(&result, output_path) {
        eprintln!("{:#}", e);
        return EXIT_IO;
    }

    let use_colors = std::io::IsTerminal::is_terminal(&std::io::stderr());
    eprintln!("{}", output::format_batch_summary(result.stats(), use_colors));
    if verbose && result.stats().error_count > 0 {
        eprintln!("{}", output::format_row_errors(&result));
    }
    EXIT_SUCCESS
}

fn run_validate(input: &Path) -> i32 {
    let table = match open_input(input) {
        Ok(reader) => match Table::from_csv(reader) {
            Ok(t) => t,
            Err(e) => {
                eprintln!("{}", e);
                return EXIT_STRUCTURAL;
            }
        },
        Err(e) => {
            eprintln!("{:#}", e);
            return EXIT_IO;
        }
    };

    let problems = BatchCoordinator::validate_structure(&table);
    if !problems.is_empty() {
        eprintln!("CSV structural errors:");
        for problem in problems {
            eprintln!("  - {}", problem);
        }
        return EXIT_STRUCTURAL;
    }

    let blank_rows = table.blank_row_count();
    println!(
        "OK: {} rows, {} columns ({} blank rows)",
        table.len(),
        table.headers().len(),
        blank_rows
    );
    EXIT_SUCCESS
}

fn run_info(coordinator: &BatchCoordinator, json: bool) -> i32 {
    let info = coordinator.info();
    if json {
        match serde_json::to_string_pretty(&info) {
            Ok(s) => println!("{}", s),
            Err(e) => {
                eprintln!("Failed to serialize info: {}", e);
                return EXIT_IO;
            }
        }
    } else {
        println!("{}", output::format_info(&info));
    }
    EXIT_SUCCESS
}
