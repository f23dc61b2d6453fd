//! frio-bench - Filesystem Read-Throughput Benchmark
//!
//! Entry point for the CLI application.

use anyhow::{Context, Result};
use clap::Parser;
use frio_bench::config::{BenchConfig, CliArgs, Command, RunArgs, ScanArgs, ScanConfig};
use frio_bench::harness::{Harness, RunOutcome};
use frio_bench::progress::{format_number, print_header, print_summary, ProgressReporter};
use frio_bench::walker;
use std::io::{self, BufWriter, Write};
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let args = CliArgs::parse();

    setup_logging(args.verbose)?;

    match args.command {
        Command::Run(run_args) => run_bench(run_args, args.quiet),
        Command::Scan(scan_args) => run_scan(scan_args),
    }
}

/// Scan, read, and print the RESULT line
fn run_bench(args: RunArgs, quiet: bool) -> Result<()> {
    let config = BenchConfig::from_args(args, quiet).context("Invalid configuration")?;

    if config.show_progress {
        print_header(&config);
    }

    let show_progress = config.show_progress;
    let json = config.json;
    let mut harness = Harness::new(config).context("Invalid configuration")?;

    // Setup signal handler for graceful shutdown
    let token = harness.cancellation_token();
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupt received, stopping readers...");
        token.cancel();
    })
    .context("Failed to set signal handler")?;

    let progress = show_progress.then(|| ProgressReporter::new(harness.config().backend.as_str()));

    let outcome = harness
        .run_with_progress(|event| {
            if let Some(ref p) = progress {
                p.update(event);
            }
        })
        .context("Benchmark failed")?;

    if let Some(ref p) = progress {
        p.finish_and_clear();
    }

    match outcome {
        RunOutcome::Completed(result) => {
            if show_progress {
                print_summary(&result);
            }

            println!("{}", result.result_line());
            if json {
                let body =
                    serde_json::to_string(&result).context("Failed to serialize result")?;
                println!("{}", body);
            }
        }
        RunOutcome::EmptyScan { scan } => {
            info!(
                dirs = scan.dirs_scanned,
                denied = scan.denied,
                "Scan produced no files"
            );
            eprintln!("No files found!");
        }
        RunOutcome::InsufficientDuration { files, bytes } => {
            eprintln!(
                "Read {} files ({} bytes) too quickly to measure; no result produced",
                format_number(files),
                format_number(bytes)
            );
        }
    }

    Ok(())
}

/// Print the scan order, one path per line
fn run_scan(args: ScanArgs) -> Result<()> {
    let config = ScanConfig::from_args(args).context("Invalid configuration")?;
    let result = walker::scan(&config.root, &config.filter, config.shuffle)
        .context("Scan failed")?;

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    for path in &result.files {
        writeln!(out, "{}", path.display()).context("Failed to write scan output")?;
    }
    out.flush().context("Failed to write scan output")?;

    eprintln!(
        "{} files ({} directories scanned)",
        format_number(result.len() as u64),
        format_number(result.stats.dirs_scanned)
    );

    Ok(())
}

fn setup_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("frio_bench=debug,warn")
    } else {
        EnvFilter::new("frio_bench=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    Ok(())
}
