//! Progress reporting for benchmark runs
//!
//! Provides a live progress bar using indicatif plus a styled header and
//! summary. Everything here writes to stderr; stdout is reserved for the
//! machine-readable `RESULT` line.

use crate::config::BenchConfig;
use crate::harness::{BenchmarkResult, ProgressEvent};
use console::style;
use humansize::{format_size, BINARY};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

/// Redraw at most this often; the bar is updated once per file
const REFRESH_HZ: u8 = 10;

/// Progress reporter that displays read status
pub struct ProgressReporter {
    bar: ProgressBar,
}

impl ProgressReporter {
    /// Create a spinner; it becomes a bar once the file count is known
    pub fn new(label: &str) -> Self {
        let bar = ProgressBar::with_draw_target(
            None,
            ProgressDrawTarget::stderr_with_hz(REFRESH_HZ),
        );

        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
        );
        bar.set_prefix(label.to_string());
        bar.set_message("Scanning...");
        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Feed a harness event
    pub fn update(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Scanned { files } => {
                self.bar.set_length(files);
                self.bar.set_style(
                    ProgressStyle::default_bar()
                        .template(
                            "{prefix:.cyan.bold} [{elapsed_precise}] {bar:40.green/dim} \
                             {pos}/{len} files ({per_sec}) {msg}",
                        )
                        .unwrap_or_else(|_| ProgressStyle::default_bar())
                        .progress_chars("█▉▊▋▌▍▎▏ "),
                );
                self.bar.set_message(String::new());
            }
            ProgressEvent::Read { files, bytes } => {
                self.bar.set_position(files);
                // Formatting the size is cheap next to a file read
                self.bar.set_message(format_size(bytes, BINARY));
            }
        }
    }

    /// Finish and clear the progress display
    pub fn finish_and_clear(&self) {
        self.bar.finish_and_clear();
    }
}

/// Format a number with thousands separators
pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let bytes: Vec<_> = s.bytes().rev().collect();

    let chunks: Vec<String> = bytes
        .chunks(3)
        .map(|chunk| chunk.iter().rev().map(|&b| b as char).collect::<String>())
        .collect();

    chunks.into_iter().rev().collect::<Vec<_>>().join(",")
}

/// Print a header at the start of the run
pub fn print_header(config: &BenchConfig) {
    eprintln!();
    eprintln!(
        "{} {}",
        style("frio-bench").cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    eprintln!("{}", style("─".repeat(50)).dim());
    eprintln!("  {} {}", style("Root:").bold(), config.root.display());
    eprintln!("  {} {}", style("Backend:").bold(), config.backend);
    eprintln!("  {} {}", style("Threads:").bold(), config.threads);
    eprintln!(
        "  {} {}s",
        style("Budget:").bold(),
        config.duration.as_secs()
    );
    if config.chunk_size > 0 {
        eprintln!(
            "  {} {}",
            style("Chunk:").bold(),
            format_size(config.chunk_size, BINARY)
        );
    }
    if !config.filter.deny.is_empty() {
        eprintln!(
            "  {} {}",
            style("Blacklist:").bold(),
            config.filter.deny.join(", ")
        );
    }
    eprintln!();
}

/// Print a summary of the run
pub fn print_summary(result: &BenchmarkResult) {
    let title = if result.timed_out {
        style("Budget Reached").yellow().bold()
    } else {
        style("Run Complete").green().bold()
    };

    eprintln!();
    eprintln!("{}", title);
    eprintln!("{}", style("─".repeat(50)).dim());
    eprintln!("  {} {}", style("Files:").bold(), format_number(result.files));
    eprintln!(
        "  {} {}",
        style("Read:").bold(),
        format_size(result.bytes, BINARY)
    );
    eprintln!(
        "  {} {:.2}s",
        style("Elapsed:").bold(),
        result.elapsed_secs
    );
    eprintln!(
        "  {} {:.2} MiB/s, {:.2} files/s",
        style("Throughput:").bold(),
        result.mb_per_sec,
        result.files_per_sec
    );
    eprintln!();
}
