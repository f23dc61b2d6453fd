//! Benchmark harness
//!
//! Drives one run: scan, read with the selected backend under a wall-clock
//! budget, then turn the counters into a [`BenchmarkResult`].
//!
//! ```text
//! Idle ─► Scanning ─┬─► (no files) ─────────────────────────► Reported
//!                   └─► Reading ─┬─► TimedOut  ─┐
//!                                └─► Completed ─┴─► Reported
//! ```
//!
//! The budget is checked after every outcome, so at least one outcome is
//! always consumed. Elapsed time is taken at the stopping point, before the
//! stream is dropped, for both backends; teardown (joining readers that are
//! finishing an in-flight read) is not measured.

use crate::config::{BackendKind, BenchConfig};
use crate::error::{ConfigError, Result};
use crate::filter::CompiledFilter;
use crate::reader::{build_backend, CancellationToken, ReadOutcome, ReadStatus, ReadTask};
use crate::walker::{DirScanner, ScanStats};
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const BYTES_PER_MIB: f64 = 1024.0 * 1024.0;

/// Lifecycle of a single run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Scanning,
    Reading,
    /// Stopped before the stream was exhausted (budget or interrupt)
    TimedOut,
    Completed,
    Reported,
}

/// Rates derived from a run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Throughput {
    pub mb_per_sec: f64,
    pub files_per_sec: f64,
}

impl Throughput {
    /// `None` when no measurable time elapsed
    pub fn compute(files: u64, bytes: u64, elapsed: Duration) -> Option<Self> {
        let secs = elapsed.as_secs_f64();
        if secs <= 0.0 {
            return None;
        }

        Some(Self {
            mb_per_sec: bytes as f64 / BYTES_PER_MIB / secs,
            files_per_sec: files as f64 / secs,
        })
    }
}

/// Final record of a run, produced once
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkResult {
    pub backend: BackendKind,
    pub threads: usize,
    pub shuffled: bool,
    pub mb_per_sec: f64,
    pub files_per_sec: f64,
    pub files: u64,
    pub bytes: u64,
    pub elapsed_secs: f64,
    pub timed_out: bool,
}

impl BenchmarkResult {
    /// `RESULT|<backend>|<threads>|<shuffled>|<mb_per_sec>|<files_per_sec>`
    pub fn result_line(&self) -> String {
        format!(
            "RESULT|{}|{}|{}|{:.2}|{:.2}",
            self.backend,
            self.threads,
            if self.shuffled { "True" } else { "False" },
            self.mb_per_sec,
            self.files_per_sec
        )
    }
}

/// How a run ended without a fatal error
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// Throughput was measured
    Completed(BenchmarkResult),

    /// The scan matched no files; nothing was read
    EmptyScan { scan: ScanStats },

    /// Reads finished faster than the clock could measure
    InsufficientDuration { files: u64, bytes: u64 },
}

/// Progress notifications for display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressEvent {
    /// Scan finished with this many files
    Scanned { files: u64 },

    /// Running totals after one more outcome
    Read { files: u64, bytes: u64 },
}

/// Counters accumulated while consuming a read stream
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadTotals {
    pub files: u64,
    pub bytes: u64,
    pub faulted: u64,
    pub cancelled: u64,
    pub elapsed: Duration,
    pub timed_out: bool,
    pub interrupted: bool,
}

impl ReadTotals {
    fn record(&mut self, outcome: &ReadOutcome) {
        self.files += 1;
        self.bytes += outcome.len;
        match outcome.status {
            ReadStatus::Read => {}
            ReadStatus::Faulted => self.faulted += 1,
            ReadStatus::Cancelled => self.cancelled += 1,
        }
    }
}

/// Consume `stream` until it ends, the budget is exceeded, or `cancel` fires.
///
/// When the budget runs out the token is cancelled so pool workers stop
/// before their next file. The stream is dropped after `elapsed` is taken.
pub fn drain<I, F>(
    mut stream: I,
    start: Instant,
    budget: Duration,
    cancel: &CancellationToken,
    mut on_read: F,
) -> ReadTotals
where
    I: Iterator<Item = ReadOutcome>,
    F: FnMut(u64, u64),
{
    let mut totals = ReadTotals::default();

    for outcome in stream.by_ref() {
        totals.record(&outcome);
        on_read(totals.files, totals.bytes);

        if start.elapsed() > budget {
            totals.timed_out = true;
            cancel.cancel();
            break;
        }

        if cancel.is_cancelled() {
            totals.interrupted = true;
            break;
        }
    }

    totals.elapsed = start.elapsed();

    let teardown = Instant::now();
    drop(stream);
    debug!(teardown_ms = teardown.elapsed().as_millis() as u64, "Readers shut down");

    totals
}

/// Runs benchmarks for one validated configuration
pub struct Harness {
    config: BenchConfig,
    filter: CompiledFilter,
    cancel: CancellationToken,
    state: RunState,
}

impl Harness {
    /// Validate the configuration and compile its filter
    pub fn new(config: BenchConfig) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        let filter = config.filter.compile()?;

        Ok(Self {
            config,
            filter,
            cancel: CancellationToken::new(),
            state: RunState::Idle,
        })
    }

    /// Token shared with the readers; cancelling it stops the current run
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn config(&self) -> &BenchConfig {
        &self.config
    }

    pub fn run(&mut self) -> Result<RunOutcome> {
        self.run_with_progress(|_| {})
    }

    pub fn run_with_progress<F>(&mut self, mut progress: F) -> Result<RunOutcome>
    where
        F: FnMut(ProgressEvent),
    {
        self.cancel.reset();
        self.transition(RunState::Scanning);

        let scan = match DirScanner::new(self.filter.clone(), self.config.shuffle)
            .scan(&self.config.root)
        {
            Ok(scan) => scan,
            Err(e) => {
                self.transition(RunState::Reported);
                return Err(e.into());
            }
        };

        if scan.is_empty() {
            info!(root = %scan.root.display(), "No files found");
            self.transition(RunState::Reported);
            return Ok(RunOutcome::EmptyScan { scan: scan.stats });
        }

        progress(ProgressEvent::Scanned {
            files: scan.len() as u64,
        });

        let backend = build_backend(self.config.backend, self.config.threads, &self.cancel);
        let tasks = ReadTask::batch(scan.files, self.config.chunk_size);

        self.transition(RunState::Reading);
        let start = Instant::now();
        let stream = match backend.read_many(tasks) {
            Ok(stream) => stream,
            Err(e) => {
                self.transition(RunState::Reported);
                return Err(e.into());
            }
        };

        let totals = drain(stream, start, self.config.duration, &self.cancel, |files, bytes| {
            progress(ProgressEvent::Read { files, bytes })
        });

        if totals.timed_out || totals.interrupted {
            self.transition(RunState::TimedOut);
        } else {
            self.transition(RunState::Completed);
        }

        if totals.interrupted {
            warn!(files = totals.files, "Run interrupted");
        }
        if totals.faulted > 0 {
            warn!(faulted = totals.faulted, "Some files could not be read");
        }
        if totals.cancelled > 0 {
            debug!(cancelled = totals.cancelled, "Outcomes skipped after cancellation");
        }

        let outcome = match Throughput::compute(totals.files, totals.bytes, totals.elapsed) {
            Some(rate) => RunOutcome::Completed(BenchmarkResult {
                backend: backend.kind(),
                threads: self.config.threads,
                shuffled: self.config.shuffle,
                mb_per_sec: rate.mb_per_sec,
                files_per_sec: rate.files_per_sec,
                files: totals.files,
                bytes: totals.bytes,
                elapsed_secs: totals.elapsed.as_secs_f64(),
                timed_out: totals.timed_out,
            }),
            None => RunOutcome::InsufficientDuration {
                files: totals.files,
                bytes: totals.bytes,
            },
        };

        info!(
            backend = %self.config.backend,
            files = totals.files,
            bytes = totals.bytes,
            elapsed_ms = totals.elapsed.as_millis() as u64,
            timed_out = totals.timed_out,
            "Read phase finished"
        );

        self.transition(RunState::Reported);
        Ok(outcome)
    }

    fn transition(&mut self, next: RunState) {
        debug!(from = ?self.state, to = ?next, "Run state");
        self.state = next;
    }
}

/// Validate `config` and run it once
pub fn run(config: BenchConfig) -> Result<RunOutcome> {
    Harness::new(config)?.run()
}
