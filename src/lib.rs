//! frio-bench - Filesystem Read-Throughput Benchmark
//!
//! Measures how fast a local directory tree can be read. A run scans the tree
//! into a deterministic file list, then reads it with one of two backends
//! until the list is exhausted or a wall-clock budget runs out, and reports
//! MiB/s and files/s.
//!
//! # Features
//!
//! - **Deterministic Scan**: Depth-first, entries visited in inode order with
//!   the path as tie-breaker, so repeated scans of an unchanged tree produce
//!   the same list.
//!
//! - **Name Filters**: Glob blacklist applied to files and directories
//!   (a denied directory prunes its subtree), optional whitelist for files.
//!
//! - **Two Backends**: A streaming reader that hands file content back, and a
//!   cancellable worker pool that only reports lengths. Both yield outcomes in
//!   submission order.
//!
//! - **Bounded Runs**: The read phase stops at the budget; readers are shut
//!   down without the teardown being counted.
//!
//! # Architecture
//!
//! ```text
//!            ┌──────────────────────────┐
//!            │        DirScanner        │
//!            │  - explicit-stack DFS    │
//!            │  - inode order / shuffle │
//!            └────────────┬─────────────┘
//!                         │ Vec<PathBuf>
//!                         ▼
//!            ┌──────────────────────────┐
//!            │      ReadBackend         │
//!            │  NativeReader │ Pool     │
//!            └────────────┬─────────────┘
//!                         │ outcomes
//!                         ▼
//!            ┌──────────────────────────┐
//!            │  OrderedStream (pool)    │
//!            │  LaneStream (native)     │
//!            │  (crossbeam bounded)     │
//!            └────────────┬─────────────┘
//!                         │ in input order
//!                         ▼
//!            ┌──────────────────────────┐
//!            │         Harness          │
//!            │  - budget / ctrl-c       │
//!            │  - BenchmarkResult       │
//!            └──────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```bash
//! # Default: in-process pool, 1 thread, 10 second budget
//! frio-bench run /data
//!
//! # Native backend, 8 threads, shuffled, first 4 KiB of every file
//! frio-bench run /data --backend native --threads 8 --shuffle --chunk-size 4096
//!
//! # Inspect the scan order
//! frio-bench scan /data --blacklist .git
//! ```

pub mod config;
pub mod error;
pub mod filter;
pub mod harness;
pub mod progress;
pub mod reader;
pub mod walker;

pub use config::{BackendKind, BenchConfig, CliArgs, ScanConfig};
pub use error::{BenchError, Result};
pub use filter::{CompiledFilter, FilterSpec};
pub use harness::{BenchmarkResult, Harness, RunOutcome};
pub use reader::{CancellationToken, ReadBackend, ReadOutcome, ReadTask};
pub use walker::{DirScanner, ScanResult};
