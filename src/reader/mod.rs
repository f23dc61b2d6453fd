//! Read backends
//!
//! Two interchangeable strategies implement [`ReadBackend`]: given an ordered
//! list of [`ReadTask`]s they return a lazy [`ReadStream`] of outcomes in
//! submission order, one per task.
//!
//! ```text
//!  tasks ──► ┌──────────────────────────┐      ┌──────────────────┐
//!            │ WorkerPoolReader         │      │ NativeReader     │
//!            │  shared task channel     │      │  round-robin     │
//!            │  N workers, check token  │      │  lane per thread │
//!            │  length only             │      │  length + bytes  │
//!            └────────────┬─────────────┘      └────────┬─────────┘
//!                         │ (index, outcome)            │ outcome
//!                         ▼                             ▼
//!            ┌──────────────────────────┐      ┌──────────────────┐
//!            │ OrderedStream            │      │ LaneStream       │
//!            │  windowed submission     │      │  lane i % N      │
//!            └──────────────────────────┘      └──────────────────┘
//! ```
//!
//! Consumers may stop iterating at any time. Dropping the stream closes the
//! result channel; producers notice on their next send and exit.

pub mod native;
pub mod ordered;
pub mod pool;

pub use native::NativeReader;
pub use ordered::OrderedStream;
pub use pool::WorkerPoolReader;

use crate::config::BackendKind;
use crate::error::WorkerError;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// One file to read. `limit == 0` reads the whole file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadTask {
    pub path: PathBuf,
    pub limit: u64,
}

impl ReadTask {
    pub fn new(path: impl Into<PathBuf>, limit: u64) -> Self {
        Self {
            path: path.into(),
            limit,
        }
    }

    /// Build one task per path with a shared limit
    pub fn batch(paths: impl IntoIterator<Item = PathBuf>, limit: u64) -> Vec<Self> {
        paths.into_iter().map(|path| Self { path, limit }).collect()
    }
}

/// How a task was resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStatus {
    /// Bytes were read (possibly zero for an empty file)
    Read,
    /// Open or read failed; recorded as zero length
    Faulted,
    /// Skipped because the run was cancelled; recorded as zero length
    Cancelled,
}

/// Result of one [`ReadTask`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadOutcome {
    pub path: PathBuf,

    /// Bytes read
    pub len: u64,

    /// File content, only returned by backends that hand data back
    pub content: Option<Vec<u8>>,

    pub status: ReadStatus,
}

impl ReadOutcome {
    pub fn read(path: PathBuf, len: u64) -> Self {
        Self {
            path,
            len,
            content: None,
            status: ReadStatus::Read,
        }
    }

    pub fn with_content(path: PathBuf, content: Vec<u8>) -> Self {
        Self {
            path,
            len: content.len() as u64,
            content: Some(content),
            status: ReadStatus::Read,
        }
    }

    pub fn faulted(path: PathBuf) -> Self {
        Self {
            path,
            len: 0,
            content: None,
            status: ReadStatus::Faulted,
        }
    }

    pub fn cancelled(path: PathBuf) -> Self {
        Self {
            path,
            len: 0,
            content: None,
            status: ReadStatus::Cancelled,
        }
    }
}

/// Lazy, ordered sequence of outcomes
pub type ReadStream = Box<dyn Iterator<Item = ReadOutcome> + Send>;

/// The "read many files" contract shared by all backends
pub trait ReadBackend: Send + Sync {
    /// Which strategy this is
    fn kind(&self) -> BackendKind;

    /// Configured parallelism
    fn threads(&self) -> usize;

    /// Start reading `tasks`; outcomes arrive in submission order
    fn read_many(&self, tasks: Vec<ReadTask>) -> Result<ReadStream, WorkerError>;
}

/// Construct the backend selected at run start
pub fn build_backend(
    kind: BackendKind,
    threads: usize,
    cancel: &CancellationToken,
) -> Box<dyn ReadBackend> {
    match kind {
        BackendKind::Native => Box::new(NativeReader::new(threads)),
        BackendKind::InProcess => Box::new(WorkerPoolReader::new(threads, cancel)),
    }
}

/// Cooperative stop signal for one benchmark run
///
/// Clones share the same flag. Setting is idempotent, so no locking is needed
/// beyond the atomic store.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Clear the flag at the start of a run
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Read `path` into `buf`, replacing its contents.
///
/// Reads the first `limit` bytes, or the whole file when `limit` is 0. The
/// file handle is closed before returning on every path.
pub fn read_into(path: &Path, limit: u64, buf: &mut Vec<u8>) -> io::Result<usize> {
    buf.clear();
    let mut file = File::open(path)?;

    if limit == 0 {
        let size = file.metadata().map(|m| m.len() as usize).unwrap_or(0);
        buf.reserve(size);
        file.read_to_end(buf)
    } else {
        let size = file.metadata().map(|m| m.len()).unwrap_or(limit);
        buf.reserve(size.min(limit) as usize);
        file.take(limit).read_to_end(buf)
    }
}

/// Read `path` into a fresh buffer, see [`read_into`]
pub fn read_file(path: &Path, limit: u64) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    read_into(path, limit, &mut buf)?;
    Ok(buf)
}
