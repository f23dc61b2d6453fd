//! Streaming bulk reader
//!
//! The "native" engine: files are dealt round-robin to reader threads up
//! front, each thread reads its share in order and streams the content back
//! through its own bounded channel. File `i` always lives on lane
//! `i % lanes`, so the consumer restores input order by reading the lanes in
//! turn, with no reorder buffer. A thread that runs ahead simply blocks on
//! its full lane.
//!
//! Unlike the worker pool it returns the bytes, and it never looks at the
//! cancellation token; the consumer stops it by dropping the stream.
//!
//! ```text
//!  files: a b c d e f g      threads = 3
//!
//!  native-0: a d g ─► lane 0 ─┐
//!  native-1: b e   ─► lane 1 ─┼─► LaneStream ─► a b c d e f g
//!  native-2: c f   ─► lane 2 ─┘
//! ```

use super::ordered::join_readers;
use super::{read_file, ReadBackend, ReadOutcome, ReadStream, ReadTask};
use crate::config::BackendKind;
use crate::error::WorkerError;
use crossbeam_channel::{bounded, Receiver, Sender};
use std::thread::{self, JoinHandle};
use tracing::{debug, trace, warn};

/// Total capacity of the content channels, split across lanes
const CHANNEL_CAPACITY: usize = 4096;

/// Multi-threaded reader that hands file content back
#[derive(Debug, Clone)]
pub struct NativeReader {
    threads: usize,
}

impl NativeReader {
    /// A thread count of 0 is treated as 1
    pub fn new(threads: usize) -> Self {
        Self {
            threads: threads.max(1),
        }
    }
}

/// Deal tasks round-robin into `lanes` lanes
fn partition(tasks: Vec<ReadTask>, lanes: usize) -> Vec<Vec<ReadTask>> {
    let mut out: Vec<Vec<ReadTask>> = (0..lanes).map(|_| Vec::new()).collect();
    for (index, task) in tasks.into_iter().enumerate() {
        out[index % lanes].push(task);
    }
    out
}

impl ReadBackend for NativeReader {
    fn kind(&self) -> BackendKind {
        BackendKind::Native
    }

    fn threads(&self) -> usize {
        self.threads
    }

    fn read_many(&self, tasks: Vec<ReadTask>) -> Result<ReadStream, WorkerError> {
        Ok(Box::new(self.open(tasks)?))
    }
}

impl NativeReader {
    fn open(&self, tasks: Vec<ReadTask>) -> Result<LaneStream, WorkerError> {
        let total = tasks.len();
        // Every lane gets at least one file
        let lanes = self.threads.min(total);
        let capacity = (CHANNEL_CAPACITY / lanes.max(1)).max(1);

        let mut stream = LaneStream {
            lanes: Vec::with_capacity(lanes),
            next: 0,
            total,
            handles: Vec::with_capacity(lanes),
        };

        for (id, lane) in partition(tasks, lanes.max(1)).into_iter().enumerate() {
            if lane.is_empty() {
                continue;
            }

            let (sender, receiver) = bounded(capacity);
            let handle = thread::Builder::new()
                .name(format!("native-{}", id))
                .spawn(move || lane_loop(id, lane, sender))
                .map_err(|e| WorkerError::SpawnFailed {
                    id,
                    reason: e.to_string(),
                })?;

            stream.lanes.push(receiver);
            stream.handles.push((id, handle));
        }

        debug!(lanes, capacity, tasks = total, "Native reader started");
        Ok(stream)
    }
}

/// Input-order view over per-thread lanes
struct LaneStream {
    lanes: Vec<Receiver<ReadOutcome>>,
    next: usize,
    total: usize,
    handles: Vec<(usize, JoinHandle<()>)>,
}

impl Iterator for LaneStream {
    type Item = ReadOutcome;

    fn next(&mut self) -> Option<ReadOutcome> {
        if self.next >= self.total {
            return None;
        }

        let lane = &self.lanes[self.next % self.lanes.len()];
        match lane.recv() {
            Ok(outcome) => {
                self.next += 1;
                Some(outcome)
            }
            Err(_) => {
                warn!(
                    missing = self.total - self.next,
                    "Readers stopped before producing every outcome"
                );
                self.total = self.next;
                None
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.total - self.next;
        (0, Some(remaining))
    }
}

impl Drop for LaneStream {
    fn drop(&mut self) {
        // Disconnect first so blocked readers wake up with a send error
        self.lanes.clear();
        join_readers(std::mem::take(&mut self.handles));
        debug!(unread = self.total - self.next, "Native stream closed");
    }
}

fn lane_loop(id: usize, lane: Vec<ReadTask>, sender: Sender<ReadOutcome>) {
    let assigned = lane.len();
    let mut sent = 0usize;

    for task in lane {
        let outcome = match read_file(&task.path, task.limit) {
            Ok(data) => ReadOutcome::with_content(task.path, data),
            Err(e) => {
                debug!(thread = id, path = %task.path.display(), error = %e, "Read failed");
                ReadOutcome::faulted(task.path)
            }
        };

        if sender.send(outcome).is_err() {
            break;
        }
        sent += 1;
    }

    trace!(thread = id, assigned, sent, "Native lane finished");
}
