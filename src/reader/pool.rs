//! In-process worker-pool reader
//!
//! The baseline backend. A fixed pool of worker threads pulls tasks from one
//! shared channel. Each worker:
//! - checks the run's [`CancellationToken`] before touching the filesystem
//! - reads the first `limit` bytes (or the whole file) into a reused buffer
//! - reports only the length; content is dropped
//! - turns any open/read error into a zero-length faulted outcome
//!
//! Results are re-sequenced into submission order by [`OrderedStream`], which
//! also feeds the task channel so only a bounded window of tasks is queued
//! ahead of the consumer.

use super::ordered::{join_readers, Indexed, OrderedStream};
use super::{read_into, CancellationToken, ReadBackend, ReadOutcome, ReadStream, ReadTask};
use crate::config::BackendKind;
use crate::error::WorkerError;
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use std::thread;
use tracing::{debug, trace};

/// Capacity of the result channel between workers and the consumer
const RESULT_QUEUE_SIZE: usize = 4096;

/// Tasks submitted ahead of the consumer, per worker
const TASKS_AHEAD_PER_WORKER: usize = 64;

/// Bounded worker pool that reports read lengths
#[derive(Debug, Clone)]
pub struct WorkerPoolReader {
    threads: usize,
    cancel: CancellationToken,
}

impl WorkerPoolReader {
    /// Pool of `threads` workers observing `cancel`
    pub fn new(threads: usize, cancel: &CancellationToken) -> Self {
        Self {
            threads: threads.max(1),
            cancel: cancel.clone(),
        }
    }
}

impl ReadBackend for WorkerPoolReader {
    fn kind(&self) -> BackendKind {
        BackendKind::InProcess
    }

    fn threads(&self) -> usize {
        self.threads
    }

    fn read_many(&self, tasks: Vec<ReadTask>) -> Result<ReadStream, WorkerError> {
        let total = tasks.len();
        let (task_tx, task_rx) = unbounded::<Indexed<ReadTask>>();
        let (result_tx, result_rx) = bounded(RESULT_QUEUE_SIZE);

        // Idle workers would exit immediately; don't spawn them
        let workers = self.threads.min(total);
        let mut handles = Vec::with_capacity(workers);
        for id in 0..workers {
            let task_rx = task_rx.clone();
            let result_tx = result_tx.clone();
            let cancel = self.cancel.clone();

            let spawned = thread::Builder::new()
                .name(format!("reader-{}", id))
                .spawn(move || worker_loop(id, task_rx, result_tx, cancel));

            match spawned {
                Ok(handle) => handles.push((id, handle)),
                Err(e) => {
                    // Closing the task channel lets the spawned workers exit
                    drop(task_tx);
                    join_readers(handles);
                    return Err(WorkerError::SpawnFailed {
                        id,
                        reason: e.to_string(),
                    });
                }
            }
        }

        let window = (self.threads * TASKS_AHEAD_PER_WORKER).min(RESULT_QUEUE_SIZE);
        let mut stream = OrderedStream::windowed(result_rx, tasks, task_tx, window);
        for (id, handle) in handles {
            stream.attach(id, handle);
        }

        debug!(workers, window, tasks = total, "Worker pool started");
        Ok(Box::new(stream))
    }
}

fn worker_loop(
    id: usize,
    tasks: Receiver<Indexed<ReadTask>>,
    results: Sender<Indexed>,
    cancel: CancellationToken,
) {
    let mut buf: Vec<u8> = Vec::new();
    let mut completed = 0u64;

    while let Ok((index, task)) = tasks.recv() {
        let outcome = if cancel.is_cancelled() {
            ReadOutcome::cancelled(task.path)
        } else {
            match read_into(&task.path, task.limit, &mut buf) {
                Ok(len) => ReadOutcome::read(task.path, len as u64),
                Err(e) => {
                    debug!(worker = id, path = %task.path.display(), error = %e, "Read failed");
                    ReadOutcome::faulted(task.path)
                }
            }
        };

        if results.send((index, outcome)).is_err() {
            // Consumer stopped early
            break;
        }
        completed += 1;
    }

    trace!(worker = id, completed, "Reader exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::ReadStatus;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn make_files(dir: &std::path::Path, count: usize) -> Vec<PathBuf> {
        (0..count)
            .map(|i| {
                let path = dir.join(format!("f{i:03}"));
                fs::write(&path, vec![b'x'; i]).unwrap();
                path
            })
            .collect()
    }

    #[test]
    fn test_outcomes_follow_submission_order() {
        let dir = tempdir().unwrap();
        let files = make_files(dir.path(), 50);
        let reader = WorkerPoolReader::new(4, &CancellationToken::new());

        let outcomes: Vec<ReadOutcome> = reader
            .read_many(ReadTask::batch(files.clone(), 0))
            .unwrap()
            .collect();

        assert_eq!(outcomes.len(), 50);
        for (i, outcome) in outcomes.iter().enumerate() {
            assert_eq!(outcome.path, files[i]);
            assert_eq!(outcome.len, i as u64);
            assert_eq!(outcome.status, ReadStatus::Read);
            assert!(outcome.content.is_none());
        }
    }

    #[test]
    fn test_limit_truncates() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("file1.txt");
        fs::write(&path, b"Hello World").unwrap();
        let reader = WorkerPoolReader::new(1, &CancellationToken::new());

        let lens: Vec<u64> = reader
            .read_many(vec![ReadTask::new(&path, 5), ReadTask::new(&path, 0)])
            .unwrap()
            .map(|o| o.len)
            .collect();
        assert_eq!(lens, vec![5, 11]);
    }

    #[test]
    fn test_missing_file_is_faulted_not_fatal() {
        let dir = tempdir().unwrap();
        let good = dir.path().join("good");
        fs::write(&good, b"abc").unwrap();
        let reader = WorkerPoolReader::new(2, &CancellationToken::new());

        let outcomes: Vec<ReadOutcome> = reader
            .read_many(vec![
                ReadTask::new(dir.path().join("missing"), 0),
                ReadTask::new(&good, 0),
            ])
            .unwrap()
            .collect();

        assert_eq!(outcomes[0].status, ReadStatus::Faulted);
        assert_eq!(outcomes[0].len, 0);
        assert_eq!(outcomes[1].status, ReadStatus::Read);
        assert_eq!(outcomes[1].len, 3);
    }

    #[test]
    fn test_cancelled_token_skips_io() {
        let dir = tempdir().unwrap();
        let files = make_files(dir.path(), 10);
        let token = CancellationToken::new();
        token.cancel();
        let reader = WorkerPoolReader::new(3, &token);

        let outcomes: Vec<ReadOutcome> =
            reader.read_many(ReadTask::batch(files, 0)).unwrap().collect();
        assert_eq!(outcomes.len(), 10);
        assert!(outcomes
            .iter()
            .all(|o| o.status == ReadStatus::Cancelled && o.len == 0));
    }

    #[test]
    fn test_cancel_mid_run_stops_reading_queued_tasks() {
        const THREADS: usize = 2;
        let dir = tempdir().unwrap();
        let files = make_files(dir.path(), 400);
        let token = CancellationToken::new();
        let reader = WorkerPoolReader::new(THREADS, &token);

        let mut stream = reader.read_many(ReadTask::batch(files, 0)).unwrap();
        for _ in 0..3 {
            assert_eq!(stream.next().unwrap().status, ReadStatus::Read);
        }
        token.cancel();

        let rest: Vec<ReadOutcome> = stream.collect();
        assert_eq!(rest.len(), 397);

        // Only reads already in flight when the token flipped may still land
        let first_cancelled = rest
            .iter()
            .position(|o| o.status == ReadStatus::Cancelled)
            .unwrap();
        let late_reads = rest[first_cancelled..]
            .iter()
            .filter(|o| o.status == ReadStatus::Read)
            .count();
        assert!(late_reads < THREADS, "{late_reads} reads after cancellation");
        assert_eq!(rest.last().unwrap().status, ReadStatus::Cancelled);
    }

    #[test]
    fn test_early_drop_is_clean() {
        let dir = tempdir().unwrap();
        let files = make_files(dir.path(), 200);
        let reader = WorkerPoolReader::new(4, &CancellationToken::new());

        let mut stream = reader.read_many(ReadTask::batch(files, 0)).unwrap();
        assert!(stream.next().is_some());
        drop(stream);
    }

    #[test]
    fn test_empty_task_list() {
        let reader = WorkerPoolReader::new(4, &CancellationToken::new());
        assert_eq!(reader.read_many(Vec::new()).unwrap().count(), 0);
    }

    #[test]
    fn test_zero_threads_clamped() {
        let reader = WorkerPoolReader::new(0, &CancellationToken::new());
        assert_eq!(reader.threads(), 1);
    }
}
