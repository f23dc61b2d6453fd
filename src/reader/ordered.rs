//! Submission-order result stream for the worker pool
//!
//! Workers send `(index, outcome)` pairs in whatever order they finish.
//! [`OrderedStream`] buffers early arrivals and yields strictly by index, so
//! the consumer sees outcomes in the order tasks were submitted.
//!
//! Tasks are handed to the workers through a sliding window: at most
//! `window` tasks are ever submitted beyond the next index to be yielded, so
//! the reorder buffer never holds more than `window` outcomes no matter how
//! slow any single read is.
//!
//! ```text
//!   yielded        submitted, in flight      not yet submitted
//! ├─────────┼──────────────────────────────┼──────────────────┤
//! 0        next                      next + window          total
//! ```

use super::{ReadOutcome, ReadTask};
use crate::error::WorkerError;
use crossbeam_channel::{Receiver, Sender};
use std::collections::BTreeMap;
use std::iter::Enumerate;
use std::thread::JoinHandle;
use std::vec::IntoIter;
use tracing::{debug, warn};

/// Item tagged with its submission index
pub type Indexed<T = ReadOutcome> = (usize, T);

/// Tasks waiting to be submitted to the workers
struct Feed {
    tasks: Enumerate<IntoIter<ReadTask>>,
    sender: Sender<Indexed<ReadTask>>,
}

/// Ordered view over a channel of indexed outcomes
///
/// Owns the worker threads. Dropping the stream disconnects both channels and
/// joins them, so a worker may finish the read it has in flight but never
/// starts another.
pub struct OrderedStream {
    receiver: Receiver<Indexed>,
    pending: BTreeMap<usize, ReadOutcome>,
    feed: Option<Feed>,
    next: usize,
    total: usize,
    handles: Vec<(usize, JoinHandle<()>)>,
}

impl OrderedStream {
    /// Stream expecting `total` outcomes indexed `0..total`, whose tasks
    /// were already submitted by the caller
    pub fn new(receiver: Receiver<Indexed>, total: usize) -> Self {
        Self {
            receiver,
            pending: BTreeMap::new(),
            feed: None,
            next: 0,
            total,
            handles: Vec::new(),
        }
    }

    /// Stream that submits `tasks` itself, keeping at most `window` of them
    /// ahead of the consumer
    pub fn windowed(
        receiver: Receiver<Indexed>,
        tasks: Vec<ReadTask>,
        sender: Sender<Indexed<ReadTask>>,
        window: usize,
    ) -> Self {
        let mut stream = Self::new(receiver, tasks.len());
        stream.feed = Some(Feed {
            tasks: tasks.into_iter().enumerate(),
            sender,
        });

        for _ in 0..window.max(1) {
            if !stream.submit_one() {
                break;
            }
        }
        stream
    }

    /// Hand a worker thread to the stream
    pub fn attach(&mut self, id: usize, handle: JoinHandle<()>) {
        self.handles.push((id, handle));
    }

    /// Outcomes received but not yet yielded
    pub fn buffered(&self) -> usize {
        self.pending.len()
    }

    /// Outcomes still to be yielded
    pub fn remaining(&self) -> usize {
        self.total - self.next
    }

    /// Submit the next task; false once there is nothing left to submit.
    ///
    /// Dropping the feed closes the task channel so idle workers exit.
    fn submit_one(&mut self) -> bool {
        let Some(feed) = self.feed.as_mut() else {
            return false;
        };

        let sent = match feed.tasks.next() {
            Some(indexed) => feed.sender.send(indexed).is_ok(),
            None => false,
        };
        if !sent {
            self.feed = None;
        }
        sent
    }
}

impl Iterator for OrderedStream {
    type Item = ReadOutcome;

    fn next(&mut self) -> Option<ReadOutcome> {
        if self.next >= self.total {
            return None;
        }

        loop {
            if let Some(outcome) = self.pending.remove(&self.next) {
                self.next += 1;
                self.submit_one();
                return Some(outcome);
            }

            match self.receiver.recv() {
                Ok((index, outcome)) => {
                    self.pending.insert(index, outcome);
                }
                Err(_) => {
                    // Every worker is gone without sending `next`
                    warn!(
                        missing = self.total - self.next,
                        "Readers stopped before producing every outcome"
                    );
                    self.total = self.next;
                    return None;
                }
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining()))
    }
}

impl Drop for OrderedStream {
    fn drop(&mut self) {
        // Disconnect first so blocked workers wake up with an error
        self.feed = None;
        drop(std::mem::replace(
            &mut self.receiver,
            crossbeam_channel::never(),
        ));
        let buffered = self.buffered();
        self.pending.clear();

        join_readers(std::mem::take(&mut self.handles));

        debug!(
            unread = self.total - self.next,
            buffered, "Read stream closed"
        );
    }
}

/// Join reader threads, reporting any that panicked
pub(crate) fn join_readers(handles: Vec<(usize, JoinHandle<()>)>) {
    for (id, handle) in handles {
        if handle.join().is_err() {
            let err = WorkerError::Panicked { id };
            warn!(error = %err, "Reader thread failed");
        }
    }
}
