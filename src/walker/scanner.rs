//! Deterministic local directory scanner
//!
//! Walks a directory tree with an explicit stack (no recursion), applying the
//! deny filter to every entry name before looking at its type and the allow
//! filter to files only. Symbolic links are never followed: a link is neither
//! descended into nor collected as a file.
//!
//! Ordering:
//! - Sibling directories are pushed in descending inode order so they pop in
//!   ascending inode order, independent of `readdir` order.
//! - Collected files are finally sorted by inode (path breaks ties between
//!   hard links), or uniformly shuffled when randomization is requested.
//!
//! ```text
//! stack: [root]
//!   pop root ── read_dir ──┬── denied name      → skip (subtree too)
//!                          ├── directory        → siblings, sorted by inode
//!                          ├── file + allowed   → files (path, inode)
//!                          └── symlink / other  → ignore
//!   push siblings reversed, repeat until empty
//! ```

use crate::error::TraversalError;
use crate::filter::CompiledFilter;
use rand::seq::SliceRandom;
use rand::Rng;
use std::fs::{self, DirEntry, ReadDir};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, trace};

/// A collected entry; only used as an ordering key inside the scanner.
///
/// Field order matters: the derived `Ord` compares inode first, then path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct ScanEntry {
    inode: u64,
    path: PathBuf,
}

impl ScanEntry {
    fn from_dir_entry(entry: &DirEntry) -> Self {
        Self {
            inode: inode_of(entry),
            path: entry.path(),
        }
    }
}

#[cfg(unix)]
fn inode_of(entry: &DirEntry) -> u64 {
    use std::os::unix::fs::DirEntryExt;
    entry.ino()
}

// No inode on this platform; ordering falls back to the path tie-breaker.
#[cfg(not(unix))]
fn inode_of(_entry: &DirEntry) -> u64 {
    0
}

/// Counters collected during a scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanStats {
    /// Directories successfully listed (root included)
    pub dirs_scanned: u64,

    /// Subdirectories that could not be listed and were skipped
    pub dirs_skipped: u64,

    /// Entries dropped by the deny filter
    pub denied: u64,

    /// Files dropped by the allow filter
    pub not_allowed: u64,

    /// Entries whose name or type could not be read
    pub entry_errors: u64,

    /// Wall-clock time spent scanning
    pub duration: Duration,
}

/// Ordered list of files produced by a scan
#[derive(Debug, Clone)]
pub struct ScanResult {
    /// Absolute scan root
    pub root: PathBuf,

    /// Absolute file paths in scan order
    pub files: Vec<PathBuf>,

    /// Whether `files` is a random permutation rather than inode order
    pub shuffled: bool,

    /// Scan counters
    pub stats: ScanStats,
}

impl ScanResult {
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Stack-based directory scanner
#[derive(Debug, Clone)]
pub struct DirScanner {
    filter: CompiledFilter,
    randomize: bool,
}

impl DirScanner {
    pub fn new(filter: CompiledFilter, randomize: bool) -> Self {
        Self { filter, randomize }
    }

    /// Scan `root`, shuffling with the thread-local RNG when randomizing
    pub fn scan(&self, root: &Path) -> Result<ScanResult, TraversalError> {
        self.scan_with_rng(root, &mut rand::thread_rng())
    }

    /// Scan `root` using the given RNG for the optional shuffle
    pub fn scan_with_rng<R: Rng + ?Sized>(
        &self,
        root: &Path,
        rng: &mut R,
    ) -> Result<ScanResult, TraversalError> {
        let start = Instant::now();
        let root = absolute_root(root)?;
        let root_entries = open_root(&root)?;

        info!(root = %root.display(), "Scanning directory");

        let mut stats = ScanStats::default();
        let mut files: Vec<ScanEntry> = Vec::new();
        let mut stack: Vec<PathBuf> = Vec::new();

        self.collect_dir(&root, root_entries, &mut files, &mut stack, &mut stats);

        while let Some(dir) = stack.pop() {
            match fs::read_dir(&dir) {
                Ok(entries) => {
                    self.collect_dir(&dir, entries, &mut files, &mut stack, &mut stats);
                }
                Err(e) => {
                    stats.dirs_skipped += 1;
                    debug!(path = %dir.display(), error = %e, "Skipping unreadable directory");
                }
            }
        }

        let files = order_files(files, self.randomize, rng);
        stats.duration = start.elapsed();

        info!(
            files = files.len(),
            dirs = stats.dirs_scanned,
            skipped = stats.dirs_skipped,
            shuffled = self.randomize,
            "Scan complete"
        );

        Ok(ScanResult {
            root,
            files,
            shuffled: self.randomize,
            stats,
        })
    }

    /// Classify the entries of one directory
    fn collect_dir(
        &self,
        dir: &Path,
        entries: ReadDir,
        files: &mut Vec<ScanEntry>,
        stack: &mut Vec<PathBuf>,
        stats: &mut ScanStats,
    ) {
        stats.dirs_scanned += 1;
        let mut subdirs: Vec<ScanEntry> = Vec::new();

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    stats.entry_errors += 1;
                    trace!(dir = %dir.display(), error = %e, "Unreadable directory entry");
                    continue;
                }
            };

            let name = entry.file_name();
            if self.filter.is_denied(&name) {
                stats.denied += 1;
                continue;
            }

            // DirEntry::file_type does not follow symlinks
            let file_type = match entry.file_type() {
                Ok(ft) => ft,
                Err(e) => {
                    stats.entry_errors += 1;
                    trace!(path = %entry.path().display(), error = %e, "Cannot read entry type");
                    continue;
                }
            };

            if file_type.is_dir() {
                subdirs.push(ScanEntry::from_dir_entry(&entry));
            } else if file_type.is_file() {
                if self.filter.is_allowed(&name) {
                    files.push(ScanEntry::from_dir_entry(&entry));
                } else {
                    stats.not_allowed += 1;
                }
            }
        }

        subdirs.sort_unstable();
        stack.extend(subdirs.into_iter().rev().map(|d| d.path));
    }
}

/// Make the root absolute without resolving symlinks
fn absolute_root(root: &Path) -> Result<PathBuf, TraversalError> {
    std::path::absolute(root).map_err(|source| TraversalError::Unreadable {
        path: root.to_path_buf(),
        source,
    })
}

fn open_root(root: &Path) -> Result<ReadDir, TraversalError> {
    let metadata = fs::metadata(root).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => TraversalError::NotFound {
            path: root.to_path_buf(),
        },
        _ => TraversalError::Unreadable {
            path: root.to_path_buf(),
            source,
        },
    })?;

    if !metadata.is_dir() {
        return Err(TraversalError::NotADirectory {
            path: root.to_path_buf(),
        });
    }

    fs::read_dir(root).map_err(|source| TraversalError::Unreadable {
        path: root.to_path_buf(),
        source,
    })
}

fn order_files<R: Rng + ?Sized>(
    mut files: Vec<ScanEntry>,
    randomize: bool,
    rng: &mut R,
) -> Vec<PathBuf> {
    if randomize {
        files.shuffle(rng);
    } else {
        files.sort_unstable();
    }
    files.into_iter().map(|e| e.path).collect()
}
