//! Integration tests for frio-bench
//!
//! Every test builds its own fixture tree in a temp directory and drives the
//! public API end to end: scan, read with a backend, and run the harness.

use frio_bench::config::{BackendKind, BenchConfig};
use frio_bench::filter::FilterSpec;
use frio_bench::harness::{drain, Harness, RunOutcome};
use frio_bench::reader::{build_backend, CancellationToken, ReadStatus, ReadTask};
use frio_bench::walker::{self, DirScanner};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};
use tempfile::{tempdir, TempDir};

/// Small mixed tree:
///
/// ```text
/// root/
///   file1.txt        "Hello World"
///   file2.py
///   file3.rs
///   image.jpg
///   nested/deep.txt
///   ignored_dir/skip.txt
///   .git/config
/// ```
fn fixture() -> TempDir {
    let dir = tempdir().unwrap();
    let root = dir.path();

    fs::write(root.join("file1.txt"), b"Hello World").unwrap();
    fs::write(root.join("file2.py"), b"print('hello')").unwrap();
    fs::write(root.join("file3.rs"), b"fn main() {}").unwrap();
    fs::write(root.join("image.jpg"), vec![0xFFu8; 256]).unwrap();

    fs::create_dir(root.join("nested")).unwrap();
    fs::write(root.join("nested/deep.txt"), b"deep").unwrap();

    fs::create_dir(root.join("ignored_dir")).unwrap();
    fs::write(root.join("ignored_dir/skip.txt"), b"skip").unwrap();

    fs::create_dir(root.join(".git")).unwrap();
    fs::write(root.join(".git/config"), b"[core]").unwrap();

    dir
}

fn names(files: &[PathBuf], root: &Path) -> BTreeSet<String> {
    files
        .iter()
        .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().into_owned())
        .collect()
}

fn scan(root: &Path, deny: &[&str], shuffle: bool) -> Vec<PathBuf> {
    walker::scan(root, &FilterSpec::deny(deny.iter().copied()), shuffle)
        .unwrap()
        .files
}

#[test]
fn test_scan_finds_every_file_including_hidden_dirs() {
    let dir = fixture();
    let root = dir.path().canonicalize().unwrap();
    let files = scan(&root, &[], false);

    let expected: BTreeSet<String> = [
        "file1.txt",
        "file2.py",
        "file3.rs",
        "image.jpg",
        "nested/deep.txt",
        "ignored_dir/skip.txt",
        ".git/config",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    assert_eq!(names(&files, &root), expected);
    assert!(files.iter().all(|p| p.is_absolute()));
}

#[test]
fn test_blacklist_extension() {
    let dir = fixture();
    fs::write(dir.path().join("photo.png"), b"png").unwrap();
    let root = dir.path().canonicalize().unwrap();

    let files = scan(&root, &["*.png"], false);
    assert!(files.iter().all(|p| p.extension().map_or(true, |e| e != "png")));
    assert_eq!(files.len(), 7);
}

#[test]
fn test_blacklist_prunes_subtree() {
    let dir = fixture();
    let root = dir.path().canonicalize().unwrap();

    let files = scan(&root, &["ignored_dir", ".git"], false);
    let found = names(&files, &root);
    assert!(!found.contains("ignored_dir/skip.txt"));
    assert!(!found.contains(".git/config"));
    assert!(found.contains("nested/deep.txt"));
}

#[test]
fn test_blacklist_matches_names_not_paths() {
    let dir = fixture();
    let root = dir.path().canonicalize().unwrap();

    // A multi-segment pattern never matches a single name
    let files = scan(&root, &["nested/deep.txt"], false);
    assert!(names(&files, &root).contains("nested/deep.txt"));
}

#[test]
fn test_whitelist_keeps_matching_files_only() {
    let dir = fixture();
    let root = dir.path().canonicalize().unwrap();

    let filter = FilterSpec::deny([".git"]).with_allow(["*.txt"]);
    let result = walker::scan(&root, &filter, false).unwrap();

    let expected: BTreeSet<String> = ["file1.txt", "nested/deep.txt", "ignored_dir/skip.txt"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    assert_eq!(names(&result.files, &root), expected);
}

#[test]
fn test_scan_is_deterministic() {
    let dir = fixture();
    let first = scan(dir.path(), &[], false);
    let second = scan(dir.path(), &[], false);
    assert_eq!(first, second);

    let filtered = scan(dir.path(), &["*.py", ".git"], false);
    assert_eq!(filtered, scan(dir.path(), &["*.py", ".git"], false));
    assert_eq!(filtered.len(), 5);
}

#[test]
fn test_shuffle_is_a_permutation() {
    let dir = fixture();
    let ordered = scan(dir.path(), &[], false);
    let shuffled = walker::scan(dir.path(), &FilterSpec::default(), true).unwrap();

    assert!(shuffled.shuffled);
    let a: BTreeSet<_> = ordered.into_iter().collect();
    let b: BTreeSet<_> = shuffled.files.into_iter().collect();
    assert_eq!(a, b);
}

#[cfg(unix)]
#[test]
fn test_unshuffled_scan_is_in_inode_order() {
    use std::os::unix::fs::MetadataExt;

    let dir = fixture();
    let scanner = DirScanner::new(FilterSpec::default().compile().unwrap(), false);
    let files = scanner.scan(dir.path()).unwrap().files;

    let inodes: Vec<u64> = files
        .iter()
        .map(|p| fs::symlink_metadata(p).unwrap().ino())
        .collect();
    let mut sorted = inodes.clone();
    sorted.sort_unstable();
    assert_eq!(inodes, sorted);
}

#[test]
fn test_scan_missing_root_is_an_error() {
    let dir = tempdir().unwrap();
    assert!(walker::scan(&dir.path().join("nope"), &FilterSpec::default(), false).is_err());
}

#[test]
fn test_chunked_read_native_returns_prefix() {
    let dir = fixture();
    let path = dir.path().join("file1.txt");
    let backend = build_backend(BackendKind::Native, 2, &CancellationToken::new());

    let outcome = backend
        .read_many(vec![ReadTask::new(&path, 5)])
        .unwrap()
        .next()
        .unwrap();
    assert_eq!(outcome.content.as_deref(), Some(&b"Hello"[..]));
    assert_eq!(outcome.len, 5);
}

#[test]
fn test_chunk_larger_than_file_reads_whole_file() {
    let dir = fixture();
    let path = dir.path().join("file1.txt");

    for kind in [BackendKind::Native, BackendKind::InProcess] {
        let backend = build_backend(kind, 1, &CancellationToken::new());
        let outcome = backend
            .read_many(vec![ReadTask::new(&path, 4096)])
            .unwrap()
            .next()
            .unwrap();
        assert_eq!(outcome.len, 11, "backend {kind}");
    }
}

#[test]
fn test_both_backends_preserve_input_order() {
    let dir = fixture();
    let files = scan(dir.path(), &[], false);

    for kind in [BackendKind::Native, BackendKind::InProcess] {
        let backend = build_backend(kind, 4, &CancellationToken::new());
        let read: Vec<PathBuf> = backend
            .read_many(ReadTask::batch(files.clone(), 0))
            .unwrap()
            .map(|o| o.path)
            .collect();
        assert_eq!(read, files, "backend {kind}");
    }
}

#[test]
fn test_backends_agree_on_lengths() {
    let dir = fixture();
    let files = scan(dir.path(), &[], false);

    let lengths = |kind| -> Vec<u64> {
        build_backend(kind, 3, &CancellationToken::new())
            .read_many(ReadTask::batch(files.clone(), 0))
            .unwrap()
            .map(|o| o.len)
            .collect()
    };
    assert_eq!(lengths(BackendKind::Native), lengths(BackendKind::InProcess));
}

#[test]
fn test_vanished_file_is_faulted_not_fatal() {
    let dir = fixture();
    let files = scan(dir.path(), &[], false);
    fs::remove_file(dir.path().join("file3.rs")).unwrap();

    let outcomes: Vec<_> = build_backend(BackendKind::InProcess, 2, &CancellationToken::new())
        .read_many(ReadTask::batch(files.clone(), 0))
        .unwrap()
        .collect();

    assert_eq!(outcomes.len(), files.len());
    let faulted: Vec<_> = outcomes
        .iter()
        .filter(|o| o.status == ReadStatus::Faulted)
        .collect();
    assert_eq!(faulted.len(), 1);
    assert!(faulted[0].path.ends_with("file3.rs"));
    assert_eq!(faulted[0].len, 0);
}

#[test]
fn test_harness_runs_both_backends() {
    let dir = fixture();

    for kind in [BackendKind::Native, BackendKind::InProcess] {
        let mut config = BenchConfig::new(dir.path());
        config.backend = kind;
        config.threads = 2;
        config.duration = Duration::from_secs(30);

        let mut harness = Harness::new(config).unwrap();
        match harness.run().unwrap() {
            RunOutcome::Completed(result) => {
                assert_eq!(result.backend, kind);
                assert_eq!(result.files, 7);
                assert!(!result.timed_out);
                assert!(result.result_line().starts_with(&format!("RESULT|{kind}|2|False|")));
            }
            RunOutcome::InsufficientDuration { files, .. } => assert_eq!(files, 7),
            other => panic!("unexpected outcome for {kind}: {other:?}"),
        }
    }
}

#[test]
fn test_harness_zero_duration_does_not_crash() {
    let dir = fixture();
    let mut config = BenchConfig::new(dir.path());
    config.duration = Duration::ZERO;

    match frio_bench::harness::run(config).unwrap() {
        RunOutcome::Completed(result) => {
            assert!(result.files >= 1);
            assert!(result.files <= 7);
        }
        RunOutcome::InsufficientDuration { files, .. } => assert!(files >= 1),
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[test]
fn test_harness_empty_directory() {
    let dir = tempdir().unwrap();
    fs::create_dir(dir.path().join("only_dirs")).unwrap();

    let outcome = frio_bench::harness::run(BenchConfig::new(dir.path())).unwrap();
    match outcome {
        RunOutcome::EmptyScan { scan } => assert_eq!(scan.dirs_scanned, 2),
        other => panic!("expected empty scan, got {other:?}"),
    }
}

#[test]
fn test_harness_blacklist_everything_is_empty() {
    let dir = fixture();
    let mut config = BenchConfig::new(dir.path());
    config.filter = FilterSpec::deny(["*"]);

    let outcome = frio_bench::harness::run(config).unwrap();
    assert!(matches!(outcome, RunOutcome::EmptyScan { .. }));
}

#[test]
fn test_harness_chunked_bytes() {
    let dir = fixture();
    let mut config = BenchConfig::new(dir.path());
    config.chunk_size = 2;
    config.duration = Duration::from_secs(30);

    match frio_bench::harness::run(config).unwrap() {
        RunOutcome::Completed(result) => assert_eq!(result.bytes, 14),
        RunOutcome::InsufficientDuration { bytes, .. } => assert_eq!(bytes, 14),
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[test]
fn test_budget_expiry_cancels_queued_pool_reads() {
    const FILES: usize = 2000;
    const THREADS: usize = 2;

    let dir = tempdir().unwrap();
    let files: Vec<PathBuf> = (0..FILES)
        .map(|i| {
            let path = dir.path().join(format!("f{i:04}"));
            fs::write(&path, [b'x'; 8]).unwrap();
            path
        })
        .collect();

    let token = CancellationToken::new();
    let backend = build_backend(BackendKind::InProcess, THREADS, &token);
    let budget = Duration::from_millis(50);

    let start = Instant::now();
    let stream = backend.read_many(ReadTask::batch(files, 0)).unwrap();
    // A slow consumer so the budget runs out with most files still queued
    let slow = stream.inspect(|_| thread::sleep(Duration::from_millis(2)));
    let totals = drain(slow, start, budget, &token, |_, _| {});
    let returned_after = start.elapsed();

    assert!(totals.timed_out);
    assert!(token.is_cancelled());
    assert!(totals.files < FILES as u64);
    assert!(totals.elapsed >= budget);
    // Teardown only waits for reads already in flight
    assert!(
        returned_after < budget + Duration::from_secs(2),
        "drain returned after {returned_after:?}"
    );
}
