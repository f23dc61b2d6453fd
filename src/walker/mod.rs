//! Local filesystem walker
//!
//! Produces the ordered file list that every read backend consumes. The walk
//! is single-threaded and stack-based so that its output order is
//! reproducible across runs on an unchanged tree.

pub mod scanner;

pub use scanner::{DirScanner, ScanResult, ScanStats};

use crate::error::Result;
use crate::filter::FilterSpec;
use std::path::Path;

/// Compile `filter` and scan `root` in one call
pub fn scan(root: &Path, filter: &FilterSpec, randomize: bool) -> Result<ScanResult> {
    let compiled = filter.compile()?;
    Ok(DirScanner::new(compiled, randomize).scan(root)?)
}
