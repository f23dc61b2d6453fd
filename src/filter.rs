//! Name filters for the directory scanner
//!
//! Patterns are shell-style globs (`*`, `?`, `[...]`) matched against a single
//! entry name, never against a multi-segment path. Matching is case-sensitive
//! and several patterns combine with logical OR. A backslash is an ordinary
//! character, and an unclosed `[` is rejected as an invalid pattern.
//!
//! A deny set with no patterns matches nothing and an allow set with no
//! patterns matches everything, so an empty [`FilterSpec`] keeps every entry.

use crate::error::ConfigError;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::ffi::OsStr;
use std::path::Path;

/// Uncompiled allow/deny pattern sets
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSpec {
    /// Entries whose name matches are skipped, subtree included
    pub deny: Vec<String>,

    /// When non-empty, only files whose name matches are kept
    pub allow: Vec<String>,
}

impl FilterSpec {
    /// Filter with deny patterns only
    pub fn deny<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            deny: patterns.into_iter().map(Into::into).collect(),
            allow: Vec::new(),
        }
    }

    /// Add allow patterns
    pub fn with_allow<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allow = patterns.into_iter().map(Into::into).collect();
        self
    }

    /// Compile both pattern sets
    pub fn compile(&self) -> Result<CompiledFilter, ConfigError> {
        Ok(CompiledFilter {
            deny: NameMatcher::compile(&self.deny)?,
            allow: NameMatcher::compile(&self.allow)?,
        })
    }
}

/// A compiled set of name globs
#[derive(Debug, Clone)]
pub struct NameMatcher {
    set: Option<GlobSet>,
}

impl NameMatcher {
    /// Compile a list of glob patterns into one matcher
    pub fn compile<S: AsRef<str>>(patterns: &[S]) -> Result<Self, ConfigError> {
        if patterns.is_empty() {
            return Ok(Self { set: None });
        }

        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let pattern = pattern.as_ref();
            let glob = GlobBuilder::new(pattern)
                .literal_separator(true)
                .case_insensitive(false)
                .backslash_escape(false)
                .build()
                .map_err(|e| ConfigError::InvalidPattern {
                    pattern: pattern.to_string(),
                    reason: e.to_string(),
                })?;
            builder.add(glob);
        }

        let set = builder.build().map_err(|e| ConfigError::InvalidPattern {
            pattern: patterns
                .iter()
                .map(|p| p.as_ref())
                .collect::<Vec<_>>()
                .join(", "),
            reason: e.to_string(),
        })?;

        Ok(Self { set: Some(set) })
    }

    /// True when no patterns were given
    pub fn is_empty(&self) -> bool {
        self.set.is_none()
    }

    /// Does any pattern match this entry name? Always false when empty.
    pub fn matches(&self, name: &OsStr) -> bool {
        match &self.set {
            Some(set) => set.is_match(Path::new(name)),
            None => false,
        }
    }
}

/// Compiled [`FilterSpec`], built once per run
#[derive(Debug, Clone)]
pub struct CompiledFilter {
    deny: NameMatcher,
    allow: NameMatcher,
}

impl CompiledFilter {
    /// Filter that keeps everything
    pub fn pass_all() -> Self {
        Self {
            deny: NameMatcher { set: None },
            allow: NameMatcher { set: None },
        }
    }

    /// Checked first, for every entry kind
    pub fn is_denied(&self, name: &OsStr) -> bool {
        self.deny.matches(name)
    }

    /// Only consulted for files
    pub fn is_allowed(&self, name: &OsStr) -> bool {
        self.allow.is_empty() || self.allow.matches(name)
    }
}
