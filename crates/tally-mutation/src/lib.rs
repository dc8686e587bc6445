//! Mutation-testing cache reports: score summary and surviving mutants.
//!
//! The cache at `.mutmut-cache` comes in two shapes depending on the tool
//! version: a JSON document keyed by mutant id, or a SQLite database with
//! `SourceFile`, `Line` and `Mutant` tables. [`cache::MutationCache::open`]
//! probes the file and picks the matching reader.

pub mod cache;
pub mod document;
pub mod relational;
pub mod report;

use std::path::Path;

use tally_core::TallyError;

pub use cache::{probe, CacheShape, MutationCache};
pub use report::{MutationScore, SourceLocation, SurvivorListing, SurvivorRow, DEFAULT_LIMIT};

/// Statuses that mean a mutant was caught by the test suite.
pub const DEAD_STATUSES: [&str; 2] = ["killed", "ok_killed"];

/// Whether `status` marks a mutant the tests caught.
///
/// # Examples
///
/// ```
/// assert!(tally_mutation::is_dead("ok_killed"));
/// assert!(!tally_mutation::is_dead("bad_timeout"));
/// ```
pub fn is_dead(status: &str) -> bool {
    DEAD_STATUSES.contains(&status)
}

/// Open the cache at `path` and compute its mutation score.
///
/// # Errors
///
/// Returns [`TallyError::FileNotFound`] if there is no cache, or a
/// malformed-input error (see [`TallyError::is_malformed_input`]) if it
/// cannot be read.
pub fn score(path: &Path) -> Result<MutationScore, TallyError> {
    MutationCache::open(path)?.score()
}

/// Open the cache at `path` and list mutants needing attention.
///
/// # Errors
///
/// Same as [`score`].
pub fn survivors(path: &Path, limit: usize) -> Result<SurvivorListing, TallyError> {
    MutationCache::open(path)?.survivors(limit)
}
