use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Serialize;
use tally_core::TallyError;
use tracing::debug;

use crate::document::DocumentCache;
use crate::relational::RelationalCache;
use crate::report::{MutationScore, SurvivorListing};

const SQLITE_MAGIC: &[u8; 16] = b"SQLite format 3\0";

/// On-disk shape of a mutation cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheShape {
    /// JSON object keyed by mutant id.
    Document,
    /// SQLite database.
    Relational,
}

impl fmt::Display for CacheShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheShape::Document => write!(f, "document"),
            CacheShape::Relational => write!(f, "relational"),
        }
    }
}

/// Detect the cache shape from its leading bytes.
///
/// # Errors
///
/// Returns [`TallyError::FileNotFound`] if `path` does not exist, or
/// [`TallyError::Io`] if it cannot be read.
pub fn probe(path: &Path) -> Result<CacheShape, TallyError> {
    if !path.exists() {
        return Err(TallyError::FileNotFound(path.to_path_buf()));
    }
    let mut header = Vec::with_capacity(SQLITE_MAGIC.len());
    File::open(path)?
        .take(SQLITE_MAGIC.len() as u64)
        .read_to_end(&mut header)?;

    let shape = if header == SQLITE_MAGIC {
        CacheShape::Relational
    } else {
        CacheShape::Document
    };
    debug!(path = %path.display(), ?shape, "probed mutation cache");
    Ok(shape)
}

/// An opened mutation cache of either shape.
pub enum MutationCache {
    Document(DocumentCache),
    Relational(RelationalCache),
}

impl MutationCache {
    /// Probe `path` and open it with the matching reader.
    ///
    /// # Errors
    ///
    /// See [`probe`], [`DocumentCache::open`] and [`RelationalCache::open`].
    pub fn open(path: &Path) -> Result<Self, TallyError> {
        match probe(path)? {
            CacheShape::Document => Ok(Self::Document(DocumentCache::open(path)?)),
            CacheShape::Relational => Ok(Self::Relational(RelationalCache::open(path)?)),
        }
    }

    /// Which reader is in use.
    pub fn shape(&self) -> CacheShape {
        match self {
            Self::Document(_) => CacheShape::Document,
            Self::Relational(_) => CacheShape::Relational,
        }
    }

    /// Total, killed, survived and score.
    ///
    /// # Errors
    ///
    /// Returns [`TallyError::Database`] if a relational cache cannot be
    /// queried.
    pub fn score(&self) -> Result<MutationScore, TallyError> {
        let (total, survived) = match self {
            Self::Document(doc) => doc.counts(),
            Self::Relational(db) => db.counts()?,
        };
        Ok(MutationScore::new(total, survived))
    }

    /// Mutants needing attention, at most `limit` of them kept for display.
    ///
    /// # Errors
    ///
    /// Same as [`MutationCache::score`].
    pub fn survivors(&self, limit: usize) -> Result<SurvivorListing, TallyError> {
        let rows = match self {
            Self::Document(doc) => doc.survivors(),
            Self::Relational(db) => db.survivors()?,
        };
        Ok(SurvivorListing::new(rows, limit))
    }
}
