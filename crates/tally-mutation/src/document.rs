//! JSON document form of the cache.

use std::path::Path;

use serde_json::{Map, Value};
use tally_core::TallyError;
use tracing::debug;

use crate::is_dead;
use crate::report::SurvivorRow;

const MUTANT_PREFIX: &str = "mut";

/// A JSON cache: one object keyed by mutant id.
///
/// Keys starting with `mut` are mutants; anything else is metadata.
///
/// # Examples
///
/// ```
/// use tally_mutation::document::DocumentCache;
///
/// let cache = DocumentCache::from_json(r#"{"mut1": {"status": "survived"}, "version": 2}"#).unwrap();
/// assert_eq!(cache.counts(), (1, 1));
/// ```
#[derive(Debug)]
pub struct DocumentCache {
    entries: Map<String, Value>,
}

impl DocumentCache {
    /// Read the cache file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`TallyError::Io`] if the file cannot be read, otherwise see
    /// [`DocumentCache::from_json`]. Bytes that are not UTF-8 are a
    /// [`TallyError::Serialization`] error like any other bad JSON.
    pub fn open(path: &Path) -> Result<Self, TallyError> {
        let bytes = std::fs::read(path)?;
        Self::from_value(serde_json::from_slice(&bytes)?)
    }

    /// Parse a cache from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`TallyError::Serialization`] if the text is not JSON, or
    /// [`TallyError::Parse`] if the top level is not an object.
    pub fn from_json(content: &str) -> Result<Self, TallyError> {
        Self::from_value(serde_json::from_str(content)?)
    }

    fn from_value(value: Value) -> Result<Self, TallyError> {
        match value {
            Value::Object(entries) => {
                debug!(keys = entries.len(), "loaded document mutation cache");
                Ok(Self { entries })
            }
            other => Err(TallyError::Parse(format!(
                "mutation cache must be a JSON object, found {}",
                kind(&other)
            ))),
        }
    }

    fn mutants(&self) -> impl Iterator<Item = (&String, &Value)> + '_ {
        self.entries
            .iter()
            .filter(|(key, _)| key.starts_with(MUTANT_PREFIX))
    }

    /// `(total, survived)`: survivors are records whose `status` is
    /// exactly `survived`.
    pub fn counts(&self) -> (u64, u64) {
        let mut total = 0;
        let mut survived = 0;
        for (_, value) in self.mutants() {
            total += 1;
            if status(value) == Some("survived") {
                survived += 1;
            }
        }
        (total, survived)
    }

    /// Mutant records whose status is not a killed status, ordered by key.
    ///
    /// Values that are not records, or have no string `status`, are skipped.
    pub fn survivors(&self) -> Vec<SurvivorRow> {
        let mut rows: Vec<SurvivorRow> = self
            .mutants()
            .filter_map(|(key, value)| {
                let status = status(value)?;
                (!is_dead(status)).then(|| SurvivorRow {
                    id: key.clone(),
                    status: status.to_string(),
                    location: None,
                })
            })
            .collect();
        rows.sort_by(|a, b| a.id.cmp(&b.id));
        rows
    }
}

fn status(value: &Value) -> Option<&str> {
    value.as_object()?.get("status")?.as_str()
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CACHE: &str = r#"{
        "mut1": {"status": "survived"},
        "mut2": {"status": "killed"},
        "mut3": {"status": "killed"},
        "meta": {"ignored": true}
    }"#;

    #[test]
    fn counts_only_mutant_keys() {
        let cache = DocumentCache::from_json(CACHE).unwrap();
        assert_eq!(cache.counts(), (3, 1));
    }

    #[test]
    fn non_record_values_count_but_never_survive() {
        let cache =
            DocumentCache::from_json(r#"{"mut1": "survived", "mut2": {"status": 3}}"#).unwrap();
        assert_eq!(cache.counts(), (2, 0));
        assert!(cache.survivors().is_empty());
    }

    #[test]
    fn survivors_exclude_dead_statuses() {
        let cache = DocumentCache::from_json(
            r#"{
                "mut_b": {"status": "timeout"},
                "mut_a": {"status": "survived"},
                "mut_c": {"status": "ok_killed"},
                "mut_d": {"status": "killed"},
                "notes": {"status": "survived"}
            }"#,
        )
        .unwrap();
        let rows = cache.survivors();
        let ids: Vec<&str> = rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["mut_a", "mut_b"]);
        assert!(rows.iter().all(|r| !is_dead(&r.status)));
    }

    #[test]
    fn top_level_array_is_rejected() {
        let err = DocumentCache::from_json("[1, 2]").unwrap_err();
        assert!(err.to_string().contains("an array"));
        assert!(err.is_malformed_input());
    }

    #[test]
    fn non_utf8_file_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".mutmut-cache");
        std::fs::write(&path, [0xff, 0xfe, 0x00, 0x7b]).unwrap();
        let err = DocumentCache::open(&path).err().unwrap();
        assert!(err.is_malformed_input(), "unexpected error kind: {err}");
    }

    #[test]
    fn invalid_json_is_malformed() {
        let err = DocumentCache::from_json("{not json").unwrap_err();
        assert!(err.is_malformed_input());
    }
}
