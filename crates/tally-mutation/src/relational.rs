//! SQLite form of the cache.
//!
//! Schema (only the columns read here):
//! `SourceFile(id, filename)`, `Line(id, sourcefile, line_number, line)`,
//! `Mutant(id, line, status)`.

use std::path::Path;

use rusqlite::{Connection, OpenFlags};
use tally_core::TallyError;
use tracing::debug;

use crate::report::{SourceLocation, SurvivorRow};

const COUNTS_SQL: &str = "
    SELECT COUNT(*),
           COALESCE(SUM(CASE WHEN status IN ('killed', 'ok_killed') THEN 0 ELSE 1 END), 0)
    FROM Mutant";

// Outer joins and the NULL status check keep the listing in step with
// COUNTS_SQL when a row is incomplete.
const SURVIVORS_SQL: &str = "
    SELECT m.id, m.status, f.filename, l.line_number, l.line
    FROM Mutant m
    LEFT JOIN Line l ON m.line = l.id
    LEFT JOIN SourceFile f ON l.sourcefile = f.id
    WHERE m.status IS NULL OR m.status NOT IN ('killed', 'ok_killed')
    ORDER BY f.filename, l.line_number, m.id";

const UNKNOWN_FILE: &str = "(unknown file)";
const UNKNOWN_STATUS: &str = "(none)";

/// A read-only connection to a SQLite mutation cache.
pub struct RelationalCache {
    conn: Connection,
}

impl RelationalCache {
    /// Open the database at `path` read-only.
    ///
    /// # Errors
    ///
    /// Returns [`TallyError::Database`] if the database cannot be opened.
    pub fn open(path: &Path) -> Result<Self, TallyError> {
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .map_err(|e| TallyError::Database(format!("failed to open mutation cache: {e}")))?;
        Ok(Self { conn })
    }

    /// Wrap an existing connection (used by tests with in-memory databases).
    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    /// `(total, survived)`: survivors are mutants with any status other
    /// than `killed` or `ok_killed`.
    ///
    /// # Errors
    ///
    /// Returns [`TallyError::Database`] if the `Mutant` table is missing or
    /// unreadable.
    pub fn counts(&self) -> Result<(u64, u64), TallyError> {
        let (total, survived): (i64, i64) = self
            .conn
            .query_row(COUNTS_SQL, [], |row| Ok((row.get(0)?, row.get(1)?)))
            .map_err(|e| TallyError::Database(format!("failed to count mutants: {e}")))?;
        debug!(total, survived, "counted relational mutants");
        Ok((total.max(0) as u64, survived.max(0) as u64))
    }

    /// Mutants needing attention, ordered by filename then line number.
    ///
    /// A NULL status, filename or line number is rendered with a
    /// placeholder instead of failing the whole listing.
    ///
    /// # Errors
    ///
    /// Returns [`TallyError::Database`] if the query fails.
    pub fn survivors(&self) -> Result<Vec<SurvivorRow>, TallyError> {
        let db_err = |e: rusqlite::Error| {
            TallyError::Database(format!("failed to list surviving mutants: {e}"))
        };
        let mut stmt = self.conn.prepare(SURVIVORS_SQL).map_err(db_err)?;
        let rows = stmt
            .query_map([], |row| {
                let id: i64 = row.get(0)?;
                let status: Option<String> = row.get(1)?;
                let filename: Option<String> = row.get(2)?;
                let line: Option<String> = row.get(4)?;
                Ok(SurvivorRow {
                    id: id.to_string(),
                    status: status.unwrap_or_else(|| UNKNOWN_STATUS.to_string()),
                    location: Some(SourceLocation {
                        filename: filename.unwrap_or_else(|| UNKNOWN_FILE.to_string()),
                        line_number: row.get(3)?,
                        snippet: line.unwrap_or_default().trim().to_string(),
                    }),
                })
            })
            .map_err(db_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_err)?;
        debug!(count = rows.len(), "listed relational survivors");
        Ok(rows)
    }
}
