use std::fmt;

use serde::Serialize;
use tally_core::percent;

/// Default cap on printed survivor rows.
pub const DEFAULT_LIMIT: usize = 200;

/// Aggregate mutation score.
///
/// # Examples
///
/// ```
/// use tally_mutation::MutationScore;
///
/// let score = MutationScore::new(3, 1);
/// assert_eq!(score.killed, 2);
/// assert!(score.to_string().contains("Mutation Score: 66.67%"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationScore {
    pub total: u64,
    pub killed: u64,
    pub survived: u64,
    /// `killed / total × 100`, or 0 when there are no mutants.
    pub score: f64,
}

impl MutationScore {
    /// Derive killed and score from the total and survivor counts.
    ///
    /// `survived` is capped at `total`.
    pub fn new(total: u64, survived: u64) -> Self {
        let survived = survived.min(total);
        let killed = total - survived;
        Self {
            total,
            killed,
            survived,
            score: percent(killed, total),
        }
    }
}

impl fmt::Display for MutationScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "\u{1f9ec} Mutation Testing Summary")?;
        writeln!(f, "===========================")?;
        writeln!(f, "Total Mutants: {}", self.total)?;
        writeln!(f, "Killed: {}", self.killed)?;
        writeln!(f, "Survived: {}", self.survived)?;
        writeln!(f, "Mutation Score: {:.2}%", self.score)
    }
}

/// Where a mutant lives in the source tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceLocation {
    pub filename: String,
    /// `None` when the cache has no line number for the mutant.
    pub line_number: Option<i64>,
    /// Source line, trimmed.
    pub snippet: String,
}

/// A mutant the tests did not kill.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SurvivorRow {
    pub id: String,
    pub status: String,
    /// Only relational caches record locations.
    pub location: Option<SourceLocation>,
}

impl fmt::Display for SurvivorRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(loc) => {
                write!(f, "{:<10} {}:", self.status, loc.filename)?;
                match loc.line_number {
                    Some(n) => write!(f, "{n}")?,
                    None => f.write_str("?")?,
                }
                write!(f, " -> {} (id={})", loc.snippet, self.id)
            }
            None => write!(f, "{:<10} {}", self.status, self.id),
        }
    }
}

/// Surviving mutants, truncated for display.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SurvivorListing {
    /// All mutants needing attention.
    pub total: usize,
    pub limit: usize,
    /// The first `limit` rows, in cache order.
    pub rows: Vec<SurvivorRow>,
}

impl SurvivorListing {
    /// Keep at most `limit` of `rows`, remembering how many there were.
    ///
    /// # Examples
    ///
    /// ```
    /// use tally_mutation::{SurvivorListing, SurvivorRow};
    ///
    /// let rows = (0..5)
    ///     .map(|i| SurvivorRow { id: format!("mut{i}"), status: "survived".into(), location: None })
    ///     .collect();
    /// let listing = SurvivorListing::new(rows, 2);
    /// assert_eq!(listing.rows.len(), 2);
    /// assert_eq!(listing.hidden(), 3);
    /// ```
    pub fn new(mut rows: Vec<SurvivorRow>, limit: usize) -> Self {
        let total = rows.len();
        rows.truncate(limit);
        Self { total, limit, rows }
    }

    /// Rows dropped by the limit.
    pub fn hidden(&self) -> usize {
        self.total - self.rows.len()
    }
}

impl fmt::Display for SurvivorListing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total mutants needing attention: {}", self.total)?;
        for row in &self.rows {
            writeln!(f, "{row}")?;
        }
        if self.hidden() > 0 {
            writeln!(
                f,
                "... and {} more (raise --limit to see them)",
                self.hidden()
            )?;
        }
        Ok(())
    }
}
