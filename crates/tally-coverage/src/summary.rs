use std::fmt;

use serde::Serialize;
use tally_core::format_thousands;

use crate::parser::CoverageReport;

/// How many of the lowest-covered packages are listed by default.
pub const DEFAULT_TOP: usize = 10;

/// Printable coverage summary.
///
/// # Examples
///
/// ```
/// use tally_coverage::{parse_report, summarize};
///
/// let xml = r#"<coverage line-rate="0.8" lines-valid="10" lines-covered="8"/>"#;
/// let summary = summarize(&parse_report(xml).unwrap(), 10);
/// assert_eq!(summary.lines_missing, 2);
/// assert!(summary.to_string().contains("Line Coverage: 80.00%"));
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageSummary {
    pub line_coverage: f64,
    pub branch_coverage: f64,
    pub total_lines: u64,
    pub lines_covered: u64,
    pub lines_missing: u64,
    pub total_packages: usize,
    /// Packages below 100%, before truncation to the listing size.
    pub packages_below_full: usize,
    /// Lowest-covered packages, ascending by coverage.
    pub lowest_packages: Vec<PackageRow>,
}

/// One line of the low-coverage listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageRow {
    pub name: String,
    /// Line coverage in percent.
    pub coverage: f64,
}

/// Build the summary, listing at most `top` packages below 100%.
///
/// Packages are sorted ascending by rate; ties keep document order.
pub fn summarize(report: &CoverageReport, top: usize) -> CoverageSummary {
    let mut below: Vec<PackageRow> = report
        .packages
        .iter()
        .filter(|p| p.line_rate < 1.0)
        .map(|p| PackageRow {
            name: p.name.clone(),
            coverage: p.line_rate * 100.0,
        })
        .collect();
    below.sort_by(|a, b| a.coverage.total_cmp(&b.coverage));
    let packages_below_full = below.len();
    below.truncate(top);

    CoverageSummary {
        line_coverage: report.line_rate * 100.0,
        branch_coverage: report.branch_rate * 100.0,
        total_lines: report.lines_valid,
        lines_covered: report.lines_covered,
        lines_missing: report.lines_valid.saturating_sub(report.lines_covered),
        total_packages: report.packages.len(),
        packages_below_full,
        lowest_packages: below,
    }
}

impl fmt::Display for CoverageSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "\u{1f4ca} Coverage Summary")?;
        writeln!(f, "===================")?;
        writeln!(f, "Line Coverage: {:.2}%", self.line_coverage)?;
        writeln!(f, "Branch Coverage: {:.2}%", self.branch_coverage)?;
        writeln!(f, "Total Lines: {}", format_thousands(self.total_lines))?;
        writeln!(f, "Lines Covered: {}", format_thousands(self.lines_covered))?;
        writeln!(f, "Lines Missing: {}", format_thousands(self.lines_missing))?;
        writeln!(f)?;

        if self.packages_below_full == 0 {
            return writeln!(f, "\u{2705} All packages have 100% line coverage");
        }

        writeln!(
            f,
            "\u{1f4c9} Lowest coverage packages ({} of {} below 100%):",
            self.packages_below_full, self.total_packages
        )?;
        for row in &self.lowest_packages {
            let name = if row.name.is_empty() {
                "(unnamed)"
            } else {
                row.name.as_str()
            };
            writeln!(f, "  {name}: {:.1}%", row.coverage)?;
        }
        Ok(())
    }
}
