//! Cobertura-style coverage XML summaries.
//!
//! Reads the aggregate rates and line counts from the report root, then
//! ranks the packages that fall short of full line coverage.

pub mod parser;
pub mod summary;

pub use parser::{parse_report, read_report, CoverageReport, PackageCoverage};
pub use summary::{summarize, CoverageSummary, PackageRow, DEFAULT_TOP};
