//! Run selection and the operator-facing inspection report.

use std::fmt;

use serde::Serialize;
use tally_core::TallyError;
use tracing::debug;

use crate::client::{CiClient, RunFilter};
use crate::models::{Job, RepoSlug, RunMode, WorkflowRun};

/// Pick the run of interest from a newest-first listing.
///
/// [`RunMode::Latest`] takes the first run; [`RunMode::LatestFailed`] takes
/// the first run whose conclusion is `failure`.
///
/// # Examples
///
/// ```
/// use tally_ci::inspect::select_run;
/// use tally_ci::models::RunMode;
///
/// assert!(select_run(&[], RunMode::Latest).is_none());
/// ```
pub fn select_run(runs: &[WorkflowRun], mode: RunMode) -> Option<&WorkflowRun> {
    match mode {
        RunMode::Latest => runs.first(),
        RunMode::LatestFailed => runs.iter().find(|r| r.is_failure()),
    }
}

/// The selected run, reduced to what the report shows.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub id: u64,
    pub run_number: u64,
    /// Conclusion label, `None` while the run is still going.
    pub conclusion: Option<String>,
    pub url: String,
}

impl From<&WorkflowRun> for RunSummary {
    fn from(run: &WorkflowRun) -> Self {
        Self {
            id: run.id,
            run_number: run.run_number,
            conclusion: run.conclusion.map(|c| c.to_string()),
            url: run.html_url.clone(),
        }
    }
}

/// The first job of the selected run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSummary {
    pub id: u64,
    pub name: String,
    pub url: String,
}

impl From<&Job> for JobSummary {
    fn from(job: &Job) -> Self {
        Self {
            id: job.id,
            name: job.name.clone(),
            url: job.html_url.clone(),
        }
    }
}

/// Result of inspecting a branch.
///
/// `run` is `None` when nothing matched the mode; `job` is `None` when the
/// selected run has no jobs. Both cases map to exit code 1.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectReport {
    pub repo: String,
    pub branch: String,
    pub mode: RunMode,
    /// Runs scanned for a failure; only meaningful in `latest-failed` mode.
    pub window: u32,
    pub run: Option<RunSummary>,
    pub job: Option<JobSummary>,
}

impl InspectReport {
    /// Process exit code for this outcome.
    ///
    /// # Examples
    ///
    /// ```
    /// use tally_ci::inspect::InspectReport;
    /// use tally_ci::models::RunMode;
    ///
    /// let report = InspectReport {
    ///     repo: "acme/app".into(),
    ///     branch: "main".into(),
    ///     mode: RunMode::Latest,
    ///     window: 1,
    ///     run: None,
    ///     job: None,
    /// };
    /// assert_eq!(report.exit_code(), 1);
    /// ```
    pub fn exit_code(&self) -> i32 {
        if self.run.is_some() && self.job.is_some() {
            0
        } else {
            1
        }
    }

    fn log_hint(&self, run: &RunSummary) -> String {
        let flag = match self.mode {
            RunMode::Latest => "--log",
            RunMode::LatestFailed => "--log-failed",
        };
        format!("gh run view {} --repo {} {flag}", run.id, self.repo)
    }
}

impl fmt::Display for InspectReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(run) = &self.run else {
            return match self.mode {
                RunMode::Latest => writeln!(
                    f,
                    "\u{274c} No runs found for branch '{}' in {}",
                    self.branch, self.repo
                ),
                RunMode::LatestFailed => writeln!(
                    f,
                    "\u{2705} No failed runs found in the last {} completed runs on '{}' in {}",
                    self.window, self.branch, self.repo
                ),
            };
        };

        let heading = match self.mode {
            RunMode::Latest => "Latest run",
            RunMode::LatestFailed => "Latest failed run",
        };
        writeln!(
            f,
            "\u{1f50d} {heading} on '{}' in {}",
            self.branch, self.repo
        )?;
        writeln!(
            f,
            "Run #{}: {}",
            run.run_number,
            run.conclusion.as_deref().unwrap_or("N/A")
        )?;
        writeln!(f, "URL: {}", run.url)?;

        let Some(job) = &self.job else {
            return writeln!(f, "\u{274c} No jobs found for run #{}", run.run_number);
        };
        writeln!(f, "Job: {}", job.name)?;
        writeln!(f, "Job URL: {}", job.url)?;
        writeln!(f)?;
        writeln!(
            f,
            "\u{1f4a1} Full logs are not downloaded here. Fetch them with:\n   {}",
            self.log_hint(run)
        )
    }
}

/// Find the run of interest on `filter.branch` and resolve its first job.
///
/// # Errors
///
/// Propagates transport and API errors from [`CiClient`]. An empty listing
/// is not an error; it yields a report whose `run` or `job` is `None`.
pub async fn inspect(
    client: &CiClient,
    slug: &RepoSlug,
    filter: &RunFilter,
) -> Result<InspectReport, TallyError> {
    let mut report = InspectReport {
        repo: slug.to_string(),
        branch: filter.branch.clone(),
        mode: filter.mode,
        window: match filter.mode {
            RunMode::Latest => 1,
            RunMode::LatestFailed => filter.failed_window.max(1),
        },
        run: None,
        job: None,
    };

    let runs = client.list_runs(slug, filter).await?;
    let Some(run) = select_run(&runs, filter.mode) else {
        debug!(scanned = runs.len(), mode = %filter.mode, "no matching run");
        return Ok(report);
    };
    report.run = Some(RunSummary::from(run));

    let jobs = client.list_jobs(slug, run.id).await?;
    report.job = jobs.first().map(JobSummary::from);
    Ok(report)
}
