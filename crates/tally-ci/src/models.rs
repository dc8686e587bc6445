use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tally_core::TallyError;

/// A repository slug in `owner/name` form.
///
/// # Examples
///
/// ```
/// use tally_ci::models::RepoSlug;
///
/// let slug = RepoSlug::parse("rust-lang/rust").unwrap();
/// assert_eq!(slug.owner, "rust-lang");
/// assert_eq!(slug.name, "rust");
/// assert_eq!(slug.to_string(), "rust-lang/rust");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepoSlug {
    /// Account or organization owning the repository.
    pub owner: String,
    /// Repository name.
    pub name: String,
}

impl RepoSlug {
    /// Parse an `owner/name` string.
    ///
    /// # Errors
    ///
    /// Returns [`TallyError::Config`] if the format is invalid.
    pub fn parse(slug: &str) -> Result<Self, TallyError> {
        let invalid =
            || TallyError::Config(format!("invalid repository '{slug}', expected owner/name"));
        let (owner, name) = slug.trim().split_once('/').ok_or_else(invalid)?;
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return Err(invalid());
        }
        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }
}

impl fmt::Display for RepoSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Which run to pick for a branch.
///
/// # Examples
///
/// ```
/// use tally_ci::models::RunMode;
///
/// let mode: RunMode = "latest-failed".parse().unwrap();
/// assert_eq!(mode, RunMode::LatestFailed);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunMode {
    /// The most recent run, whatever its state.
    #[default]
    Latest,
    /// The most recent completed run that concluded with a failure.
    LatestFailed,
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunMode::Latest => write!(f, "latest"),
            RunMode::LatestFailed => write!(f, "latest-failed"),
        }
    }
}

impl FromStr for RunMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "latest" => Ok(RunMode::Latest),
            "latest-failed" | "failed" => Ok(RunMode::LatestFailed),
            other => Err(format!("unknown run mode: {other}")),
        }
    }
}

/// Terminal outcome the provider attaches to a finished run or job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Conclusion {
    Success,
    Failure,
    Cancelled,
    Skipped,
    Neutral,
    TimedOut,
    ActionRequired,
    Stale,
    StartupFailure,
    /// Any label this client does not know about.
    #[serde(other)]
    Other,
}

impl fmt::Display for Conclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Conclusion::Success => "success",
            Conclusion::Failure => "failure",
            Conclusion::Cancelled => "cancelled",
            Conclusion::Skipped => "skipped",
            Conclusion::Neutral => "neutral",
            Conclusion::TimedOut => "timed_out",
            Conclusion::ActionRequired => "action_required",
            Conclusion::Stale => "stale",
            Conclusion::StartupFailure => "startup_failure",
            Conclusion::Other => "other",
        };
        f.write_str(label)
    }
}

/// Lifecycle state of a run or job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    Completed,
    Waiting,
    Requested,
    Pending,
    #[serde(other)]
    Other,
}

/// One execution of a workflow, as returned by `GET .../actions/runs`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowRun {
    /// Opaque run identifier used in API paths.
    pub id: u64,
    /// Sequential number shown in the UI.
    pub run_number: u64,
    /// Lifecycle state.
    #[serde(default)]
    pub status: Option<RunStatus>,
    /// Terminal outcome; `None` until the run completes.
    #[serde(default)]
    pub conclusion: Option<Conclusion>,
    /// Browser link to the run.
    pub html_url: String,
    /// Branch the run was triggered on.
    #[serde(default)]
    pub head_branch: Option<String>,
}

impl WorkflowRun {
    /// Whether the run concluded with a failure.
    pub fn is_failure(&self) -> bool {
        self.conclusion == Some(Conclusion::Failure)
    }
}

/// A unit of work inside a run, as returned by `GET .../runs/{id}/jobs`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: u64,
    #[serde(default)]
    pub run_id: Option<u64>,
    pub name: String,
    pub html_url: String,
    #[serde(default)]
    pub status: Option<RunStatus>,
    #[serde(default)]
    pub conclusion: Option<Conclusion>,
}

/// Response body of the runs listing endpoint.
///
/// A missing or `null` `workflow_runs` key reads as an empty listing.
#[derive(Debug, Default, Deserialize)]
pub struct RunsPage {
    #[serde(default)]
    pub total_count: Option<u64>,
    #[serde(default)]
    pub workflow_runs: Option<Vec<WorkflowRun>>,
}

impl RunsPage {
    /// Consume the page, yielding its runs.
    pub fn into_runs(self) -> Vec<WorkflowRun> {
        self.workflow_runs.unwrap_or_default()
    }
}

/// Response body of the jobs listing endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct JobsPage {
    #[serde(default)]
    pub total_count: Option<u64>,
    #[serde(default)]
    pub jobs: Option<Vec<Job>>,
}

impl JobsPage {
    /// Consume the page, yielding its jobs.
    pub fn into_jobs(self) -> Vec<Job> {
        self.jobs.unwrap_or_default()
    }
}
