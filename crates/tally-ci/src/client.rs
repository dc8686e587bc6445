use serde::de::DeserializeOwned;
use tally_core::TallyError;
use tracing::debug;

use crate::models::{Job, JobsPage, RepoSlug, RunMode, RunsPage, WorkflowRun};

/// Default number of completed runs scanned in [`RunMode::LatestFailed`].
pub const DEFAULT_FAILED_WINDOW: u32 = 5;

/// Query describing which runs to list for a branch.
///
/// # Examples
///
/// ```
/// use tally_ci::client::RunFilter;
/// use tally_ci::models::RunMode;
///
/// let filter = RunFilter::new("main", RunMode::LatestFailed);
/// let params = filter.query_params();
/// assert!(params.contains(&("status", "completed".to_string())));
/// assert!(params.contains(&("per_page", "5".to_string())));
/// ```
#[derive(Debug, Clone)]
pub struct RunFilter {
    /// Branch to filter runs on.
    pub branch: String,
    /// Selection mode.
    pub mode: RunMode,
    /// Page size used in [`RunMode::LatestFailed`].
    pub failed_window: u32,
}

impl RunFilter {
    /// Filter for `branch` with the default failure window.
    pub fn new(branch: impl Into<String>, mode: RunMode) -> Self {
        Self {
            branch: branch.into(),
            mode,
            failed_window: DEFAULT_FAILED_WINDOW,
        }
    }

    /// Query string parameters for the runs listing endpoint.
    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("branch", self.branch.clone())];
        match self.mode {
            RunMode::Latest => params.push(("per_page", "1".into())),
            RunMode::LatestFailed => {
                params.push(("per_page", self.failed_window.max(1).to_string()));
                params.push(("status", "completed".into()));
            }
        }
        params
    }
}

/// Read-only client for the GitHub Actions REST API.
///
/// Requests are anonymous unless a token is supplied, in which case it is
/// sent as a bearer `Authorization` header.
///
/// # Examples
///
/// ```
/// use tally_ci::client::CiClient;
///
/// let client = CiClient::new("https://api.github.com", None).unwrap();
/// assert!(!client.is_authenticated());
/// ```
pub struct CiClient {
    http: reqwest::Client,
    api_base: String,
    token: Option<String>,
}

impl CiClient {
    /// Create a client rooted at `api_base`.
    ///
    /// # Errors
    ///
    /// Returns [`TallyError::Http`] if the HTTP client cannot be built.
    pub fn new(api_base: &str, token: Option<String>) -> Result<Self, TallyError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("tally/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TallyError::Http(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.trim().is_empty()),
        })
    }

    /// Whether requests carry an `Authorization` header.
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// List workflow runs for a branch, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`TallyError::Http`] on network failures, [`TallyError::Api`]
    /// on non-success responses, or [`TallyError::Parse`] if the body is not
    /// the expected JSON.
    pub async fn list_runs(
        &self,
        slug: &RepoSlug,
        filter: &RunFilter,
    ) -> Result<Vec<WorkflowRun>, TallyError> {
        let url = format!(
            "{}/repos/{}/{}/actions/runs",
            self.api_base, slug.owner, slug.name
        );
        let page: RunsPage = self.get_json(&url, &filter.query_params()).await?;
        let runs = page.into_runs();
        debug!(count = runs.len(), branch = %filter.branch, "listed workflow runs");
        Ok(runs)
    }

    /// List the jobs of a run.
    ///
    /// # Errors
    ///
    /// Same as [`CiClient::list_runs`].
    pub async fn list_jobs(&self, slug: &RepoSlug, run_id: u64) -> Result<Vec<Job>, TallyError> {
        let url = format!(
            "{}/repos/{}/{}/actions/runs/{run_id}/jobs",
            self.api_base, slug.owner, slug.name
        );
        let page: JobsPage = self.get_json(&url, &[]).await?;
        let jobs = page.into_jobs();
        debug!(count = jobs.len(), run_id, "listed jobs");
        Ok(jobs)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&'static str, String)],
    ) -> Result<T, TallyError> {
        debug!(%url, ?query, authenticated = self.is_authenticated(), "GET");

        let mut request = self
            .http
            .get(url)
            .query(query)
            .header("Accept", "application/vnd.github+json");
        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("Bearer {token}"));
        }

        let response = request
            .send()
            .await
            .map_err(|e| TallyError::Http(format!("request to {url} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TallyError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| TallyError::Http(format!("failed to read response: {e}")))?;
        serde_json::from_str(&body)
            .map_err(|e| TallyError::Parse(format!("unexpected response from {url}: {e}")))
    }
}

/// Environment variables checked for an API token, in order.
pub const TOKEN_VARS: [&str; 2] = ["GITHUB_TOKEN", "GH_TOKEN"];

/// The first token variable with a non-blank value, and that value.
pub fn token_source() -> Option<(&'static str, String)> {
    first_token(|var| std::env::var(var).ok())
}

/// Read an API token from `GITHUB_TOKEN`, falling back to `GH_TOKEN`.
pub fn token_from_env() -> Option<String> {
    token_source().map(|(_, token)| token)
}

fn first_token(lookup: impl Fn(&str) -> Option<String>) -> Option<(&'static str, String)> {
    TOKEN_VARS.iter().find_map(|&var| {
        let token = lookup(var)?;
        (!token.trim().is_empty()).then_some((var, token))
    })
}
