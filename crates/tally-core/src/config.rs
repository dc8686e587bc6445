use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::TallyError;

/// File name tally looks for in the working directory.
pub const CONFIG_FILE_NAME: &str = ".tally.toml";

/// Top-level configuration loaded from `.tally.toml`.
///
/// Supports layered resolution: CLI flags > env vars > local config > defaults.
///
/// # Examples
///
/// ```
/// use tally_core::TallyConfig;
///
/// let config = TallyConfig::default();
/// assert_eq!(config.mutation.limit, 200);
/// assert_eq!(config.coverage.top, 10);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TallyConfig {
    /// CI provider settings.
    #[serde(default)]
    pub ci: CiConfig,
    /// Coverage report settings.
    #[serde(default)]
    pub coverage: CoverageConfig,
    /// Mutation cache settings.
    #[serde(default)]
    pub mutation: MutationConfig,
}

impl TallyConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`TallyError::Io`] if the file cannot be read, or
    /// [`TallyError::Toml`] if the content is not valid TOML.
    pub fn from_file(path: &Path) -> Result<Self, TallyError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`TallyError::Toml`] if parsing fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use tally_core::TallyConfig;
    ///
    /// let toml = r#"
    /// [ci]
    /// repo = "octocat/hello-world"
    /// "#;
    /// let config = TallyConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.ci.repo.as_deref(), Some("octocat/hello-world"));
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, TallyError> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }
}

/// CI provider configuration.
///
/// # Examples
///
/// ```
/// use tally_core::CiConfig;
///
/// let config = CiConfig::default();
/// assert_eq!(config.api_base, "https://api.github.com");
/// assert_eq!(config.failed_window, 5);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CiConfig {
    /// Repository slug (`owner/name`).
    pub repo: Option<String>,
    /// Branch to inspect.
    pub branch: Option<String>,
    /// Base URL of the REST API.
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// How many completed runs to scan when looking for a failure.
    #[serde(default = "default_failed_window")]
    pub failed_window: u32,
}

fn default_api_base() -> String {
    "https://api.github.com".into()
}

fn default_failed_window() -> u32 {
    5
}

impl Default for CiConfig {
    fn default() -> Self {
        Self {
            repo: None,
            branch: None,
            api_base: default_api_base(),
            failed_window: default_failed_window(),
        }
    }
}

/// Coverage report configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverageConfig {
    /// Path to the coverage XML (default: `coverage.xml`).
    #[serde(default = "default_coverage_path")]
    pub path: PathBuf,
    /// Number of lowest-covered packages to list (default: 10).
    #[serde(default = "default_top")]
    pub top: usize,
}

fn default_coverage_path() -> PathBuf {
    PathBuf::from("coverage.xml")
}

fn default_top() -> usize {
    10
}

impl Default for CoverageConfig {
    fn default() -> Self {
        Self {
            path: default_coverage_path(),
            top: default_top(),
        }
    }
}

/// Mutation cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutationConfig {
    /// Path to the mutation cache (default: `.mutmut-cache`).
    #[serde(default = "default_cache_path")]
    pub cache: PathBuf,
    /// Maximum survivor rows to print (default: 200).
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_cache_path() -> PathBuf {
    PathBuf::from(".mutmut-cache")
}

fn default_limit() -> usize {
    200
}

impl Default for MutationConfig {
    fn default() -> Self {
        Self {
            cache: default_cache_path(),
            limit: default_limit(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let config = TallyConfig::default();
        assert!(config.ci.repo.is_none());
        assert!(config.ci.branch.is_none());
        assert_eq!(config.ci.api_base, "https://api.github.com");
        assert_eq!(config.ci.failed_window, 5);
        assert_eq!(config.coverage.path, PathBuf::from("coverage.xml"));
        assert_eq!(config.coverage.top, 10);
        assert_eq!(config.mutation.cache, PathBuf::from(".mutmut-cache"));
        assert_eq!(config.mutation.limit, 200);
    }

    #[test]
    fn parse_full_toml() {
        let toml = r#"
[ci]
repo = "acme/podcaster"
branch = "develop"
api_base = "https://ghe.example.com/api/v3"
failed_window = 20

[coverage]
path = "reports/coverage.xml"
top = 5

[mutation]
cache = "build/.mutmut-cache"
limit = 50
"#;
        let config = TallyConfig::from_toml(toml).unwrap();
        assert_eq!(config.ci.repo.as_deref(), Some("acme/podcaster"));
        assert_eq!(config.ci.branch.as_deref(), Some("develop"));
        assert_eq!(config.ci.api_base, "https://ghe.example.com/api/v3");
        assert_eq!(config.ci.failed_window, 20);
        assert_eq!(config.coverage.path, PathBuf::from("reports/coverage.xml"));
        assert_eq!(config.coverage.top, 5);
        assert_eq!(config.mutation.cache, PathBuf::from("build/.mutmut-cache"));
        assert_eq!(config.mutation.limit, 50);
    }

    #[test]
    fn partial_section_keeps_defaults() {
        let toml = r#"
[ci]
branch = "main"
"#;
        let config = TallyConfig::from_toml(toml).unwrap();
        assert_eq!(config.ci.branch.as_deref(), Some("main"));
        assert_eq!(config.ci.api_base, "https://api.github.com");
        assert_eq!(config.ci.failed_window, 5);
        assert_eq!(config.mutation.limit, 200);
    }

    #[test]
    fn empty_toml_gives_defaults() {
        let config = TallyConfig::from_toml("").unwrap();
        assert_eq!(config.coverage.top, 10);
        assert!(config.ci.repo.is_none());
    }

    #[test]
    fn invalid_toml_returns_error() {
        let result = TallyConfig::from_toml("{{invalid}}");
        assert!(matches!(result, Err(TallyError::Toml(_))));
    }
}
