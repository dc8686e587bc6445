use std::path::PathBuf;

/// Errors that can occur across tally.
///
/// Each variant wraps a specific error domain. Library crates use this type
/// directly; the `miette::Diagnostic` derive lets the binary crate surface
/// them with help text at the boundary.
///
/// # Examples
///
/// ```
/// use tally_core::TallyError;
///
/// let err = TallyError::Config("missing repository".into());
/// assert!(err.to_string().contains("missing repository"));
/// ```
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum TallyError {
    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    #[diagnostic(help("pass the value on the command line or set it in .tally.toml"))]
    Config(String),

    /// Network failure talking to the CI provider.
    #[error("HTTP error: {0}")]
    #[diagnostic(help("check network access to the CI provider API"))]
    Http(String),

    /// The CI provider answered with a non-success status.
    #[error("API error {status}: {body}")]
    #[diagnostic(help("anonymous requests are rate limited; set GITHUB_TOKEN to authenticate"))]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, as returned by the provider.
        body: String,
    },

    /// Malformed coverage report or mutation cache.
    #[error("parse error: {0}")]
    Parse(String),

    /// SQLite failure while reading a mutation cache.
    #[error("database error: {0}")]
    Database(String),

    /// JSON serialization / deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A required file was not found.
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),
}

impl TallyError {
    /// Whether this error means the input artifact is malformed.
    ///
    /// Reporters treat these as recoverable: they print one line and exit
    /// cleanly instead of failing the process.
    ///
    /// # Examples
    ///
    /// ```
    /// use tally_core::TallyError;
    ///
    /// assert!(TallyError::Parse("bad xml".into()).is_malformed_input());
    /// assert!(!TallyError::Http("refused".into()).is_malformed_input());
    /// ```
    pub fn is_malformed_input(&self) -> bool {
        matches!(
            self,
            TallyError::Parse(_) | TallyError::Database(_) | TallyError::Serialization(_)
        )
    }
}
