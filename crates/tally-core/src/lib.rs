//! Core types, configuration, and error handling for tally.
//!
//! This crate provides the shared foundation used by all other tally crates:
//! - [`TallyError`]: unified error type using `thiserror`
//! - [`TallyConfig`]: configuration loaded from `.tally.toml`
//! - Shared helpers: [`OutputFormat`], [`format_thousands`], [`percent`]

mod config;
mod error;
mod types;

pub use config::{CiConfig, CoverageConfig, MutationConfig, TallyConfig, CONFIG_FILE_NAME};
pub use error::TallyError;
pub use types::{format_thousands, percent, OutputFormat};

/// A convenience `Result` type for tally operations.
pub type Result<T> = std::result::Result<T, TallyError>;
