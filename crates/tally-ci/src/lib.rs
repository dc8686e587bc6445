//! Workflow run inspection against the GitHub Actions REST API.
//!
//! Finds the latest (or latest failed) run for a branch, resolves its first
//! job, and renders a short report with viewer URLs so an operator can jump
//! straight to the logs.

pub mod client;
pub mod inspect;
pub mod models;
