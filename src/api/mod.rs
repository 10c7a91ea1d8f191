pub mod client;

use thiserror::Error;

use crate::domain::digest::{EmailId, SummarizeOutcome};
use crate::domain::stats::UsageStats;

pub use client::DigestClient;

/// Errors returned by the digest backend.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The session token is missing, unknown or expired.
    #[error("{0}. Please login again.")]
    Unauthorized(String),

    #[error("{message}")]
    Backend { status: u16, message: String },

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected response: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized(_))
    }
}

/// Operations the dashboard performs against the backend.
pub trait DigestApi {
    fn summarize(&self) -> Result<SummarizeOutcome, ApiError>;

    fn trash(&self, id: &str) -> Result<String, ApiError>;
    fn mark_read(&self, id: &str) -> Result<String, ApiError>;
    fn mark_all_read(&self, ids: &[EmailId]) -> Result<String, ApiError>;
    fn reply(&self, to: &str, subject: &str, body: &str) -> Result<String, ApiError>;

    fn stats(&self) -> Result<UsageStats, ApiError>;
    /// Returns the minutes the backend credited for this run.
    fn log_usage(&self, emails_processed: usize) -> Result<f64, ApiError>;
}
