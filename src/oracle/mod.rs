//! Language oracle capability
//!
//! The oracle writes summaries and reads feedback. Everything that talks to
//! the hosted model goes through the [`Oracle`] trait so the learning core can
//! be driven by a canned implementation in tests.

pub mod client;
pub mod prompts;
pub mod scripted;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::types::Statement;

pub use client::OpenAiOracle;
pub use scripted::ScriptedOracle;

/// Failure of an oracle call. No session state changes when one occurs.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OracleError {
    #[error("no API key configured (set TRACTORBEAM_API_KEY or run 'tractorbeam config --set-api-key')")]
    MissingCredential,
    #[error("request to oracle failed: {0}")]
    Request(String),
    #[error("oracle API error ({status}): {body}")]
    Api { status: u16, body: String },
    #[error("oracle returned an unusable response: {0}")]
    Malformed(String),
    #[error("oracle call timed out after {0:?}")]
    Timeout(Duration),
}

impl OracleError {
    /// Whether the failure is a local configuration problem rather than a
    /// problem reaching or reading the service
    pub fn is_configuration(&self) -> bool {
        matches!(self, OracleError::MissingCredential)
    }
}

/// Everything the oracle gets to see when analyzing one piece of feedback
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionContext {
    pub initial_summary: String,
    pub edited_summary: String,
    pub diff: String,
    pub direct_preference: Option<String>,
    pub current_rules: Vec<Statement>,
    /// Canonical observations with their counts
    pub current_observations: Vec<(Statement, u32)>,
}

/// The two capabilities the learning loop needs from a language model
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Summarize a document in 3-4 sentences following the given rules
    async fn summarize(&self, document: &str, rules: &[Statement]) -> Result<String, OracleError>;

    /// Return observation strings that the feedback reinforces or introduces.
    ///
    /// Items should be empty or carry a `Rule: ` / `Preference: ` prefix; the
    /// caller discards anything else. An empty list is a valid answer.
    async fn extract_observations(
        &self,
        context: &ExtractionContext,
    ) -> Result<Vec<String>, OracleError>;

    /// Short name for logs
    fn name(&self) -> &'static str;
}
