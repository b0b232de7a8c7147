//! Deterministic oracle with canned responses
//!
//! Extraction answers are served from a queue in order; once it runs dry the
//! oracle reports no observations. Summaries are either a fixed string or the
//! first few sentences of the document. Used for offline runs and tests.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::{ExtractionContext, Oracle, OracleError};
use crate::types::Statement;

const SUMMARY_SENTENCES: usize = 3;

#[derive(Default)]
pub struct ScriptedOracle {
    summary: Option<Result<String, OracleError>>,
    extractions: Mutex<VecDeque<Result<Vec<String>, OracleError>>>,
    summarize_calls: AtomicUsize,
    extract_calls: AtomicUsize,
    last_context: Mutex<Option<ExtractionContext>>,
}

impl ScriptedOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always answer summaries with this text
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(Ok(summary.into()));
        self
    }

    /// Always fail summaries with this error
    pub fn with_summary_error(mut self, error: OracleError) -> Self {
        self.summary = Some(Err(error));
        self
    }

    /// Queue an extraction answer
    pub fn then_extract<S: Into<String>>(self, items: impl IntoIterator<Item = S>) -> Self {
        self.push(Ok(items.into_iter().map(Into::into).collect()));
        self
    }

    /// Queue an extraction failure
    pub fn then_fail(self, error: OracleError) -> Self {
        self.push(Err(error));
        self
    }

    fn push(&self, response: Result<Vec<String>, OracleError>) {
        if let Ok(mut queue) = self.extractions.lock() {
            queue.push_back(response);
        }
    }

    pub fn summarize_calls(&self) -> usize {
        self.summarize_calls.load(Ordering::SeqCst)
    }

    pub fn extract_calls(&self) -> usize {
        self.extract_calls.load(Ordering::SeqCst)
    }

    /// Context passed to the most recent extraction call
    pub fn last_context(&self) -> Option<ExtractionContext> {
        self.last_context.lock().ok().and_then(|c| c.clone())
    }
}

/// First sentences of a document, whitespace collapsed
fn leading_sentences(document: &str, count: usize) -> String {
    let flat = document.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut out = String::new();
    let mut taken = 0;
    for piece in flat.split_inclusive(['.', '!', '?']) {
        out.push_str(piece);
        taken += 1;
        if taken == count {
            break;
        }
    }
    out.trim().to_string()
}

#[async_trait]
impl Oracle for ScriptedOracle {
    async fn summarize(&self, document: &str, _rules: &[Statement]) -> Result<String, OracleError> {
        self.summarize_calls.fetch_add(1, Ordering::SeqCst);
        match &self.summary {
            Some(response) => response.clone(),
            None => {
                let summary = leading_sentences(document, SUMMARY_SENTENCES);
                if summary.is_empty() {
                    Err(OracleError::Malformed("empty summary".to_string()))
                } else {
                    Ok(summary)
                }
            }
        }
    }

    async fn extract_observations(
        &self,
        context: &ExtractionContext,
    ) -> Result<Vec<String>, OracleError> {
        self.extract_calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_context.lock() {
            *last = Some(context.clone());
        }
        let next = self.extractions.lock().ok().and_then(|mut q| q.pop_front());
        next.unwrap_or_else(|| Ok(Vec::new()))
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}
