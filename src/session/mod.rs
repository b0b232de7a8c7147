//! Session Controller - runs the summarize / edit / learn cycle for one user
//!
//! A session owns its observation store outright. Every mutating operation
//! takes `&mut self`, so a second feedback cycle cannot start while one is
//! waiting on the oracle.

pub mod interactive;
pub mod view;

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::learning::{
    compute_delta, parse_observations, CountUpdate, ObservationStore, PromotionEngine,
    RetentionPolicy,
};
use crate::oracle::{ExtractionContext, Oracle, OracleError};
use crate::types::{LearningRate, Statement};

/// One user "save": the summary as generated, as edited, and an optional
/// free-text preference
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedbackEvent {
    pub initial_summary: String,
    pub edited_summary: String,
    pub direct_preference: Option<String>,
}

impl FeedbackEvent {
    pub fn new(
        initial_summary: impl Into<String>,
        edited_summary: impl Into<String>,
        direct_preference: Option<String>,
    ) -> Self {
        Self {
            initial_summary: initial_summary.into(),
            edited_summary: edited_summary.into(),
            direct_preference,
        }
    }

    /// Direct preference, if it has any content
    pub fn preference(&self) -> Option<&str> {
        self.direct_preference
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }
}

/// Mutable learning state of a session
#[derive(Debug, Clone)]
pub struct SessionState {
    pub store: ObservationStore,
    pub learning_rate: LearningRate,
}

impl SessionState {
    pub fn new(seed_rules: impl IntoIterator<Item = Statement>, learning_rate: LearningRate) -> Self {
        Self {
            store: ObservationStore::new(seed_rules),
            learning_rate,
        }
    }

    pub fn rules(&self) -> &[Statement] {
        self.store.rules()
    }
}

/// What a completed feedback cycle changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedbackReport {
    pub promoted: Vec<Statement>,
    pub count_updates: Vec<CountUpdate>,
    /// Oracle items dropped for lacking a valid prefix
    pub discarded: Vec<String>,
}

impl FeedbackReport {
    /// Whether the oracle surfaced any usable observation
    pub fn has_signal(&self) -> bool {
        !self.count_updates.is_empty()
    }

    pub fn new_themes(&self) -> usize {
        self.count_updates.iter().filter(|u| u.is_new_theme).count()
    }

    pub fn reinforced(&self) -> usize {
        self.count_updates.iter().filter(|u| !u.is_new_theme).count()
    }
}

/// Terminal state of a feedback cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Nothing changed and no preference given; the oracle was not called
    NoOp,
    /// The oracle call failed or timed out; state is unchanged
    OracleFailed(OracleError),
    /// Observations were processed (possibly none)
    Completed(FeedbackReport),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("summary generation failed: {0}")]
    Summary(OracleError),
    #[error("no summary to give feedback on; summarize a document first")]
    NoSummary,
    #[error("document is empty")]
    EmptyDocument,
}

/// The document currently being worked on and the summary the oracle wrote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft {
    pub document: String,
    pub initial_summary: String,
}

/// One user's learning session
pub struct Session {
    id: Uuid,
    state: SessionState,
    retention: RetentionPolicy,
    oracle: Arc<dyn Oracle>,
    timeout: Duration,
    draft: Option<Draft>,
}

impl Session {
    /// Start a session with the configured seed rules and learning rate
    pub fn new(config: &Config, oracle: Arc<dyn Oracle>) -> Self {
        let id = Uuid::new_v4();
        info!("Starting session {} with oracle '{}'", id, oracle.name());
        Self {
            id,
            state: SessionState::new(
                config.learning.seed_rules.iter().cloned(),
                config.learning.learning_rate,
            ),
            retention: config.learning.retention,
            oracle,
            timeout: Duration::from_secs(config.oracle.timeout_secs),
            draft: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn rules(&self) -> &[Statement] {
        self.state.rules()
    }

    pub fn store(&self) -> &ObservationStore {
        &self.state.store
    }

    pub fn draft(&self) -> Option<&Draft> {
        self.draft.as_ref()
    }

    pub fn learning_rate(&self) -> LearningRate {
        self.state.learning_rate
    }

    pub fn set_learning_rate(&mut self, rate: LearningRate) {
        info!("Learning rate set to {} (threshold {})", rate, rate.threshold());
        self.state.learning_rate = rate;
    }

    /// Promotion threshold for the current learning rate
    pub fn threshold(&self) -> u32 {
        self.state.learning_rate.threshold()
    }

    /// Remove a rule by its exact text; absent rules are ignored
    pub fn delete_rule(&mut self, rule_text: &str) -> bool {
        self.state.store.delete_rule(rule_text)
    }

    /// Remove a rule by display position
    pub fn delete_rule_at(&mut self, index: usize) -> Option<Statement> {
        self.state.store.delete_rule_at(index)
    }

    /// Forget the current document and summary
    pub fn clear_draft(&mut self) {
        self.draft = None;
    }

    /// Ask the oracle for a summary under the current rules.
    ///
    /// On success the document and summary become the current draft. On
    /// failure nothing changes, including any previous draft.
    pub async fn summarize(&mut self, document: &str) -> Result<String, SessionError> {
        if document.trim().is_empty() {
            return Err(SessionError::EmptyDocument);
        }

        let call = self.oracle.summarize(document, self.state.rules());
        let summary = match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(summary)) => summary,
            Ok(Err(e)) => {
                warn!("Session {}: summary generation failed: {}", self.id, e);
                return Err(SessionError::Summary(e));
            }
            Err(_) => {
                warn!("Session {}: summary generation timed out", self.id);
                return Err(SessionError::Summary(OracleError::Timeout(self.timeout)));
            }
        };

        self.draft = Some(Draft {
            document: document.to_string(),
            initial_summary: summary.clone(),
        });
        Ok(summary)
    }

    /// Save an edit of the current draft's summary at the session's threshold
    pub async fn save(
        &mut self,
        edited_summary: &str,
        direct_preference: Option<String>,
    ) -> Result<CycleOutcome, SessionError> {
        let draft = self.draft.as_ref().ok_or(SessionError::NoSummary)?;
        let event = FeedbackEvent::new(
            draft.initial_summary.clone(),
            edited_summary,
            direct_preference,
        );
        let threshold = self.threshold();
        Ok(self.run_feedback_cycle(event, threshold).await)
    }

    /// Run one feedback cycle.
    ///
    /// An unchanged summary with no preference is a no-op and never reaches
    /// the oracle. Oracle failures leave every count and rule untouched.
    pub async fn run_feedback_cycle(&mut self, event: FeedbackEvent, threshold: u32) -> CycleOutcome {
        let diff = compute_delta(&event.initial_summary, &event.edited_summary);
        let preference = event.preference().map(str::to_string);

        if diff.is_empty() && preference.is_none() {
            info!("Session {}: no changes and no preference, skipping analysis", self.id);
            return CycleOutcome::NoOp;
        }

        let context = ExtractionContext {
            initial_summary: event.initial_summary,
            edited_summary: event.edited_summary,
            diff,
            direct_preference: preference,
            current_rules: self.state.rules().to_vec(),
            current_observations: self.state.store.observation_counts(),
        };

        let call = self.oracle.extract_observations(&context);
        let items = match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(items)) => items,
            Ok(Err(e)) => {
                warn!("Session {}: feedback analysis failed: {}", self.id, e);
                return CycleOutcome::OracleFailed(e);
            }
            Err(_) => {
                warn!("Session {}: feedback analysis timed out", self.id);
                return CycleOutcome::OracleFailed(OracleError::Timeout(self.timeout));
            }
        };

        let parsed = parse_observations(&items);
        let promotion = PromotionEngine::new(&mut self.state.store)
            .with_retention(self.retention)
            .process_feedback(&parsed.accepted, threshold);

        info!(
            "Session {}: {} observation(s) updated, {} promoted, {} discarded",
            self.id,
            promotion.count_updates.len(),
            promotion.promoted.len(),
            parsed.rejected.len()
        );

        CycleOutcome::Completed(FeedbackReport {
            promoted: promotion.promoted,
            count_updates: promotion.count_updates,
            discarded: parsed.rejected,
        })
    }
}
