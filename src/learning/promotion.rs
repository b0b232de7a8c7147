//! Promotion Engine - promotes recurring observations into the active rule set
//!
//! Observations whose count reaches the learning-rate threshold become
//! rules. Promotion is monotonic: only an explicit user deletion takes a
//! rule back out.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::store::{CountUpdate, ObservationStore};
use crate::types::Statement;

/// What happens to an observation once it has been promoted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetentionPolicy {
    /// Keep counting the observation alongside the rule
    #[default]
    RetainAll,
    /// Drop the observation and its theme mapping when it is promoted
    ClearOnPromotion,
}

/// Outcome of processing one batch of observations
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PromotionReport {
    pub promoted: Vec<Statement>,
    pub count_updates: Vec<CountUpdate>,
}

/// The promotion engine
pub struct PromotionEngine<'a> {
    store: &'a mut ObservationStore,
    retention: RetentionPolicy,
}

impl<'a> PromotionEngine<'a> {
    /// Create a promotion engine over a session's store
    pub fn new(store: &'a mut ObservationStore) -> Self {
        Self {
            store,
            retention: RetentionPolicy::default(),
        }
    }

    pub fn with_retention(mut self, retention: RetentionPolicy) -> Self {
        self.retention = retention;
        self
    }

    /// Record each observation in order and promote those at or past `threshold`
    pub fn process_feedback(
        &mut self,
        new_observations: &[Statement],
        threshold: u32,
    ) -> PromotionReport {
        let mut report = PromotionReport::default();

        for observation in new_observations {
            let update = self.store.record(observation);

            if update.count >= threshold && self.store.add_rule(update.canonical.clone()) {
                info!(
                    "Promoted observation to rule: {} (count: {}, threshold: {})",
                    update.canonical, update.count, threshold
                );
                if self.retention == RetentionPolicy::ClearOnPromotion {
                    self.store.forget(&update.canonical);
                }
                report.promoted.push(update.canonical.clone());
            }

            report.count_updates.push(update);
        }

        debug!(
            "Processed {} observation(s), {} promoted",
            report.count_updates.len(),
            report.promoted.len()
        );
        report
    }
}
