//! Observation Store - in-memory rule set and observation log for one session
//!
//! Holds the active rules, the observation log (canonical statement to
//! occurrence count) and the canonical index mapping each normalized theme to
//! the statement that first introduced it. Nothing here touches disk; a store
//! lives exactly as long as the session that owns it.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info};

use crate::types::Statement;

/// A tracked observation
#[derive(Debug, Clone, Serialize)]
pub struct Observation {
    pub statement: Statement,
    pub count: u32,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    /// Insertion order, used to break count ties on display
    #[serde(skip)]
    seq: u64,
}

/// Result of recording one observation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountUpdate {
    pub canonical: Statement,
    pub count: u32,
    pub is_new_theme: bool,
}

/// Session-scoped rule set and observation log
#[derive(Debug, Clone, Default)]
pub struct ObservationStore {
    rules: Vec<Statement>,
    observations: HashMap<Statement, Observation>,
    canonical_index: HashMap<String, Statement>,
    next_seq: u64,
}

impl ObservationStore {
    /// Create a store seeded with initial rules (duplicates dropped)
    pub fn new(seed_rules: impl IntoIterator<Item = Statement>) -> Self {
        let mut store = Self::default();
        for rule in seed_rules {
            store.add_rule(rule);
        }
        store
    }

    /// Record one occurrence of an observation.
    ///
    /// If its theme is already known the canonical entry's count goes up;
    /// otherwise the statement as given becomes the canonical form for the
    /// theme, starting at count 1.
    pub fn record(&mut self, observation: &Statement) -> CountUpdate {
        let theme = observation.theme();
        let now = Utc::now();

        if let Some(canonical) = self.canonical_index.get(&theme) {
            if let Some(entry) = self.observations.get_mut(canonical) {
                entry.count += 1;
                entry.last_seen = now;
                debug!("Observation '{}' reinforced (count: {})", canonical, entry.count);
                return CountUpdate {
                    canonical: canonical.clone(),
                    count: entry.count,
                    is_new_theme: false,
                };
            }
        }

        let canonical = observation.clone();
        self.observations.insert(
            canonical.clone(),
            Observation {
                statement: canonical.clone(),
                count: 1,
                first_seen: now,
                last_seen: now,
                seq: self.next_seq,
            },
        );
        self.next_seq += 1;
        self.canonical_index.insert(theme, canonical.clone());
        info!("New observation theme: {}", canonical);

        CountUpdate {
            canonical,
            count: 1,
            is_new_theme: true,
        }
    }

    /// Active rules, in insertion order
    pub fn rules(&self) -> &[Statement] {
        &self.rules
    }

    pub fn has_rule(&self, rule: &Statement) -> bool {
        self.rules.contains(rule)
    }

    /// Append a rule unless an identical one is already active
    pub fn add_rule(&mut self, rule: Statement) -> bool {
        if self.has_rule(&rule) {
            return false;
        }
        self.rules.push(rule);
        true
    }

    /// Remove the first rule whose text is exactly `rule_text`.
    ///
    /// Absent rules are not an error. The matching observation and its
    /// count are left alone.
    pub fn delete_rule(&mut self, rule_text: &str) -> bool {
        match self.rules.iter().position(|r| r.to_string() == rule_text) {
            Some(pos) => {
                let removed = self.rules.remove(pos);
                info!("Deleted rule: {}", removed);
                true
            }
            None => {
                debug!("Rule not present, nothing to delete: {}", rule_text);
                false
            }
        }
    }

    /// Remove the rule at a display position
    pub fn delete_rule_at(&mut self, index: usize) -> Option<Statement> {
        if index >= self.rules.len() {
            return None;
        }
        let removed = self.rules.remove(index);
        info!("Deleted rule: {}", removed);
        Some(removed)
    }

    /// Drop an observation and its canonical index entry
    pub fn forget(&mut self, canonical: &Statement) -> bool {
        if self.observations.remove(canonical).is_none() {
            return false;
        }
        self.canonical_index.remove(&canonical.theme());
        debug!("Forgot observation: {}", canonical);
        true
    }

    /// Current count for a canonical statement
    pub fn count(&self, canonical: &Statement) -> Option<u32> {
        self.observations.get(canonical).map(|o| o.count)
    }

    /// Canonical statement for any surface form of a theme
    #[cfg(test)]
    fn canonical_for(&self, statement: &Statement) -> Option<&Statement> {
        self.canonical_index.get(&statement.theme())
    }

    /// Observations sorted by descending count, ties in first-seen order
    pub fn observations_by_count(&self) -> Vec<&Observation> {
        let mut entries: Vec<&Observation> = self.observations.values().collect();
        entries.sort_by(|a, b| b.count.cmp(&a.count).then(a.seq.cmp(&b.seq)));
        entries
    }

    /// Observations with counts, in first-seen order, for oracle context
    pub fn observation_counts(&self) -> Vec<(Statement, u32)> {
        let mut entries: Vec<&Observation> = self.observations.values().collect();
        entries.sort_by_key(|o| o.seq);
        entries
            .into_iter()
            .map(|o| (o.statement.clone(), o.count))
            .collect()
    }

    pub fn observation_len(&self) -> usize {
        self.observations.len()
    }

    /// Every observation key has exactly one index entry whose key is the
    /// normalized form of that observation.
    pub fn index_is_consistent(&self) -> bool {
        self.observations.len() == self.canonical_index.len()
            && self
                .canonical_index
                .iter()
                .all(|(theme, canonical)| {
                    self.observations.contains_key(canonical) && canonical.theme() == *theme
                })
    }
}
