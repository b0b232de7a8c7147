//! Read-back views of session state for whatever renders it

use crate::learning::ObservationStore;
use crate::types::Statement;

use super::{CycleOutcome, SessionError};

/// A rule as shown to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleView {
    /// `Rule: ...` / `Preference: ...` form, as sent to the oracle
    pub raw: String,
    /// Text with the prefix stripped
    pub display: String,
}

/// An observation as shown to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservationView {
    pub raw: String,
    pub display: String,
    pub count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Info,
    Warning,
    Error,
}

/// One-line outcome of a user action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self { level, message: message.into() }
    }
}

impl From<&Statement> for RuleView {
    fn from(statement: &Statement) -> Self {
        Self {
            raw: statement.to_string(),
            display: statement.display().to_string(),
        }
    }
}

/// Active rules in insertion order
pub fn rules_view(store: &ObservationStore) -> Vec<RuleView> {
    store.rules().iter().map(RuleView::from).collect()
}

/// Observation log, highest count first
pub fn observations_view(store: &ObservationStore) -> Vec<ObservationView> {
    store
        .observations_by_count()
        .into_iter()
        .map(|o| ObservationView {
            raw: o.statement.to_string(),
            display: o.statement.display().to_string(),
            count: o.count,
        })
        .collect()
}

/// Notice for the end of a feedback cycle
pub fn outcome_notice(outcome: &CycleOutcome) -> Notice {
    match outcome {
        CycleOutcome::NoOp => Notice::new(
            NoticeLevel::Info,
            "No changes detected and no preference given; nothing to learn.",
        ),
        CycleOutcome::OracleFailed(e) => {
            Notice::new(NoticeLevel::Error, format!("Feedback analysis failed: {}", e))
        }
        CycleOutcome::Completed(report) if !report.has_signal() => Notice::new(
            NoticeLevel::Info,
            "Feedback analyzed; no new preferences identified.",
        ),
        CycleOutcome::Completed(report) => {
            let mut message = format!(
                "{} observation(s) updated ({} new), {} promoted",
                report.count_updates.len(),
                report.new_themes(),
                report.promoted.len()
            );
            if !report.discarded.is_empty() {
                message.push_str(&format!(", {} malformed item(s) ignored", report.discarded.len()));
            }
            Notice::new(NoticeLevel::Success, message)
        }
    }
}

/// Notice for a session error
pub fn error_notice(error: &SessionError) -> Notice {
    match error {
        SessionError::Summary(e) => {
            Notice::new(NoticeLevel::Error, format!("Summary generation failed: {}", e))
        }
        SessionError::NoSummary | SessionError::EmptyDocument => {
            Notice::new(NoticeLevel::Warning, error.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::learning::CountUpdate;
    use crate::oracle::OracleError;
    use crate::session::FeedbackReport;

    #[test]
    fn test_rule_view_strips_prefix() {
        let store = ObservationStore::new([Statement::preference("Use bullet points")]);
        let views = rules_view(&store);
        assert_eq!(views[0].raw, "Preference: Use bullet points");
        assert_eq!(views[0].display, "Use bullet points");
    }

    #[test]
    fn test_observations_sorted_by_count() {
        let mut store = ObservationStore::default();
        let low = Statement::rule("Mention allergies.");
        let high = Statement::preference("Lead with the diagnosis");
        store.record(&low);
        store.record(&high);
        store.record(&high);

        let views = observations_view(&store);
        assert_eq!(views.len(), 2);
        assert_eq!(views[0].display, "Lead with the diagnosis");
        assert_eq!(views[0].count, 2);
        assert_eq!(views[1].count, 1);
    }

    #[test]
    fn test_outcome_notices_are_distinguishable() {
        let noop = outcome_notice(&CycleOutcome::NoOp);
        let empty = outcome_notice(&CycleOutcome::Completed(FeedbackReport::default()));
        let failed = outcome_notice(&CycleOutcome::OracleFailed(OracleError::Request(
            "connection refused".to_string(),
        )));

        assert_eq!(noop.level, NoticeLevel::Info);
        assert_eq!(empty.level, NoticeLevel::Info);
        assert_ne!(noop.message, empty.message);
        assert_eq!(failed.level, NoticeLevel::Error);
        assert!(failed.message.starts_with("Feedback analysis failed"));
    }

    #[test]
    fn test_completed_notice_counts() {
        let report = FeedbackReport {
            promoted: vec![Statement::rule("Mention allergies.")],
            count_updates: vec![CountUpdate {
                canonical: Statement::rule("Mention allergies."),
                count: 3,
                is_new_theme: false,
            }],
            discarded: vec!["noise".to_string()],
        };
        let notice = outcome_notice(&CycleOutcome::Completed(report));
        assert_eq!(notice.level, NoticeLevel::Success);
        assert_eq!(
            notice.message,
            "1 observation(s) updated (0 new), 1 promoted, 1 malformed item(s) ignored"
        );
    }

    #[test]
    fn test_summary_error_names_step() {
        let notice = error_notice(&SessionError::Summary(OracleError::MissingCredential));
        assert!(notice.message.starts_with("Summary generation failed"));
    }
}
