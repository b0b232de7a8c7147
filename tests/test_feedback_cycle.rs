//! Integration tests for the feedback cycle, driven end to end through
//! `Session` with a scripted oracle:
//! - Promotion after repeated feedback
//! - Empty extraction vs. oracle failure
//! - Theme merging across surface forms
//! - Malformed oracle output
//! - Oracle timeouts
//! - Summary generation and save flow

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use tractorbeam::config::Config;
use tractorbeam::learning::RetentionPolicy;
use tractorbeam::oracle::{ExtractionContext, Oracle, OracleError, ScriptedOracle};
use tractorbeam::session::view::{observations_view, outcome_notice, rules_view, NoticeLevel};
use tractorbeam::session::{CycleOutcome, FeedbackEvent, Session, SessionError};
use tractorbeam::types::{LearningRate, Statement};

const INITIAL: &str = "Patient presented with chest pain. ECG normal. Discharged home.";
const EDITED: &str = "Chest pain, ECG normal. Aspirin 81 mg daily. Discharged home.";

fn config_with_seed(seed: &[&str]) -> Config {
    let mut config = Config::default();
    config.learning.seed_rules = seed
        .iter()
        .map(|s| Statement::parse(s).expect("valid seed rule"))
        .collect();
    config
}

fn start(oracle: ScriptedOracle) -> (Session, Arc<ScriptedOracle>) {
    let oracle = Arc::new(oracle);
    let session = Session::new(
        &config_with_seed(&["Rule: Be concise."]),
        oracle.clone() as Arc<dyn Oracle>,
    );
    (session, oracle)
}

fn edit() -> FeedbackEvent {
    FeedbackEvent::new(INITIAL, EDITED, None)
}

// =====================================================================
// PROMOTION
// =====================================================================

#[tokio::test]
async fn test_repeated_preference_is_promoted_on_third_cycle() {
    let dosage = "Preference: Always list medication dosages";
    let (mut session, oracle) = start(
        ScriptedOracle::new()
            .then_extract([dosage])
            .then_extract([dosage])
            .then_extract([dosage]),
    );
    let threshold = LearningRate::Normal.threshold();

    for cycle in 1..=2 {
        match session.run_feedback_cycle(edit(), threshold).await {
            CycleOutcome::Completed(report) => assert!(report.promoted.is_empty(), "cycle {}", cycle),
            other => panic!("cycle {}: unexpected outcome {:?}", cycle, other),
        }
        assert_eq!(session.rules().len(), 1);
    }

    let CycleOutcome::Completed(report) = session.run_feedback_cycle(edit(), threshold).await else {
        panic!("third cycle should complete");
    };
    let promoted = Statement::parse(dosage).unwrap();
    assert_eq!(report.promoted, vec![promoted.clone()]);
    assert_eq!(
        session.rules(),
        &[Statement::rule("Be concise."), promoted.clone()]
    );
    assert_eq!(session.store().count(&promoted), Some(3));
    assert_eq!(oracle.extract_calls(), 3);

    let observations = observations_view(session.store());
    assert_eq!(observations[0].display, "Always list medication dosages");
    assert_eq!(observations[0].count, 3);
}

#[tokio::test]
async fn test_fourth_occurrence_does_not_duplicate_rule() {
    let item = "Rule: Mention allergies.";
    let (mut session, _oracle) = start(
        ScriptedOracle::new()
            .then_extract([item])
            .then_extract([item])
            .then_extract([item])
            .then_extract([item]),
    );

    for _ in 0..4 {
        session.run_feedback_cycle(edit(), 3).await;
    }

    let allergies = Statement::rule("Mention allergies.");
    assert_eq!(session.rules().iter().filter(|r| **r == allergies).count(), 1);
    assert_eq!(session.store().count(&allergies), Some(4));
}

#[tokio::test]
async fn test_fast_rate_promotes_sooner() {
    let item = "Preference: Use bullet points";
    let (mut session, _oracle) = start(
        ScriptedOracle::new().then_extract([item]).then_extract([item]),
    );
    session.set_learning_rate(LearningRate::Fast);

    session.run_feedback_cycle(edit(), session.threshold()).await;
    let CycleOutcome::Completed(report) = session.run_feedback_cycle(edit(), session.threshold()).await else {
        panic!("expected completion");
    };
    assert_eq!(report.promoted, vec![Statement::preference("Use bullet points")]);
}

#[tokio::test]
async fn test_clear_on_promotion_retention() {
    let item = "Rule: Lead with the diagnosis.";
    let oracle = Arc::new(ScriptedOracle::new().then_extract([item]).then_extract([item]));
    let mut config = config_with_seed(&[]);
    config.learning.retention = RetentionPolicy::ClearOnPromotion;
    let mut session = Session::new(&config, oracle as Arc<dyn Oracle>);

    session.run_feedback_cycle(edit(), 2).await;
    session.run_feedback_cycle(edit(), 2).await;

    assert_eq!(session.rules(), &[Statement::rule("Lead with the diagnosis.")]);
    assert_eq!(session.store().observation_len(), 0);
}

// =====================================================================
// EMPTY EXTRACTION VS. FAILURE
// =====================================================================

#[tokio::test]
async fn test_empty_extraction_leaves_state_unchanged() {
    let (mut session, oracle) = start(ScriptedOracle::new().then_extract(Vec::<String>::new()));

    let outcome = session.run_feedback_cycle(edit(), 3).await;

    let CycleOutcome::Completed(report) = &outcome else {
        panic!("expected completion, got {:?}", outcome);
    };
    assert!(!report.has_signal());
    assert_eq!(session.rules(), &[Statement::rule("Be concise.")]);
    assert_eq!(session.store().observation_len(), 0);
    assert_eq!(oracle.extract_calls(), 1);
    assert_eq!(outcome_notice(&outcome).level, NoticeLevel::Info);
}

#[tokio::test]
async fn test_oracle_failure_is_distinguishable_from_empty() {
    let (mut session, _oracle) = start(
        ScriptedOracle::new()
            .then_extract(["Rule: Mention allergies."])
            .then_fail(OracleError::Request("connection reset".to_string())),
    );

    session.run_feedback_cycle(edit(), 3).await;
    let before = session.store().observation_counts();

    let outcome = session.run_feedback_cycle(edit(), 3).await;

    assert_eq!(
        outcome,
        CycleOutcome::OracleFailed(OracleError::Request("connection reset".to_string()))
    );
    assert_eq!(session.store().observation_counts(), before);
    assert_eq!(session.rules(), &[Statement::rule("Be concise.")]);

    let notice = outcome_notice(&outcome);
    assert_eq!(notice.level, NoticeLevel::Error);
    assert!(notice.message.contains("connection reset"));
}

#[tokio::test]
async fn test_noop_save_skips_oracle() {
    let (mut session, oracle) = start(ScriptedOracle::new().then_extract(["Rule: Unused."]));

    let outcome = session
        .run_feedback_cycle(FeedbackEvent::new(INITIAL, INITIAL, None), 3)
        .await;

    assert_eq!(outcome, CycleOutcome::NoOp);
    assert_eq!(oracle.extract_calls(), 0);
}

// =====================================================================
// TIMEOUTS
// =====================================================================

/// Oracle that never answers within any reasonable deadline
struct StalledOracle;

#[async_trait]
impl Oracle for StalledOracle {
    async fn summarize(&self, _document: &str, _rules: &[Statement]) -> Result<String, OracleError> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok("too late".to_string())
    }

    async fn extract_observations(
        &self,
        _context: &ExtractionContext,
    ) -> Result<Vec<String>, OracleError> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(vec!["Rule: Too late.".to_string()])
    }

    fn name(&self) -> &'static str {
        "stalled"
    }
}

#[tokio::test]
async fn test_extraction_timeout_is_an_oracle_failure() {
    let deadline = Duration::from_millis(20);
    let mut session = Session::new(&config_with_seed(&["Rule: Be concise."]), Arc::new(StalledOracle))
        .with_timeout(deadline);

    let outcome = session.run_feedback_cycle(edit(), 1).await;

    assert_eq!(outcome, CycleOutcome::OracleFailed(OracleError::Timeout(deadline)));
    assert_eq!(session.store().observation_len(), 0);
    assert_eq!(session.rules(), &[Statement::rule("Be concise.")]);
    assert_eq!(outcome_notice(&outcome).level, NoticeLevel::Error);
}

#[tokio::test]
async fn test_summary_timeout_keeps_state() {
    let deadline = Duration::from_millis(20);
    let mut session = Session::new(&config_with_seed(&[]), Arc::new(StalledOracle))
        .with_timeout(deadline);

    let err = session.summarize("A record.").await.unwrap_err();

    assert_eq!(err, SessionError::Summary(OracleError::Timeout(deadline)));
    assert!(session.draft().is_none());
}

// =====================================================================
// THEME MERGING AND MALFORMED OUTPUT
// =====================================================================

#[tokio::test]
async fn test_surface_variants_merge_into_one_theme() {
    let (mut session, oracle) = start(
        ScriptedOracle::new()
            .then_extract(["Rule: Always mention allergies."])
            .then_extract(["Rule: always mention allergies"]),
    );

    session.run_feedback_cycle(edit(), 3).await;
    let CycleOutcome::Completed(report) = session.run_feedback_cycle(edit(), 3).await else {
        panic!("expected completion");
    };

    assert_eq!(session.store().observation_len(), 1);
    assert!(!report.count_updates[0].is_new_theme);
    assert_eq!(report.count_updates[0].canonical, Statement::rule("Always mention allergies."));
    assert_eq!(report.count_updates[0].count, 2);

    let context = oracle.last_context().expect("oracle saw a context");
    assert_eq!(
        context.current_observations,
        vec![(Statement::rule("Always mention allergies."), 1)]
    );
}

#[tokio::test]
async fn test_malformed_items_are_discarded() {
    let (mut session, _oracle) = start(ScriptedOracle::new().then_extract([
        "Preference: Put the plan last",
        "Consider mentioning the follow-up date",
        "",
    ]));

    let CycleOutcome::Completed(report) = session.run_feedback_cycle(edit(), 3).await else {
        panic!("expected completion");
    };

    assert_eq!(session.store().observation_len(), 1);
    assert_eq!(report.discarded, vec!["Consider mentioning the follow-up date".to_string()]);
}

// =====================================================================
// SUMMARIZE AND SAVE
// =====================================================================

#[tokio::test]
async fn test_summarize_edit_save_flow() {
    let (mut session, oracle) = start(
        ScriptedOracle::new()
            .with_summary(INITIAL)
            .then_extract(["Preference: Include medication doses"]),
    );

    let summary = session.summarize("A long record. With many sentences.").await.unwrap();
    assert_eq!(summary, INITIAL);

    let outcome = session
        .save(EDITED, Some("Always include doses".to_string()))
        .await
        .unwrap();
    assert!(matches!(outcome, CycleOutcome::Completed(_)));

    let context = oracle.last_context().unwrap();
    assert_eq!(context.initial_summary, INITIAL);
    assert_eq!(context.edited_summary, EDITED);
    assert_eq!(context.direct_preference.as_deref(), Some("Always include doses"));
    assert!(context.diff.starts_with("--- initial_summary.txt\n+++ edited_summary.txt\n"));
    assert_eq!(context.current_rules, vec![Statement::rule("Be concise.")]);
}

#[tokio::test]
async fn test_summary_failure_reported_without_draft() {
    let (mut session, oracle) = start(
        ScriptedOracle::new().with_summary_error(OracleError::MissingCredential),
    );

    let err = session.summarize("Some record.").await.unwrap_err();
    assert!(err.to_string().starts_with("summary generation failed"));
    assert!(session.draft().is_none());
    assert_eq!(oracle.summarize_calls(), 1);
}

#[tokio::test]
async fn test_deleting_rules() {
    let (mut session, _oracle) = start(ScriptedOracle::new());

    assert!(!session.delete_rule("Rule: Not a rule."));
    assert_eq!(rules_view(session.store()).len(), 1);

    let removed = session.delete_rule_at(0).unwrap();
    assert_eq!(removed, Statement::rule("Be concise."));
    assert!(session.delete_rule_at(0).is_none());
    assert!(session.rules().is_empty());
}
