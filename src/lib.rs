//! tractorbeam - preference learning from summary edits
//!
//! A user edits generated summaries; the edits and any stated preferences
//! become observations, and observations that keep coming back are promoted
//! into rules that condition the next summary.
//!
//! - Observation store with theme-based deduplication
//! - Threshold promotion driven by a selectable learning rate
//! - OpenAI-compatible oracle client, swappable through the `Oracle` trait
//! - Interactive terminal session over synthetic medical records
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use tractorbeam::{Config, FeedbackEvent, ScriptedOracle, Session};
//!
//! #[tokio::main]
//! async fn main() {
//!     let oracle = ScriptedOracle::new().then_extract(["Preference: Lead with the diagnosis"]);
//!     let mut session = Session::new(&Config::default(), Arc::new(oracle));
//!     let event = FeedbackEvent::new("Old summary.", "New summary.", None);
//!     let outcome = session.run_feedback_cycle(event, session.threshold()).await;
//!     println!("{:?}", outcome);
//! }
//! ```

// Core modules (order matters for cross-module dependencies)
pub mod types;
pub mod learning;
pub mod oracle;
pub mod config;
pub mod security;
pub mod source;
pub mod session;
pub mod cli;

pub use types::{Kind, LearningRate, Statement};

pub use learning::{
    compute_delta,
    normalize,
    ObservationStore,
    PromotionEngine,
    RetentionPolicy,
};

pub use oracle::{ExtractionContext, OpenAiOracle, Oracle, OracleError, ScriptedOracle};

pub use session::{CycleOutcome, FeedbackEvent, FeedbackReport, Session, SessionError};

pub use config::Config;

pub use security::{set_api_key, get_api_key, delete_api_key};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
