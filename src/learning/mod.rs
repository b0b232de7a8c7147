//! Preference learning core
//!
//! Turns feedback on generated summaries into observations, merges them by
//! theme, and promotes recurring ones into the rule set that conditions the
//! next summary.

pub mod normalize;
pub mod diff;
pub mod extraction;
pub mod store;
pub mod promotion;

pub use normalize::normalize;
pub use diff::compute_delta;
pub use extraction::{parse_observations, ParsedObservations};
pub use store::{ObservationStore, Observation, CountUpdate};
pub use promotion::{PromotionEngine, PromotionReport, RetentionPolicy};
