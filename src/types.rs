//! Shared types used across modules
//!
//! Rules and observations share the `<Kind>: <text>` shape. The prefix is
//! parsed once at the oracle boundary into a [`Statement`] and only rendered
//! back to text when talking to the oracle or the display.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Kind of a learned statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Kind {
    Rule,
    Preference,
}

impl Kind {
    /// Prefix used on the wire, including the trailing space
    pub fn prefix(&self) -> &'static str {
        match self {
            Kind::Rule => "Rule: ",
            Kind::Preference => "Preference: ",
        }
    }
}

impl std::fmt::Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Kind::Rule => write!(f, "Rule"),
            Kind::Preference => write!(f, "Preference"),
        }
    }
}

/// A rule or observation: a kind plus the statement body
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Statement {
    pub kind: Kind,
    pub text: String,
}

impl Statement {
    pub fn new(kind: Kind, text: impl Into<String>) -> Self {
        Self { kind, text: text.into() }
    }

    pub fn rule(text: impl Into<String>) -> Self {
        Self::new(Kind::Rule, text)
    }

    pub fn preference(text: impl Into<String>) -> Self {
        Self::new(Kind::Preference, text)
    }

    /// Parse a `Rule: ...` / `Preference: ...` string.
    ///
    /// The prefix is case-sensitive and must be followed by a non-empty body.
    /// Whitespace around the whole string is ignored; the body is kept as
    /// received, so the rendered statement matches its input.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        for kind in [Kind::Rule, Kind::Preference] {
            if let Some(body) = raw.strip_prefix(kind.prefix()) {
                if body.trim().is_empty() {
                    return None;
                }
                return Some(Self::new(kind, body));
            }
        }
        None
    }

    /// Statement body with the kind prefix stripped, for display
    pub fn display(&self) -> &str {
        self.text.trim()
    }

    /// Comparison key for theme matching
    pub fn theme(&self) -> String {
        crate::learning::normalize::normalize(&self.to_string())
    }
}

impl std::fmt::Display for Statement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.kind.prefix(), self.text)
    }
}

impl From<Statement> for String {
    fn from(statement: Statement) -> Self {
        statement.to_string()
    }
}

impl TryFrom<String> for Statement {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Statement::parse(&value)
            .ok_or_else(|| format!("expected 'Rule: ...' or 'Preference: ...', got '{}'", value))
    }
}

impl FromStr for Statement {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Statement::try_from(s.to_string())
    }
}

/// How quickly observations turn into rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LearningRate {
    Slow,
    #[default]
    Normal,
    Fast,
}

impl LearningRate {
    /// Occurrences an observation needs before promotion
    pub fn threshold(&self) -> u32 {
        match self {
            LearningRate::Slow => 5,
            LearningRate::Normal => 3,
            LearningRate::Fast => 2,
        }
    }

    /// Threshold for a learning-rate name; unrecognized names get the Normal threshold
    pub fn threshold_for(name: &str) -> u32 {
        LearningRate::from_name(name).threshold()
    }

    /// Strict parse, case-insensitive
    pub fn parse_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "slow" => Some(LearningRate::Slow),
            "normal" => Some(LearningRate::Normal),
            "fast" => Some(LearningRate::Fast),
            _ => None,
        }
    }

    /// Lenient parse: unknown names fall back to Normal
    pub fn from_name(name: &str) -> Self {
        LearningRate::parse_name(name).unwrap_or_else(|| {
            tracing::warn!("Unknown learning rate '{}', using Normal", name.trim());
            LearningRate::Normal
        })
    }

    pub fn all() -> &'static [LearningRate] {
        &[LearningRate::Slow, LearningRate::Normal, LearningRate::Fast]
    }
}

impl std::fmt::Display for LearningRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LearningRate::Slow => write!(f, "Slow"),
            LearningRate::Normal => write!(f, "Normal"),
            LearningRate::Fast => write!(f, "Fast"),
        }
    }
}

impl From<String> for LearningRate {
    fn from(value: String) -> Self {
        LearningRate::from_name(&value)
    }
}

impl From<LearningRate> for String {
    fn from(rate: LearningRate) -> Self {
        rate.to_string()
    }
}
