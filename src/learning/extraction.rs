//! Parsing of oracle extraction output into statements
//!
//! Both transports end up here: free-text replies are split into candidate
//! lines first, structured tool-call replies arrive as a list already. Items
//! without a `Rule: ` / `Preference: ` prefix are dropped without failing the
//! batch.

use serde_json::Value;
use tracing::{debug, warn};

use crate::types::Statement;

/// Parsed extraction batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedObservations {
    pub accepted: Vec<Statement>,
    /// Non-empty items that did not have a valid prefix
    pub rejected: Vec<String>,
}

/// Validate raw observation strings, preserving order.
///
/// Empty items are skipped quietly; anything else without a valid prefix is
/// logged and counted as rejected.
pub fn parse_observations<S: AsRef<str>>(items: &[S]) -> ParsedObservations {
    let mut parsed = ParsedObservations::default();
    for item in items {
        let item = item.as_ref().trim();
        if item.is_empty() {
            continue;
        }
        match Statement::parse(item) {
            Some(statement) => parsed.accepted.push(statement),
            None => {
                warn!("Discarding malformed observation from oracle: {:?}", item);
                parsed.rejected.push(item.to_string());
            }
        }
    }
    parsed
}

/// Pull observation lines out of a free-text reply.
///
/// Leading bullet markers are removed; lines that don't start with a kind
/// prefix (commentary like "No new suggestions.") are ignored.
pub fn lines_from_reply(reply: &str) -> Vec<String> {
    reply
        .lines()
        .filter_map(|line| {
            let cleaned = line.trim().trim_start_matches(['-', ' ']).trim();
            if cleaned.starts_with("Rule: ") || cleaned.starts_with("Preference: ") {
                Some(cleaned.to_string())
            } else {
                if !cleaned.is_empty() {
                    debug!("Ignoring non-observation line: {}", cleaned);
                }
                None
            }
        })
        .collect()
}

/// Read the `relevant_observations` array from tool-call arguments.
///
/// Returns `None` when the arguments are not an object with that array.
/// Non-string array entries are discarded with a warning.
pub fn items_from_tool_arguments(arguments: &Value) -> Option<Vec<String>> {
    let array = arguments.get("relevant_observations")?.as_array()?;
    let items = array
        .iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s.trim().to_string()),
            other => {
                warn!("Discarding non-string observation from oracle: {}", other);
                None
            }
        })
        .filter(|s| !s.is_empty())
        .collect();
    Some(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_malformed_item_discarded() {
        let parsed = parse_observations(&["Preference: Always list dosages", "Use shorter sentences"]);
        assert_eq!(parsed.accepted, vec![Statement::preference("Always list dosages")]);
        assert_eq!(parsed.rejected, vec!["Use shorter sentences".to_string()]);
    }

    #[test]
    fn test_empty_items_skipped_quietly() {
        let parsed = parse_observations(&["", "   ", "Rule: Be brief"]);
        assert_eq!(parsed.accepted.len(), 1);
        assert!(parsed.rejected.is_empty());
    }

    #[test]
    fn test_empty_batch() {
        let parsed = parse_observations::<String>(&[]);
        assert_eq!(parsed, ParsedObservations::default());
    }

    #[test]
    fn test_lines_from_reply() {
        let reply = "Relevant observations:\n- Rule: Mention allergies.\n  - Preference: Use mg\n\nNo new suggestions.\n-Rule: Lead with diagnosis";
        assert_eq!(
            lines_from_reply(reply),
            vec![
                "Rule: Mention allergies.".to_string(),
                "Preference: Use mg".to_string(),
                "Rule: Lead with diagnosis".to_string(),
            ]
        );
    }

    #[test]
    fn test_lines_from_empty_reply() {
        assert!(lines_from_reply("").is_empty());
    }

    #[test]
    fn test_tool_arguments() {
        let args = json!({"relevant_observations": ["Rule: A", 7, "  ", " Preference: B "]});
        assert_eq!(
            items_from_tool_arguments(&args),
            Some(vec!["Rule: A".to_string(), "Preference: B".to_string()])
        );
        assert_eq!(items_from_tool_arguments(&json!({"relevant_observations": []})), Some(vec![]));
        assert_eq!(items_from_tool_arguments(&json!({"other": []})), None);
        assert_eq!(items_from_tool_arguments(&json!({"relevant_observations": "Rule: A"})), None);
    }
}
