//! Prompt text and the structured extraction schema

use serde_json::{json, Value};

use super::ExtractionContext;
use crate::types::Statement;

/// Name of the forced function call used for structured extraction
pub const EXTRACTION_TOOL_NAME: &str = "extract_observations";

pub const SUMMARY_SYSTEM_PROMPT: &str = "You are a helpful assistant that summarizes medical records according to the specific preferences and rules provided by the current user.";

pub const EXTRACTION_SYSTEM_PROMPT_LINES: &str = "You are an expert system analyzing user feedback to identify reinforced or new observation themes for summarizing text. You compare feedback against existing observations and output only the relevant canonical or new observation strings, one per line.";

pub const EXTRACTION_SYSTEM_PROMPT_TOOL: &str = "You are an expert system analyzing user feedback to identify and learn specific, potentially idiosyncratic user preferences for summarizing text. You MUST use the provided 'extract_observations' tool to return your findings, focusing on capturing the user's unique style and requirements.";

fn bullet_list(rules: &[Statement]) -> String {
    rules
        .iter()
        .map(|r| format!("- {}", r))
        .collect::<Vec<_>>()
        .join("\n")
}

fn observations_block(observations: &[(Statement, u32)]) -> String {
    if observations.is_empty() {
        return "None yet.".to_string();
    }
    observations
        .iter()
        .map(|(obs, count)| format!("- {} (Count: {})", obs, count))
        .collect::<Vec<_>>()
        .join("\n")
}

fn preference_line(direct_preference: Option<&str>) -> String {
    match direct_preference.map(str::trim).filter(|p| !p.is_empty()) {
        Some(p) => format!("Direct Preference Provided: '{}'", p),
        None => "No direct preference provided.".to_string(),
    }
}

/// User prompt for the summary call
pub fn summary_prompt(document: &str, rules: &[Statement]) -> String {
    format!(
        r#"Please summarize the following record in exactly 3-4 concise sentences.

Follow these rules/preferences carefully when generating the summary. These rules reflect the specific preferences of THIS user:
{}

Record:
```
{}
```

Summary (3-4 sentences):
"#,
        bullet_list(rules),
        document
    )
}

/// Shared context section of both extraction prompts
fn feedback_context(ctx: &ExtractionContext) -> String {
    format!(
        r#"Current User's Rules (for context):
{}

Current User's Observations Log (Canonical String: Count):
{}

Original LLM Summary:
```
{}
```

User-Edited Summary (Reflects their preferences):
```
{}
```

Difference (Unified Diff format):
```diff
{}
```

{}"#,
        bullet_list(&ctx.current_rules),
        observations_block(&ctx.current_observations),
        ctx.initial_summary,
        ctx.edited_summary,
        ctx.diff,
        preference_line(ctx.direct_preference.as_deref())
    )
}

/// Extraction prompt asking for one observation per line
pub fn extraction_prompt_lines(ctx: &ExtractionContext) -> String {
    format!(
        r#"Analyze the user's feedback (summary edits and direct preference) in the context of existing rules and observations.

Your goal is to identify which existing observation themes are reinforced OR identify genuinely new observation themes suggested by the feedback.

{}

Instructions:
1. Compare the new feedback (diff, direct preference) against the Current Observations Log and Current Rules.
2. Determine if the feedback reinforces an existing observation theme.
3. Determine if the feedback suggests a genuinely new observation theme not already captured.
4. Output *only* the relevant observation strings below, one per line.
5. If reinforcing an existing theme, output the *exact canonical observation string* from the Observations Log above.
6. If identifying a new theme, formulate a concise observation string prefixed with 'Rule: ' or 'Preference: '.
7. Do NOT output rules from Current Rules unless the feedback specifically reinforces them as an observation.
8. If no existing themes are reinforced and no new themes are identified, output nothing.

Relevant Observations (Reinforced or New):
"#,
        feedback_context(ctx)
    )
}

/// Extraction prompt for the forced tool call
pub fn extraction_prompt_tool(ctx: &ExtractionContext) -> String {
    format!(
        r#"Analyze the user's feedback (summary edits and direct preference) in the context of their existing rules and observations. The goal is to learn *this specific user's* preferences, even if they are idiosyncratic (like specific signatures, formatting, or shorthand).

Identify existing observation themes that are reinforced OR genuinely new observation themes suggested by the feedback. Use the '{tool}' tool to output the results.

{context}

Use the '{tool}' tool to list all relevant observation strings reflecting this user's specific preferences.
- If reinforcing an existing theme, provide the *exact canonical observation string* from the Observations Log.
- If identifying a new theme, formulate a concise observation string (e.g., 'Rule: Add signature XYZ', 'Preference: Use TLA for Three Letter Acronym') prefixed with 'Rule: ' or 'Preference: '. Do NOT make the observations overly general.
- If no observations are identified, call the tool with an empty list.
"#,
        tool = EXTRACTION_TOOL_NAME,
        context = feedback_context(ctx)
    )
}

/// Function schema for structured extraction
pub fn extraction_tool_schema() -> Value {
    json!({
        "type": "function",
        "function": {
            "name": EXTRACTION_TOOL_NAME,
            "description": "Extracts observation strings reflecting this specific user's preferences (reinforced or new) based on their feedback and context. Capture specific patterns, like preferred shorthand or signatures, not just general summarization principles.",
            "parameters": {
                "type": "object",
                "properties": {
                    "relevant_observations": {
                        "type": "array",
                        "items": {
                            "type": "string",
                            "pattern": "^(Rule|Preference): .+",
                            "description": "A single observation string. If reinforcing an existing theme, use the exact canonical string. If new, formulate a concise string prefixed with 'Rule: ' or 'Preference: '."
                        },
                        "description": "Observation strings identified as relevant based on the user feedback and context."
                    }
                },
                "required": ["relevant_observations"]
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> ExtractionContext {
        ExtractionContext {
            initial_summary: "Patient has a cough.".to_string(),
            edited_summary: "Patient has a cough. NKDA.".to_string(),
            diff: "-Patient has a cough.\n+Patient has a cough. NKDA.".to_string(),
            direct_preference: None,
            current_rules: vec![Statement::rule("Be concise.")],
            current_observations: vec![(Statement::preference("Use NKDA shorthand"), 2)],
        }
    }

    #[test]
    fn test_summary_prompt_lists_rules() {
        let prompt = summary_prompt("RECORD BODY", &[Statement::rule("Be concise.")]);
        assert!(prompt.contains("- Rule: Be concise."));
        assert!(prompt.contains("RECORD BODY"));
        assert!(prompt.contains("3-4"));
    }

    #[test]
    fn test_extraction_prompt_includes_counts() {
        let prompt = extraction_prompt_lines(&context());
        assert!(prompt.contains("- Preference: Use NKDA shorthand (Count: 2)"));
        assert!(prompt.contains("No direct preference provided."));
        assert!(prompt.contains("+Patient has a cough. NKDA."));
    }

    #[test]
    fn test_empty_observations_placeholder() {
        let mut ctx = context();
        ctx.current_observations.clear();
        ctx.direct_preference = Some("Always include allergies".to_string());
        let prompt = extraction_prompt_tool(&ctx);
        assert!(prompt.contains("None yet."));
        assert!(prompt.contains("Direct Preference Provided: 'Always include allergies'"));
    }

    #[test]
    fn test_tool_schema_shape() {
        let schema = extraction_tool_schema();
        assert_eq!(schema["function"]["name"], EXTRACTION_TOOL_NAME);
        assert_eq!(
            schema["function"]["parameters"]["required"][0],
            "relevant_observations"
        );
    }
}
