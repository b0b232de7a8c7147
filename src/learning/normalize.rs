//! Theme normalization for observation matching

const KIND_PREFIXES: &[&str] = &["rule:", "preference:"];
const SENTENCE_PUNCTUATION: &[char] = &['.', '!', '?'];

/// Map a statement to its theme key.
///
/// Lower-cases, then strips surrounding whitespace, any `rule:` /
/// `preference:` prefix and trailing sentence punctuation until nothing
/// changes, and collapses internal whitespace. The result is a fixpoint:
/// `normalize(normalize(x)) == normalize(x)`.
pub fn normalize(statement: &str) -> String {
    let lowered = statement.to_lowercase();
    let mut current = lowered.as_str();

    loop {
        let before = current.len();
        current = current.trim();
        for prefix in KIND_PREFIXES {
            if let Some(rest) = current.strip_prefix(prefix) {
                current = rest.trim_start();
            }
        }
        current = current.trim_end_matches(SENTENCE_PUNCTUATION);
        if current.len() == before {
            break;
        }
    }

    current.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_prefix_case_and_punctuation() {
        assert_eq!(normalize("Rule: Always mention allergies."), "always mention allergies");
        assert_eq!(normalize("rule: always mention allergies"), "always mention allergies");
        assert_eq!(normalize("  Preference: Use bullet points!  "), "use bullet points");
        assert_eq!(normalize("Preference: Is it short?"), "is it short");
    }

    #[test]
    fn test_collapses_whitespace() {
        assert_eq!(
            normalize("Rule:   Lead with   the diagnosis ."),
            "lead with the diagnosis"
        );
    }

    #[test]
    fn test_nested_prefixes_and_punctuation_runs() {
        assert_eq!(normalize("Rule: rule: x"), "x");
        assert_eq!(normalize("Preference: end with a signature. . !"), "end with a signature");
    }

    #[test]
    fn test_idempotent() {
        let samples = [
            "Rule: Be concise.",
            "Preference: Rule: weird nesting?!",
            "  RULE:  Mixed   CASE.  ",
            "Preference: ...",
            "",
            "Preference: Use mg, not milligrams.",
        ];
        for sample in samples {
            let once = normalize(sample);
            assert_eq!(normalize(&once), once, "not idempotent for {:?}", sample);
        }
    }

    #[test]
    fn test_total_on_degenerate_input() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("..."), "");
        assert_eq!(normalize("Rule:"), "");
    }
}
