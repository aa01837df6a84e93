//! Text normalization helpers shared by the filter evaluator and query builder.

/// Collapse runs of whitespace into single spaces and trim.
pub fn normalize_inline_whitespace<T: AsRef<str>>(text: T) -> String {
    let mut normalized = String::new();
    let mut seen_space = false;
    for ch in text.as_ref().chars() {
        if ch.is_whitespace() {
            if !seen_space {
                normalized.push(' ');
                seen_space = true;
            }
        } else {
            normalized.push(ch);
            seen_space = false;
        }
    }
    normalized.trim().to_string()
}

/// Lowercase with Unicode rules after whitespace normalization.
///
/// Used on both sides of case-insensitive comparisons so `"  RUA  xv "` and
/// `"Rua XV"` fold to the same value.
pub fn fold_case<T: AsRef<str>>(text: T) -> String {
    normalize_inline_whitespace(text).to_lowercase()
}

/// Returns `Some(trimmed)` for non-blank input, `None` otherwise.
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

/// Case-insensitive substring test. `needle` must already be folded.
pub fn contains_folded(haystack: &str, folded_needle: &str) -> bool {
    if folded_needle.is_empty() {
        return true;
    }
    fold_case(haystack).contains(folded_needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_inline_whitespace_collapses_runs() {
        let input = "Rua\n\n  XV\tde Novembro";
        assert_eq!(normalize_inline_whitespace(input), "Rua XV de Novembro");
    }

    #[test]
    fn fold_case_handles_accents() {
        assert_eq!(fold_case("  ÁREA  Industrial "), "área industrial");
    }

    #[test]
    fn non_blank_drops_whitespace_only_values() {
        assert_eq!(non_blank(Some("  ")), None);
        assert_eq!(non_blank(None), None);
        assert_eq!(non_blank(Some(" Joinville ")), Some("Joinville"));
    }

    #[test]
    fn contains_folded_matches_across_case_and_spacing() {
        assert!(contains_folded("Rua  XV de Novembro", "rua xv"));
        assert!(contains_folded("São Bento do Sul", "são"));
        assert!(!contains_folded("Blumenau", "joinville"));
        assert!(contains_folded("anything", ""));
    }
}
