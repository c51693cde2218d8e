//! Similarity ranking for "did you mean" suggestions.

use similar::TextDiff;

/// Minimum similarity ratio for a candidate to be suggested.
pub const DEFAULT_CUTOFF: f32 = 0.6;

/// Similarity of two words in `0.0..=1.0`, ignoring ASCII case.
///
/// Computed as `2 * matches / total_chars` over a character diff.
#[must_use]
pub fn similarity(a: &str, b: &str) -> f32 {
    let a = a.to_ascii_uppercase();
    let b = b.to_ascii_uppercase();
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    TextDiff::from_chars(a.as_str(), b.as_str()).ratio()
}

/// The best `limit` candidates scoring at least `cutoff`, best first.
///
/// Ties keep the candidates' original order.
#[must_use]
pub fn close_matches<'a>(word: &str, candidates: &[&'a str], limit: usize, cutoff: f32) -> Vec<&'a str> {
    let mut scored: Vec<(f32, &'a str)> = candidates
        .iter()
        .map(|c| (similarity(word, c), *c))
        .filter(|(score, _)| *score >= cutoff)
        .collect();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    scored.into_iter().take(limit).map(|(_, c)| c).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_similarity_bounds() {
        assert!((similarity("HELP", "help") - 1.0).abs() < f32::EPSILON);
        assert!(similarity("abc", "xyz") < 0.1);
    }

    #[test]
    fn test_close_matches_ranks_best_first() {
        let names = ["HELLO", "HELP", "INFO", "EXIT"];
        let matches = close_matches("HELP", &names, 3, DEFAULT_CUTOFF);
        assert_eq!(matches.first(), Some(&"HELP"));
        assert!(matches.contains(&"HELLO"));
        assert!(!matches.contains(&"EXIT"));
    }

    #[test]
    fn test_close_matches_respects_limit() {
        let names = ["ab", "abc", "abcd", "abd", "abe"];
        assert_eq!(close_matches("abc", &names, 3, 0.5).len(), 3);
        assert!(close_matches("abc", &names, 0, 0.5).is_empty());
    }

    #[test]
    fn test_typo_finds_command() {
        let names = ["ABOUT", "PROJECTS", "SKILLS"];
        assert_eq!(close_matches("projekts", &names, 3, DEFAULT_CUTOFF), vec!["PROJECTS"]);
    }
}
