//! Fuzzy string similarity.
//!
//! Grounding only talks to the [`Similarity`] trait, so the scorer can be
//! swapped without touching the checks.

use std::collections::BTreeSet;

/// A symmetric similarity score on a 0-100 scale.
pub trait Similarity: Send + Sync {
    fn score(&self, a: &str, b: &str) -> f64;
}

/// Token-set ratio.
///
/// Both inputs are split into word sets. Shared words are compared against
/// each side's leftover words, so "report" scores 100 against
/// "draft weekly report" while unrelated phrases fall towards 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenSetRatio;

impl Similarity for TokenSetRatio {
    fn score(&self, a: &str, b: &str) -> f64 {
        token_set_ratio(a, b)
    }
}

/// Lowercase, drop punctuation, collapse whitespace.
pub fn normalize_text(text: &str) -> String {
    let stripped: String = text
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn token_set_ratio(a: &str, b: &str) -> f64 {
    let tokens_a: BTreeSet<&str> = a.split_whitespace().collect();
    let tokens_b: BTreeSet<&str> = b.split_whitespace().collect();
    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0.0;
    }

    let shared: Vec<&str> = tokens_a.intersection(&tokens_b).copied().collect();
    let only_a: Vec<&str> = tokens_a.difference(&tokens_b).copied().collect();
    let only_b: Vec<&str> = tokens_b.difference(&tokens_a).copied().collect();

    if !shared.is_empty() && (only_a.is_empty() || only_b.is_empty()) {
        return 100.0;
    }

    let diff_a = only_a.join(" ");
    let diff_b = only_b.join(" ");
    let shared_len = char_len(&shared.join(" "));
    let sep = usize::from(shared_len != 0);

    let shared_a_len = shared_len + sep + char_len(&diff_a);
    let shared_b_len = shared_len + sep + char_len(&diff_b);

    let mut best = ratio(
        indel_distance(&diff_a, &diff_b),
        shared_a_len + shared_b_len,
    );

    if shared_len == 0 {
        return best;
    }

    // shared vs shared+diff differs only by the appended diff.
    best = best.max(ratio(sep + char_len(&diff_a), shared_len + shared_a_len));
    best = best.max(ratio(sep + char_len(&diff_b), shared_len + shared_b_len));
    best
}

fn ratio(distance: usize, total_len: usize) -> f64 {
    if total_len == 0 {
        return 100.0;
    }
    100.0 * (1.0 - distance as f64 / total_len as f64)
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Insertions plus deletions needed to turn `a` into `b`.
fn indel_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    a.len() + b.len() - 2 * lcs_len(&a, &b)
}

fn lcs_len(a: &[char], b: &[char]) -> usize {
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for ca in a {
        for (j, cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text("  Write   the REPORT!! "), "write the report");
        assert_eq!(normalize_text("Mom's B-day, 5pm."), "moms bday 5pm");
        assert_eq!(normalize_text("..."), "");
    }

    #[test]
    fn test_subset_scores_full() {
        let scorer = TokenSetRatio;
        assert_eq!(scorer.score("report", "draft weekly report"), 100.0);
        assert_eq!(scorer.score("morning exercise", "exercise"), 100.0);
    }

    #[test]
    fn test_identical_and_empty() {
        let scorer = TokenSetRatio;
        assert_eq!(scorer.score("buy milk", "buy milk"), 100.0);
        assert_eq!(scorer.score("", "buy milk"), 0.0);
        assert_eq!(scorer.score("buy milk", ""), 0.0);
    }

    #[test]
    fn test_unrelated_scores_low() {
        let scorer = TokenSetRatio;
        assert!(scorer.score("groceries", "morning exercise") < 75.0);
        assert!(scorer.score("groceries", "short workout") < 75.0);
    }

    #[test]
    fn test_near_spelling_scores_high() {
        let scorer = TokenSetRatio;
        assert!(scorer.score("exercises", "exercise") > 90.0);
    }

    #[test]
    fn test_partial_overlap_between_bounds() {
        let score = TokenSetRatio.score("call mom", "call the dentist");
        assert!(score > 0.0 && score < 100.0);
    }

    #[test]
    fn test_symmetric() {
        let scorer = TokenSetRatio;
        let ab = scorer.score("weekly team sync", "team planning sync");
        let ba = scorer.score("team planning sync", "weekly team sync");
        assert!((ab - ba).abs() < f64::EPSILON);
    }

    #[test]
    fn test_indel_distance() {
        assert_eq!(indel_distance("kitten", "sitting"), 5);
        assert_eq!(indel_distance("", "abc"), 3);
        assert_eq!(indel_distance("abc", "abc"), 0);
    }
}
