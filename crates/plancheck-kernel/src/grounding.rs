//! Grounding: does the schedule cover what was asked, and only what exists?
//!
//! Recall fuzzy-matches requested keywords against schedule text.
//! Hallucination looks for capitalized tokens in task labels that no declared
//! entity accounts for.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::config::GroundingConfig;
use crate::schedule::ScheduleItem;
use crate::similarity::{normalize_text, Similarity};

static CAPITALIZED_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[A-Z][a-zA-Z0-9\-\.]*\b").expect("capitalized token pattern is valid")
});

/// Keyword coverage of a schedule.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecallReport {
    /// matched / total, or 0.0 when either side is empty
    pub score: f64,
    pub matched: Vec<String>,
    pub missing: Vec<String>,
}

/// Score how many requested keywords the schedule text covers.
///
/// Each item contributes its task label and its rationale as separate
/// candidates. A keyword matches when its best score reaches `threshold`.
pub fn keyword_recall(
    items: &[ScheduleItem],
    keywords: &[String],
    similarity: &dyn Similarity,
    threshold: f64,
) -> RecallReport {
    let keywords: Vec<(&String, String)> = keywords
        .iter()
        .map(|keyword| (keyword, normalize_text(keyword)))
        .filter(|(_, normalized)| !normalized.is_empty())
        .collect();

    let candidates: Vec<String> = items
        .iter()
        .flat_map(|item| [item.task.as_str(), item.why.as_str()])
        .map(normalize_text)
        .filter(|candidate| !candidate.is_empty())
        .collect();

    if keywords.is_empty() || candidates.is_empty() {
        return RecallReport {
            score: 0.0,
            matched: Vec::new(),
            missing: keywords.into_iter().map(|(raw, _)| raw.clone()).collect(),
        };
    }

    let mut report = RecallReport::default();
    for (raw, normalized) in &keywords {
        let best = candidates
            .iter()
            .map(|candidate| similarity.score(normalized, candidate))
            .fold(0.0_f64, f64::max);
        debug!(keyword = %raw, best, "Keyword match");
        if best >= threshold {
            report.matched.push((*raw).clone());
        } else {
            report.missing.push((*raw).clone());
        }
    }
    report.score = report.matched.len() as f64 / keywords.len() as f64;
    report
}

/// Capitalized tokens from task labels, minus suppressed vocabulary.
///
/// Distinct tokens only, in sorted order.
pub fn capitalized_tokens(items: &[ScheduleItem], config: &GroundingConfig) -> BTreeSet<String> {
    items
        .iter()
        .flat_map(|item| CAPITALIZED_TOKEN.find_iter(&item.task))
        .map(|m| m.as_str())
        .filter(|token| !config.is_suppressed(&token.to_lowercase()))
        .map(str::to_string)
        .collect()
}

/// Tokens in task labels that no declared entity accounts for.
///
/// A token is grounded when it is a case-insensitive substring of some
/// entity. With no entities declared at all, every token is flagged.
pub fn hallucinated_tokens(
    items: &[ScheduleItem],
    entities: &[String],
    config: &GroundingConfig,
) -> Vec<String> {
    let entities: Vec<String> = entities
        .iter()
        .map(|entity| entity.trim().to_lowercase())
        .filter(|entity| !entity.is_empty())
        .collect();

    capitalized_tokens(items, config)
        .into_iter()
        .filter(|token| {
            let token = token.to_lowercase();
            !entities.iter().any(|entity| entity.contains(&token))
        })
        .collect()
}
