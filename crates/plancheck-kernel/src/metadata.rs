//! Request metadata: what the extractor attests about the source text.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::config::GroundingConfig;

/// Structured view of a planning request.
///
/// Immutable for the life of one request and shared read-only across the
/// validate/repair cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    /// Raw boundary/deadline phrases ("leave by 5 PM")
    #[serde(default)]
    pub detected_constraints: Vec<String>,
    /// Named references present in the source text
    #[serde(default)]
    pub ground_truth_entities: Vec<String>,
    /// Activities the user wants scheduled
    #[serde(default)]
    pub task_keywords: Vec<String>,
}

impl Metadata {
    pub fn new(
        detected_constraints: Vec<String>,
        ground_truth_entities: Vec<String>,
        task_keywords: Vec<String>,
    ) -> Self {
        Self {
            detected_constraints,
            ground_truth_entities,
            task_keywords,
        }
    }

    /// Clean up raw extractor output.
    ///
    /// Every list is trimmed and de-duplicated in first-seen order. Entities
    /// additionally gain their variants without a leading or trailing
    /// generic-noun qualifier ("Apollo project" also yields "Apollo"), and
    /// bare generic nouns are dropped.
    pub fn normalized(&self, grounding: &GroundingConfig) -> Self {
        Self {
            detected_constraints: dedup_trimmed(&self.detected_constraints),
            ground_truth_entities: normalize_entities(&self.ground_truth_entities, grounding),
            task_keywords: dedup_trimmed(&self.task_keywords),
        }
    }
}

fn dedup_trimmed(values: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty() && seen.insert(v.to_string()))
        .map(str::to_string)
        .collect()
}

fn normalize_entities(entities: &[String], grounding: &GroundingConfig) -> Vec<String> {
    let mut normalized = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    let mut push = |candidate: &str| {
        let candidate = candidate.trim();
        if candidate.is_empty() || grounding.is_generic_entity(candidate) {
            return;
        }
        if seen.insert(candidate.to_string()) {
            normalized.push(candidate.to_string());
        }
    };

    for entity in entities {
        let base = entity.trim();
        if base.is_empty() {
            continue;
        }
        push(base);
        for noun in &grounding.generic_entity_nouns {
            if let Some(rest) = strip_leading_word(base, noun) {
                push(rest);
            }
            if let Some(rest) = strip_trailing_word(base, noun) {
                push(rest);
            }
        }
    }

    normalized
}

/// "project Apollo" -> "Apollo" (case-insensitive, whole word only).
fn strip_leading_word<'a>(text: &'a str, word: &str) -> Option<&'a str> {
    let (head, rest) = text.split_once(char::is_whitespace)?;
    head.eq_ignore_ascii_case(word).then(|| rest.trim_start())
}

/// "Apollo project" -> "Apollo" (case-insensitive, whole word only).
fn strip_trailing_word<'a>(text: &'a str, word: &str) -> Option<&'a str> {
    let (rest, tail) = text.rsplit_once(char::is_whitespace)?;
    tail.eq_ignore_ascii_case(word).then(|| rest.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_normalize_entities_variants() {
        let raw = Metadata::new(
            vec![],
            strings(&["Apollo project", "project Apollo", "Apollo", "", "project", "  "]),
            vec![],
        );
        let normalized = raw.normalized(&GroundingConfig::default());

        assert_eq!(
            normalized.ground_truth_entities,
            strings(&["Apollo project", "Apollo", "project Apollo"])
        );
    }

    #[test]
    fn test_normalize_keeps_words_containing_qualifier() {
        let raw = Metadata::new(vec![], strings(&["Projection Lab"]), vec![]);
        let normalized = raw.normalized(&GroundingConfig::default());
        assert_eq!(normalized.ground_truth_entities, strings(&["Projection Lab"]));
    }

    #[test]
    fn test_normalize_dedups_other_lists() {
        let raw = Metadata::new(
            strings(&["Meeting at 2 PM", " Meeting at 2 PM ", ""]),
            vec![],
            strings(&["call", "call", "report"]),
        );
        let normalized = raw.normalized(&GroundingConfig::default());
        assert_eq!(normalized.detected_constraints, strings(&["Meeting at 2 PM"]));
        assert_eq!(normalized.task_keywords, strings(&["call", "report"]));
    }

    #[test]
    fn test_metadata_missing_lists_default_empty() {
        let parsed: Metadata =
            serde_json::from_str(r#"{"task_keywords": ["gym"]}"#).unwrap();
        assert!(parsed.detected_constraints.is_empty());
        assert!(parsed.ground_truth_entities.is_empty());
        assert_eq!(parsed.task_keywords, strings(&["gym"]));
    }
}
