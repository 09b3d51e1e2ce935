//! Configuration types for the engine.
//!
//! Every threshold, keyword table and suppression list the checks use lives
//! here so it can be tuned without touching check code. Loaded from TOML at
//! runtime; missing sections and keys fall back to the defaults below.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Pass/fail and confidence thresholds
    pub thresholds: ThresholdConfig,

    /// Constraint classification table and tolerances
    pub constraints: ConstraintConfig,

    /// Long-block fatigue heuristic
    pub feasibility: FeasibilityConfig,

    /// Token suppression lists for grounding
    pub grounding: GroundingConfig,

    /// Generator call policy
    pub repair: RepairConfig,
}

/// Pass/fail and confidence thresholds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    /// Keyword recall below this fails validation
    pub recall_pass: f64,

    /// Keyword recall at or above this (with no overlap or hallucination) earns high confidence
    pub recall_high_confidence: f64,

    /// Minimum fuzzy similarity (0-100) for a keyword to count as matched
    pub match_score: f64,

    /// Allowed drift between an item's interval and its declared timebox
    pub duration_tolerance_minutes: i64,

    /// Minimum declared length of a task
    pub min_task_minutes: u32,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            recall_pass: 0.7,
            recall_high_confidence: 0.85,
            match_score: 75.0,
            duration_tolerance_minutes: 1,
            min_task_minutes: 5,
        }
    }
}

/// Keyword table for constraint classification plus matching tolerances.
///
/// Keywords are matched as whole words (or whole phrases) against the
/// lowercased constraint text.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConstraintConfig {
    /// Phrases that mark a deadline ("leave by 5 PM")
    pub deadline_keywords: Vec<String>,

    /// Phrases that mark a start gate ("busy until 10 AM")
    pub start_gate_keywords: Vec<String>,

    /// Opening word of an explicit window ("from 2 PM to 4 PM")
    pub window_open_keyword: String,

    /// Closing word of an explicit window
    pub window_close_keyword: String,

    /// A fixed-point is met by any task starting this close to the target
    pub fixed_point_tolerance_minutes: i64,

    /// Floor of the late-start tolerance used when the schedule has no overlaps
    pub fallback_tolerance_minutes: i64,
}

impl Default for ConstraintConfig {
    fn default() -> Self {
        Self {
            deadline_keywords: strings(&["by", "before", "no later than"]),
            start_gate_keywords: strings(&["until"]),
            window_open_keyword: "from".to_string(),
            window_close_keyword: "to".to_string(),
            fixed_point_tolerance_minutes: 5,
            fallback_tolerance_minutes: 30,
        }
    }
}

/// Unbroken-work heuristic.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeasibilityConfig {
    /// A gap at least this long splits two work blocks
    pub min_break_minutes: i64,

    /// Blocks longer than this raise a flag
    pub max_block_minutes: i64,
}

impl Default for FeasibilityConfig {
    fn default() -> Self {
        Self {
            min_break_minutes: 15,
            max_block_minutes: 240,
        }
    }
}

/// Suppression lists for capitalized-token extraction and entity normalization.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GroundingConfig {
    /// Scheduling verbs that are often capitalized at the start of a task label
    pub common_verbs: Vec<String>,

    /// Function words and filler the planner tends to capitalize
    pub stopwords: Vec<String>,

    /// Generic productivity vocabulary that never needs grounding
    pub productivity_whitelist: Vec<String>,

    /// Entity strings too generic to count as a named reference
    pub generic_entity_nouns: Vec<String>,
}

impl GroundingConfig {
    /// Whether a lowercased token is excluded from hallucination checks.
    pub fn is_suppressed(&self, token_lower: &str) -> bool {
        self.common_verbs
            .iter()
            .chain(&self.stopwords)
            .chain(&self.productivity_whitelist)
            .any(|word| word == token_lower)
    }

    /// Whether an entity is just a generic noun.
    pub fn is_generic_entity(&self, entity: &str) -> bool {
        self.generic_entity_nouns
            .iter()
            .any(|noun| noun.eq_ignore_ascii_case(entity))
    }
}

impl Default for GroundingConfig {
    fn default() -> Self {
        Self {
            common_verbs: strings(&[
                "do", "make", "go", "buy", "get", "call", "start", "finish", "ensure", "prepare",
                "meeting", "scheduled", "after", "attend", "take", "need", "complete",
                "prioritize", "stay",
            ]),
            stopwords: strings(&[
                "the", "and", "with", "for", "from", "into", "onto", "about", "over", "under",
                "after", "at", "before", "between", "during", "in", "while", "on", "of", "to",
                "by", "this", "that", "these", "those", "ready", "upcoming", "second",
                "approximately", "organized", "starts", "following", "within", "milk", "another",
                "first", "prior", "scheduled", "planned", "meeting", "ensure", "later", "earlier",
                "attend", "take", "complete", "prioritize", "stay", "need", "buy", "reschedule",
                "rescheduled", "shifting", "conflict", "resolved", "adjusting", "adjusted",
                "shifted", "allocated", "allocation", "remaining", "timeframe", "specified",
                "overlap", "constraint", "modified", "original", "block", "slot", "moved",
            ]),
            productivity_whitelist: strings(&[
                "attend", "meeting", "scheduled", "shifted", "adjusted", "block", "session",
                "duration", "time", "pm", "am", "task", "prepare", "ensure", "within",
                "following", "prior", "another", "second", "leaving",
            ]),
            generic_entity_nouns: strings(&["project"]),
        }
    }
}

/// Generator call policy.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RepairConfig {
    /// Upper bound on each generator call
    pub generator_timeout_secs: u64,
}

impl RepairConfig {
    pub fn generator_timeout(&self) -> Duration {
        Duration::from_secs(self.generator_timeout_secs)
    }
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            generator_timeout_secs: 60,
        }
    }
}

impl EngineConfig {
    /// Parse a TOML document; absent keys keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}

fn strings(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}
