//! The validator: runs every check over one schedule and renders a verdict.
//!
//! Checks run in a fixed order: overlap, constraints (the fixed-point
//! fallback needs the overlap total), hallucination, recall, feasibility,
//! then per-item structure. Content defects never raise; they accumulate
//! into a failing [`ValidationResult`]. Feasibility flags are reported but
//! never fail a schedule on their own.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::constraints::check_constraints;
use crate::error::ValidationError;
use crate::feasibility::feasibility_flags;
use crate::grounding::{hallucinated_tokens, keyword_recall, RecallReport};
use crate::metadata::Metadata;
use crate::overlap::overlap_minutes;
use crate::schedule::ScheduleItem;
use crate::similarity::{Similarity, TokenSetRatio};

/// Objective measurements of one schedule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationMetrics {
    pub constraint_violation_count: u32,
    pub overlap_minutes: u64,
    pub hallucination_count: u32,
    pub keyword_recall_score: f64,
    pub human_feasibility_flags: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStatus {
    Pass,
    Fail,
}

/// Verdict, metrics and one message per failing check instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub status: ValidationStatus,
    pub metrics: ValidationMetrics,
    pub errors: Vec<String>,
}

impl ValidationResult {
    pub fn passed(&self) -> bool {
        self.status == ValidationStatus::Pass
    }

    /// A failing result carrying a single message and zeroed metrics.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            status: ValidationStatus::Fail,
            metrics: ValidationMetrics::default(),
            errors: vec![message.into()],
        }
    }
}

/// Caller-facing confidence label, derived from a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

/// Deterministic validator over one schedule.
///
/// Holds only configuration and the similarity scorer; no per-request state,
/// so one instance can be shared across concurrent requests.
#[derive(Clone)]
pub struct Validator {
    config: EngineConfig,
    similarity: Arc<dyn Similarity>,
}

impl Validator {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            similarity: Arc::new(TokenSetRatio),
        }
    }

    /// Replace the default token-set scorer.
    pub fn with_similarity(mut self, similarity: Arc<dyn Similarity>) -> Self {
        self.similarity = similarity;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Validate a schedule, folding an invalid interval into a failing result.
    pub fn validate(
        &self,
        items: &[ScheduleItem],
        metadata: &Metadata,
        now: DateTime<FixedOffset>,
    ) -> ValidationResult {
        match self.check(items, metadata, now) {
            Ok(result) => result,
            Err(err) => {
                warn!(error = %err, "Schedule rejected before checks");
                ValidationResult::failure(err.to_string())
            }
        }
    }

    /// Run every check. Errors only on an interval whose end is not after its start.
    pub fn check(
        &self,
        items: &[ScheduleItem],
        metadata: &Metadata,
        now: DateTime<FixedOffset>,
    ) -> Result<ValidationResult, ValidationError> {
        let thresholds = &self.config.thresholds;
        let mut errors = Vec::new();

        let overlap = overlap_minutes(items)?;

        let constraint_report = check_constraints(
            items,
            &metadata.detected_constraints,
            now,
            overlap,
            &self.config.constraints,
        );
        let mut violations = constraint_report.violations;

        let hallucinated = hallucinated_tokens(
            items,
            &metadata.ground_truth_entities,
            &self.config.grounding,
        );

        let recall = self.recall(items, metadata);

        let flags = feasibility_flags(items, &self.config.feasibility);
        if flags > 0 {
            warn!(flags, "Schedule contains long unbroken work blocks");
        }

        if overlap > 0 {
            errors.push(format!("Schedule has {overlap} minutes of overlapping tasks."));
        }
        errors.extend(constraint_report.errors);
        if !hallucinated.is_empty() {
            errors.push(format!(
                "Schedule mentions content not found in the request: {}.",
                hallucinated.join(", ")
            ));
        }
        if recall.score < thresholds.recall_pass {
            errors.push(recall_message(&recall));
        }

        for item in items {
            if item.start_time < now {
                violations += 1;
                errors.push(format!("Task \"{}\" starts in the past.", item.task));
            }
            if item.timebox_minutes == 0 {
                errors.push(format!(
                    "Task \"{}\" has zero duration; tasks must be ≥{} minutes.",
                    item.task, thresholds.min_task_minutes
                ));
                continue;
            }
            // Seconds, so a 60.5 minute item against a 59 minute timebox drifts 1.5.
            let drift_secs = item.duration_seconds() - i64::from(item.timebox_minutes) * 60;
            if drift_secs.abs() > thresholds.duration_tolerance_minutes * 60 {
                errors.push(format!(
                    "Task \"{}\" timebox_minutes mismatch with duration.",
                    item.task
                ));
            }
        }

        let metrics = ValidationMetrics {
            constraint_violation_count: violations,
            overlap_minutes: overlap,
            hallucination_count: hallucinated.len() as u32,
            keyword_recall_score: recall.score,
            human_feasibility_flags: flags,
        };

        let status = if errors.is_empty() {
            ValidationStatus::Pass
        } else {
            ValidationStatus::Fail
        };

        debug!(?metrics, "Validation metrics");
        info!(
            status = ?status,
            violations = metrics.constraint_violation_count,
            overlap = metrics.overlap_minutes,
            hallucinations = metrics.hallucination_count,
            recall = metrics.keyword_recall_score,
            feasibility_flags = metrics.human_feasibility_flags,
            "Schedule validated"
        );

        Ok(ValidationResult {
            status,
            metrics,
            errors,
        })
    }

    /// Keyword coverage under this validator's scorer and threshold.
    pub fn recall(&self, items: &[ScheduleItem], metadata: &Metadata) -> RecallReport {
        keyword_recall(
            items,
            &metadata.task_keywords,
            self.similarity.as_ref(),
            self.config.thresholds.match_score,
        )
    }

    /// Confidence label for a result under this validator's thresholds.
    pub fn confidence(&self, result: &ValidationResult) -> Confidence {
        derive_confidence(result, self.config.thresholds.recall_high_confidence)
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl std::fmt::Debug for Validator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Validator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// `fail` is low; a clean pass with strong recall is high; any other pass is medium.
pub fn derive_confidence(result: &ValidationResult, high_recall: f64) -> Confidence {
    let metrics = &result.metrics;
    match result.status {
        ValidationStatus::Fail => Confidence::Low,
        ValidationStatus::Pass
            if metrics.keyword_recall_score >= high_recall
                && metrics.hallucination_count == 0
                && metrics.overlap_minutes == 0 =>
        {
            Confidence::High
        }
        ValidationStatus::Pass => Confidence::Medium,
    }
}

fn recall_message(recall: &RecallReport) -> String {
    if recall.missing.is_empty() {
        format!(
            "Keyword recall {:.2} is below the required threshold.",
            recall.score
        )
    } else {
        format!(
            "Missing requested tasks: {} (keyword recall {:.2}).",
            recall.missing.join(", "),
            recall.score
        )
    }
}
