//! Batch scenario results and per-mode summaries.
//!
//! Captures, per scenario run:
//! - Final status and confidence
//! - Whether repair ran and whether it fixed the schedule
//! - Validation metrics and errors
//! - Wall-clock duration

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use plancheck_kernel::{Confidence, ExecutionMode, ValidationMetrics, ValidationStatus};

/// One scripted planning request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub context: String,
    #[serde(rename = "variant")]
    pub mode: ExecutionMode,
    /// Free-text note on what should happen
    #[serde(default)]
    pub expectation: String,
}

/// Load a JSON array of scenarios.
pub fn load_scenarios(path: impl AsRef<Path>) -> Result<Vec<Scenario>> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read scenarios from {}", path.display()))?;
    serde_json::from_str(&json)
        .with_context(|| format!("Failed to parse scenarios in {}", path.display()))
}

/// Results from a single scenario run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario: String,
    #[serde(rename = "variant")]
    pub mode: ExecutionMode,
    pub expectation: String,
    pub request_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub status: ValidationStatus,
    pub confidence: Confidence,
    pub repair_attempted: bool,
    pub repair_success: bool,
    pub plan_items: usize,
    pub metrics: ValidationMetrics,
    pub errors: Vec<String>,
}

/// Aggregate results from a batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchResults {
    /// All individual results
    pub results: Vec<ScenarioResult>,
    /// Summary statistics by execution mode
    pub summary: BTreeMap<String, ModeSummary>,
}

/// Summary statistics for one execution mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModeSummary {
    pub mode: String,
    pub runs: usize,
    pub pass_rate: f64,
    /// Standard error of pass rate: sqrt(p(1-p)/n)
    pub pass_rate_se: f64,
    /// 95% confidence interval for pass rate: (lower, upper)
    pub pass_rate_ci: (f64, f64),
    /// Share of runs that attempted a repair
    pub repair_rate: f64,
    /// Share of attempted repairs that passed re-validation
    pub repair_success_rate: f64,
    pub avg_recall: f64,
    pub avg_duration_ms: f64,
}

impl BatchResults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, result: ScenarioResult) {
        self.results.push(result);
    }

    /// Compute summary statistics.
    pub fn compute_summary(&mut self) {
        let mut by_mode: BTreeMap<String, Vec<&ScenarioResult>> = BTreeMap::new();
        for result in &self.results {
            by_mode
                .entry(result.mode.to_string())
                .or_default()
                .push(result);
        }

        self.summary.clear();
        for (mode, results) in by_mode {
            let runs = results.len();
            let n = runs as f64;

            let passed = results
                .iter()
                .filter(|r| r.status == ValidationStatus::Pass)
                .count();
            let pass_rate = passed as f64 / n;

            let pass_rate_se = if runs > 1 {
                (pass_rate * (1.0 - pass_rate) / n).sqrt()
            } else {
                0.0
            };

            // 95% CI: p ± 1.96 * SE, clamped to [0, 1]
            let z = 1.96;
            let pass_rate_ci = (
                (pass_rate - z * pass_rate_se).max(0.0),
                (pass_rate + z * pass_rate_se).min(1.0),
            );

            let attempted = results.iter().filter(|r| r.repair_attempted).count();
            let repaired = results.iter().filter(|r| r.repair_success).count();
            let repair_success_rate = if attempted > 0 {
                repaired as f64 / attempted as f64
            } else {
                0.0
            };

            let avg_recall = results
                .iter()
                .map(|r| r.metrics.keyword_recall_score)
                .sum::<f64>()
                / n;
            let avg_duration_ms = results.iter().map(|r| r.duration_ms as f64).sum::<f64>() / n;

            self.summary.insert(
                mode.clone(),
                ModeSummary {
                    mode,
                    runs,
                    pass_rate,
                    pass_rate_se,
                    pass_rate_ci,
                    repair_rate: attempted as f64 / n,
                    repair_success_rate,
                    avg_recall,
                    avg_duration_ms,
                },
            );
        }
    }

    /// Save results to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)
            .with_context(|| format!("Failed to write {}", path.as_ref().display()))?;
        Ok(())
    }

    /// Load results from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let results = serde_json::from_str(&json)?;
        Ok(results)
    }

    /// One line per execution mode.
    pub fn render_summary(&self) -> String {
        self.summary
            .iter()
            .map(|(mode, summary)| {
                format!(
                    "  {}: runs={}, pass_rate={:.1}%, repair_rate={:.1}%, \
                     repair_success={:.1}%, avg_recall={:.2}",
                    mode,
                    summary.runs,
                    summary.pass_rate * 100.0,
                    summary.repair_rate * 100.0,
                    summary.repair_success_rate * 100.0,
                    summary.avg_recall
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Format a duration in milliseconds for display.
pub fn format_duration(ms: u64) -> String {
    if ms < 1000 {
        format!("{}ms", ms)
    } else if ms < 60_000 {
        format!("{:.1}s", ms as f64 / 1000.0)
    } else {
        format!("{:.1}m", ms as f64 / 60_000.0)
    }
}
