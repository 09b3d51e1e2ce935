//! Batch runner: push a list of scenarios through the pipeline.

use std::time::Instant;

use chrono::{DateTime, FixedOffset, Utc};
use tracing::info;

use plancheck_kernel::PlanRequest;

use crate::pipeline::PlanPipeline;
use crate::results::{format_duration, BatchResults, Scenario, ScenarioResult};

/// Run every scenario in order with a shared clock and timezone.
pub async fn run_batch(
    pipeline: &PlanPipeline,
    scenarios: &[Scenario],
    current_time: DateTime<FixedOffset>,
    timezone: &str,
) -> BatchResults {
    let mut batch = BatchResults::new();

    for (idx, scenario) in scenarios.iter().enumerate() {
        info!(
            scenario = %scenario.name,
            mode = %scenario.mode,
            index = idx + 1,
            total = scenarios.len(),
            "Running scenario"
        );

        let request = PlanRequest {
            context: scenario.context.clone(),
            current_time,
            timezone: timezone.to_string(),
            mode: scenario.mode,
        };

        let started_at = Utc::now();
        let start = Instant::now();
        let response = pipeline.run(&request).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        info!(
            scenario = %scenario.name,
            status = ?response.validation.status,
            repair_attempted = response.debug.repair_attempted,
            repair_success = response.debug.repair_success,
            duration = %format_duration(duration_ms),
            "Scenario complete"
        );

        batch.add(ScenarioResult {
            scenario: scenario.name.clone(),
            mode: scenario.mode,
            expectation: scenario.expectation.clone(),
            request_id: response.request_id,
            started_at,
            ended_at: Utc::now(),
            duration_ms,
            status: response.validation.status,
            confidence: response.confidence,
            repair_attempted: response.debug.repair_attempted,
            repair_success: response.debug.repair_success,
            plan_items: response.plan.len(),
            metrics: response.validation.metrics,
            errors: response.validation.errors,
        });
    }

    batch.compute_summary();
    batch
}
