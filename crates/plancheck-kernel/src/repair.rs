//! Generate, validate, and at most one repair.
//!
//! A request moves through [`PlanState`]: `Generated` -> `Validated` ->
//! `Repaired`. `Repaired` has no outgoing transition, so a second repair
//! cannot happen. Generator failures and timeouts end the run with a
//! failing outcome; nothing here returns an error to the caller.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::GenerationError;
use crate::generator::{GenerationRequest, PlanGenerator};
use crate::metadata::Metadata;
use crate::schedule::{GeneratedPlan, ScheduleItem};
use crate::validation::{Confidence, ValidationResult, Validator};

/// Message recorded when the generator produced nothing usable.
pub const GENERATION_FAILED: &str = "Plan generation failed; no schedule was produced.";

const PRIORITY_POLICY: &str = "Constraint priority: hard availability constraints \
(start gates, deadlines, fixed appointments) and non-overlap outrank preferred \
durations. If everything cannot fit, shorten tasks instead of deleting them.";

/// How much of the pipeline a request uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExecutionMode {
    /// Generator sees only the request text; no repair
    #[serde(rename = "v1_naive")]
    Naive,
    /// Generator sees the extracted metadata; no repair
    #[serde(rename = "v2_structured")]
    Structured,
    /// Structured plus one repair on failure
    #[serde(rename = "v3_agentic_repair")]
    AgenticRepair,
}

impl ExecutionMode {
    pub fn allows_repair(self) -> bool {
        matches!(self, Self::AgenticRepair)
    }

    pub fn forwards_metadata(self) -> bool {
        !matches!(self, Self::Naive)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Naive => "v1_naive",
            Self::Structured => "v2_structured",
            Self::AgenticRepair => "v3_agentic_repair",
        }
    }
}

impl std::fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ExecutionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "v1_naive" | "naive" => Ok(Self::Naive),
            "v2_structured" | "structured" => Ok(Self::Structured),
            "v3_agentic_repair" | "repair" => Ok(Self::AgenticRepair),
            other => Err(format!("unknown execution mode: {other}")),
        }
    }
}

/// One planning request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanRequest {
    pub context: String,
    pub current_time: DateTime<FixedOffset>,
    pub timezone: String,
    #[serde(rename = "variant")]
    pub mode: ExecutionMode,
}

/// What happened on the way to the outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunDebug {
    pub repair_attempted: bool,
    /// A repair ran and its re-validation passed
    pub repair_success: bool,
    #[serde(rename = "variant")]
    pub mode: ExecutionMode,
}

/// Final, terminal result of one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanOutcome {
    pub plan: Vec<ScheduleItem>,
    pub assumptions: Vec<String>,
    pub questions: Vec<String>,
    pub confidence: Confidence,
    pub validation: ValidationResult,
    pub debug: RunDebug,
}

/// Lifecycle of one request's schedule.
#[derive(Debug, Clone)]
pub enum PlanState {
    /// Fresh from the generator, not yet judged
    Generated(GeneratedPlan),
    /// Judged once; may still be eligible for repair
    Validated {
        plan: GeneratedPlan,
        validation: ValidationResult,
    },
    /// Replaced by the repair call and judged again. Terminal.
    Repaired {
        plan: GeneratedPlan,
        validation: ValidationResult,
    },
}

/// Drives one request through generation, validation and repair.
pub struct Orchestrator {
    generator: Arc<dyn PlanGenerator>,
    validator: Validator,
    timeout: Duration,
}

impl Orchestrator {
    pub fn new(generator: Arc<dyn PlanGenerator>, validator: Validator) -> Self {
        let timeout = validator.config().repair.generator_timeout();
        Self {
            generator,
            validator,
            timeout,
        }
    }

    /// Override the per-call generator timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    /// Run a request to its terminal outcome.
    pub async fn run(&self, request: &PlanRequest, metadata: &Metadata) -> PlanOutcome {
        let initial = match self.generate(request, metadata, None).await {
            Ok(plan) => plan,
            Err(err) => {
                warn!(error = %err, mode = %request.mode, "Initial generation failed");
                return self.generation_failure(request.mode, false);
            }
        };

        let mut state = PlanState::Generated(initial);
        loop {
            state = match state {
                PlanState::Generated(plan) => {
                    match self.validator.check(&plan.plan, metadata, request.current_time) {
                        Ok(validation) => PlanState::Validated { plan, validation },
                        Err(err) => {
                            // Not something a regenerated schedule is trusted to fix.
                            warn!(error = %err, "Invalid interval, skipping repair");
                            let validation = ValidationResult::failure(err.to_string());
                            return self.finish(plan, validation, request.mode, false);
                        }
                    }
                }
                PlanState::Validated { plan, validation } => {
                    if validation.passed() || !request.mode.allows_repair() {
                        return self.finish(plan, validation, request.mode, false);
                    }
                    info!(
                        errors = validation.errors.len(),
                        "Validation failed, attempting repair"
                    );
                    match self.repair(request, metadata, &plan, &validation).await {
                        Ok(repaired) => {
                            let validation = self.validator.validate(
                                &repaired.plan,
                                metadata,
                                request.current_time,
                            );
                            PlanState::Repaired {
                                plan: repaired,
                                validation,
                            }
                        }
                        Err(err) => {
                            warn!(error = %err, "Repair generation failed");
                            return self.generation_failure(request.mode, true);
                        }
                    }
                }
                PlanState::Repaired { plan, validation } => {
                    info!(passed = validation.passed(), "Repair complete");
                    return self.finish(plan, validation, request.mode, true);
                }
            };
        }
    }

    /// Ask the generator for a corrected schedule. One call, no retry.
    pub async fn repair(
        &self,
        request: &PlanRequest,
        metadata: &Metadata,
        failing: &GeneratedPlan,
        validation: &ValidationResult,
    ) -> Result<GeneratedPlan, GenerationError> {
        let instruction = self.build_repair_instruction(request, metadata, failing, validation);
        self.generate(request, metadata, Some(&instruction)).await
    }

    /// Correction instruction for a failing schedule.
    ///
    /// Carries the request, the failing schedule and its errors, the priority
    /// policy, and extra clauses for constraint violations and low recall.
    pub fn build_repair_instruction(
        &self,
        request: &PlanRequest,
        metadata: &Metadata,
        failing: &GeneratedPlan,
        validation: &ValidationResult,
    ) -> String {
        let plan_json = serde_json::to_string_pretty(&failing.plan)
            .unwrap_or_else(|_| "[]".to_string());
        let errors_json = serde_json::to_string_pretty(&validation.errors)
            .unwrap_or_else(|_| "[]".to_string());

        let mut instruction = format!(
            "The previous schedule failed validation. Produce a corrected schedule.\n\n\
             Original request:\n{}\n\n\
             Failing schedule:\n{plan_json}\n\n\
             Validation errors:\n{errors_json}\n\n\
             {PRIORITY_POLICY}",
            request.context
        );

        if validation.metrics.constraint_violation_count > 0 {
            instruction.push_str(
                "\n\nTime constraints were violated. If a task cannot happen when the \
                 request implied, move it later rather than earlier, even if the text \
                 suggested an earlier time. No task may start before a stated start gate \
                 or end after a stated deadline.",
            );
        }

        let thresholds = &self.validator.config().thresholds;
        if validation.metrics.keyword_recall_score < thresholds.recall_pass {
            let missing = self.validator.recall(&failing.plan, metadata).missing;
            instruction.push_str("\n\nRequested tasks are missing from the schedule.");
            if !missing.is_empty() {
                instruction.push_str(&format!(
                    " Include every one of these: {}.",
                    missing.join(", ")
                ));
            }
            instruction.push_str(" Do not delete any requested task; shorten tasks to make room.");
        }

        instruction
    }

    async fn generate(
        &self,
        request: &PlanRequest,
        metadata: &Metadata,
        repair_instruction: Option<&str>,
    ) -> Result<GeneratedPlan, GenerationError> {
        let empty = Metadata::default();
        let forwarded = if request.mode.forwards_metadata() {
            metadata
        } else {
            &empty
        };

        let call = self.generator.generate(GenerationRequest {
            context: &request.context,
            metadata: forwarded,
            current_time: request.current_time,
            timezone: &request.timezone,
            repair_instruction,
        });

        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(GenerationError::Timeout(self.timeout)),
        }
    }

    fn finish(
        &self,
        plan: GeneratedPlan,
        validation: ValidationResult,
        mode: ExecutionMode,
        repair_attempted: bool,
    ) -> PlanOutcome {
        let repair_success = repair_attempted && validation.passed();
        PlanOutcome {
            plan: plan.plan,
            assumptions: plan.assumptions,
            questions: plan.questions,
            confidence: self.validator.confidence(&validation),
            validation,
            debug: RunDebug {
                repair_attempted,
                repair_success,
                mode,
            },
        }
    }

    fn generation_failure(&self, mode: ExecutionMode, repair_attempted: bool) -> PlanOutcome {
        PlanOutcome {
            plan: Vec::new(),
            assumptions: Vec::new(),
            questions: Vec::new(),
            confidence: Confidence::Low,
            validation: ValidationResult::failure(GENERATION_FAILED),
            debug: RunDebug {
                repair_attempted,
                repair_success: false,
                mode,
            },
        }
    }
}
