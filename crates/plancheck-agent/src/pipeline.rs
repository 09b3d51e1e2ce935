//! End-to-end pipeline: extract metadata, generate, validate, maybe repair.
//!
//! Each run gets a fresh request id that tags every log line it emits. Runs
//! share no mutable state, so one pipeline can serve concurrent requests.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use plancheck_kernel::repair::GENERATION_FAILED;
use plancheck_kernel::{
    Confidence, Metadata, MetadataExtractor, Orchestrator, PlanRequest, RunDebug, ScheduleItem,
    ValidationResult,
};

/// Everything returned for one planning request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanResponse {
    pub request_id: Uuid,
    pub plan: Vec<ScheduleItem>,
    pub extracted_metadata: Metadata,
    pub assumptions: Vec<String>,
    pub questions: Vec<String>,
    pub confidence: Confidence,
    pub validation: ValidationResult,
    pub debug: RunDebug,
}

/// Extractor plus orchestrator.
pub struct PlanPipeline {
    extractor: Arc<dyn MetadataExtractor>,
    orchestrator: Orchestrator,
}

impl PlanPipeline {
    pub fn new(extractor: Arc<dyn MetadataExtractor>, orchestrator: Orchestrator) -> Self {
        Self {
            extractor,
            orchestrator,
        }
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    /// Run one request to completion. Never fails; problems become a failing response.
    pub async fn run(&self, request: &PlanRequest) -> PlanResponse {
        let request_id = Uuid::new_v4();
        info!(
            %request_id,
            mode = %request.mode,
            context_len = request.context.len(),
            "Starting plan request"
        );

        let metadata = match self.extractor.extract(&request.context).await {
            Ok(metadata) => metadata,
            Err(err) => {
                warn!(%request_id, error = %err, "Metadata extraction failed");
                return PlanResponse {
                    request_id,
                    plan: Vec::new(),
                    extracted_metadata: Metadata::default(),
                    assumptions: Vec::new(),
                    questions: Vec::new(),
                    confidence: Confidence::Low,
                    validation: ValidationResult::failure(GENERATION_FAILED),
                    debug: RunDebug {
                        repair_attempted: false,
                        repair_success: false,
                        mode: request.mode,
                    },
                };
            }
        };

        info!(
            %request_id,
            constraints = metadata.detected_constraints.len(),
            entities = metadata.ground_truth_entities.len(),
            keywords = metadata.task_keywords.len(),
            "Metadata extracted"
        );

        let outcome = self.orchestrator.run(request, &metadata).await;

        info!(
            %request_id,
            status = ?outcome.validation.status,
            confidence = %outcome.confidence,
            repair_attempted = outcome.debug.repair_attempted,
            repair_success = outcome.debug.repair_success,
            "Plan request complete"
        );

        PlanResponse {
            request_id,
            plan: outcome.plan,
            extracted_metadata: metadata,
            assumptions: outcome.assumptions,
            questions: outcome.questions,
            confidence: outcome.confidence,
            validation: outcome.validation,
            debug: outcome.debug,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::{DateTime, FixedOffset};

    use plancheck_kernel::{
        ExecutionMode, GeneratedPlan, GenerationError, GenerationRequest, PlanGenerator,
        ValidationStatus, Validator,
    };

    use super::*;

    struct FixedExtractor(Result<Metadata, GenerationError>);

    #[async_trait]
    impl MetadataExtractor for FixedExtractor {
        async fn extract(&self, _context: &str) -> Result<Metadata, GenerationError> {
            self.0.clone()
        }
    }

    #[derive(Default)]
    struct CountingGenerator {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PlanGenerator for CountingGenerator {
        async fn generate(
            &self,
            _request: GenerationRequest<'_>,
        ) -> Result<GeneratedPlan, GenerationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(GeneratedPlan {
                plan: vec![ScheduleItem::new(
                    "gym session",
                    ts("09:00"),
                    ts("10:00"),
                    60,
                    "morning workout",
                )],
                assumptions: vec![],
                questions: vec![],
            })
        }
    }

    fn ts(clock: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(&format!("2025-01-18T{clock}:00-05:00")).unwrap()
    }

    fn request() -> PlanRequest {
        PlanRequest {
            context: "Go to the gym.".to_string(),
            current_time: ts("08:00"),
            timezone: "America/New_York".to_string(),
            mode: ExecutionMode::AgenticRepair,
        }
    }

    fn pipeline(
        extracted: Result<Metadata, GenerationError>,
        generator: Arc<CountingGenerator>,
    ) -> PlanPipeline {
        PlanPipeline::new(
            Arc::new(FixedExtractor(extracted)),
            Orchestrator::new(generator, Validator::default()),
        )
    }

    #[tokio::test]
    async fn test_successful_run_attaches_metadata() {
        let metadata = Metadata::new(vec![], vec![], vec!["gym".to_string()]);
        let generator = Arc::new(CountingGenerator::default());
        let response = pipeline(Ok(metadata.clone()), generator.clone())
            .run(&request())
            .await;

        assert_eq!(response.validation.status, ValidationStatus::Pass);
        assert_eq!(response.extracted_metadata, metadata);
        assert_eq!(response.plan.len(), 1);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_extraction_failure_skips_generation() {
        let generator = Arc::new(CountingGenerator::default());
        let response = pipeline(
            Err(GenerationError::Transport("down".to_string())),
            generator.clone(),
        )
        .run(&request())
        .await;

        assert!(response.plan.is_empty());
        assert_eq!(response.confidence, Confidence::Low);
        assert_eq!(response.validation.errors, vec![GENERATION_FAILED.to_string()]);
        assert_eq!(response.extracted_metadata, Metadata::default());
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_request_ids_are_unique() {
        let metadata = Metadata::new(vec![], vec![], vec!["gym".to_string()]);
        let p = pipeline(Ok(metadata), Arc::new(CountingGenerator::default()));
        let first = p.run(&request()).await;
        let second = p.run(&request()).await;
        assert_ne!(first.request_id, second.request_id);
    }

    #[test]
    fn test_response_wire_names() {
        let response = PlanResponse {
            request_id: Uuid::nil(),
            plan: vec![],
            extracted_metadata: Metadata::default(),
            assumptions: vec![],
            questions: vec![],
            confidence: Confidence::Medium,
            validation: ValidationResult::failure("x"),
            debug: RunDebug {
                repair_attempted: true,
                repair_success: false,
                mode: ExecutionMode::AgenticRepair,
            },
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["confidence"], "medium");
        assert_eq!(json["debug"]["variant"], "v3_agentic_repair");
        assert!(json["extracted_metadata"]["task_keywords"].is_array());
    }
}
