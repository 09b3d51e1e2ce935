//! Integration tests for the generate -> validate -> repair flow.
//!
//! A scripted generator replays canned responses in order and records every
//! call, so the tests can assert exactly how many generator calls each mode
//! makes and what each call saw.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use tokio::sync::Mutex;

use plancheck_kernel::{
    Confidence, EngineConfig, ExecutionMode, GeneratedPlan, GenerationError, GenerationRequest,
    Metadata, Orchestrator, PlanGenerator, PlanRequest, ScheduleItem, ValidationStatus,
    Validator,
};

/// What one generator call saw
#[derive(Debug, Clone)]
struct RecordedCall {
    had_metadata: bool,
    repair_instruction: Option<String>,
}

enum Scripted {
    Plan(GeneratedPlan),
    Fail(GenerationError),
    Hang,
}

struct ScriptedGenerator {
    responses: Mutex<VecDeque<Scripted>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedGenerator {
    fn new(responses: Vec<Scripted>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            calls: Mutex::new(Vec::new()),
        })
    }

    async fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl PlanGenerator for ScriptedGenerator {
    async fn generate(
        &self,
        request: GenerationRequest<'_>,
    ) -> Result<GeneratedPlan, GenerationError> {
        self.calls.lock().await.push(RecordedCall {
            had_metadata: *request.metadata != Metadata::default(),
            repair_instruction: request.repair_instruction.map(str::to_string),
        });

        let next = self.responses.lock().await.pop_front();
        match next {
            Some(Scripted::Plan(plan)) => Ok(plan),
            Some(Scripted::Fail(err)) => Err(err),
            Some(Scripted::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(GenerationError::Transport("woke up".to_string()))
            }
            None => Err(GenerationError::Transport("script exhausted".to_string())),
        }
    }
}

fn ts(clock: &str) -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339(&format!("2025-01-18T{clock}:00-05:00")).unwrap()
}

fn item(task: &str, start: &str, end: &str) -> ScheduleItem {
    let minutes = (ts(end) - ts(start)).num_minutes() as u32;
    ScheduleItem::new(task, ts(start), ts(end), minutes, "")
}

fn plan(items: Vec<ScheduleItem>) -> Scripted {
    Scripted::Plan(GeneratedPlan {
        plan: items,
        assumptions: vec!["assumed focus block".to_string()],
        questions: vec!["Any other tasks?".to_string()],
    })
}

fn overlapping() -> Scripted {
    plan(vec![
        item("Alpha", "09:00", "10:00"),
        item("Beta", "09:30", "10:30"),
    ])
}

fn resolved() -> Scripted {
    plan(vec![
        item("Alpha", "09:00", "10:00"),
        item("Beta", "10:15", "11:15"),
    ])
}

fn request(mode: ExecutionMode) -> PlanRequest {
    PlanRequest {
        context: "Plan my day with Alpha and Beta.".to_string(),
        current_time: ts("08:00"),
        timezone: "America/New_York".to_string(),
        mode,
    }
}

fn metadata() -> Metadata {
    Metadata::new(
        vec![],
        vec!["alpha".to_string(), "beta".to_string()],
        vec!["alpha".to_string(), "beta".to_string()],
    )
}

fn orchestrator(generator: Arc<ScriptedGenerator>) -> Orchestrator {
    Orchestrator::new(generator, Validator::new(EngineConfig::default()))
}

#[tokio::test]
async fn test_repair_fixes_overlap() {
    let generator = ScriptedGenerator::new(vec![overlapping(), resolved()]);
    let outcome = orchestrator(generator.clone())
        .run(&request(ExecutionMode::AgenticRepair), &metadata())
        .await;

    assert!(outcome.debug.repair_attempted);
    assert!(outcome.debug.repair_success);
    assert_eq!(outcome.validation.status, ValidationStatus::Pass);
    assert_eq!(outcome.plan[1].start_time, ts("10:15"));
    assert_eq!(outcome.assumptions, vec!["assumed focus block"]);
    assert_eq!(outcome.confidence, Confidence::High);

    let calls = generator.calls().await;
    assert_eq!(calls.len(), 2);
    assert!(calls[0].repair_instruction.is_none());
    let instruction = calls[1].repair_instruction.as_deref().unwrap();
    assert!(instruction.contains("Plan my day with Alpha and Beta."));
    assert!(instruction.contains("overlapping"));
}

#[tokio::test]
async fn test_exactly_one_repair_even_if_it_still_fails() {
    let generator = ScriptedGenerator::new(vec![overlapping(), overlapping(), resolved()]);
    let outcome = orchestrator(generator.clone())
        .run(&request(ExecutionMode::AgenticRepair), &metadata())
        .await;

    assert!(outcome.debug.repair_attempted);
    assert!(!outcome.debug.repair_success);
    assert_eq!(outcome.validation.status, ValidationStatus::Fail);
    assert_eq!(outcome.validation.metrics.overlap_minutes, 30);
    assert_eq!(outcome.confidence, Confidence::Low);
    assert_eq!(generator.calls().await.len(), 2);
}

#[tokio::test]
async fn test_non_repair_modes_call_generator_once() {
    for mode in [ExecutionMode::Naive, ExecutionMode::Structured] {
        let generator = ScriptedGenerator::new(vec![overlapping(), resolved()]);
        let outcome = orchestrator(generator.clone())
            .run(&request(mode), &metadata())
            .await;

        assert_eq!(outcome.validation.status, ValidationStatus::Fail);
        assert!(!outcome.debug.repair_attempted);
        assert_eq!(outcome.debug.mode, mode);
        assert_eq!(generator.calls().await.len(), 1);
    }
}

#[tokio::test]
async fn test_passing_plan_skips_repair() {
    let generator = ScriptedGenerator::new(vec![resolved(), overlapping()]);
    let outcome = orchestrator(generator.clone())
        .run(&request(ExecutionMode::AgenticRepair), &metadata())
        .await;

    assert!(outcome.validation.errors.is_empty());
    assert!(!outcome.debug.repair_attempted);
    assert_eq!(generator.calls().await.len(), 1);
}

#[tokio::test]
async fn test_naive_mode_withholds_metadata() {
    let naive = ScriptedGenerator::new(vec![resolved()]);
    orchestrator(naive.clone())
        .run(&request(ExecutionMode::Naive), &metadata())
        .await;
    assert!(!naive.calls().await[0].had_metadata);

    let structured = ScriptedGenerator::new(vec![resolved()]);
    orchestrator(structured.clone())
        .run(&request(ExecutionMode::Structured), &metadata())
        .await;
    assert!(structured.calls().await[0].had_metadata);
}

#[tokio::test]
async fn test_malformed_output_is_terminal() {
    let generator = ScriptedGenerator::new(vec![
        Scripted::Fail(GenerationError::Malformed("missing plan".to_string())),
        resolved(),
    ]);
    let outcome = orchestrator(generator.clone())
        .run(&request(ExecutionMode::AgenticRepair), &metadata())
        .await;

    assert!(outcome.plan.is_empty());
    assert_eq!(outcome.confidence, Confidence::Low);
    assert_eq!(outcome.validation.errors.len(), 1);
    assert!(outcome.validation.errors[0].contains("generation failed"));
    assert!(!outcome.debug.repair_attempted);
    assert_eq!(generator.calls().await.len(), 1);
}

#[tokio::test]
async fn test_repair_call_failure_is_terminal() {
    let generator = ScriptedGenerator::new(vec![
        overlapping(),
        Scripted::Fail(GenerationError::Transport("connection reset".to_string())),
    ]);
    let outcome = orchestrator(generator.clone())
        .run(&request(ExecutionMode::AgenticRepair), &metadata())
        .await;

    assert!(outcome.plan.is_empty());
    assert_eq!(outcome.confidence, Confidence::Low);
    assert!(outcome.debug.repair_attempted);
    assert!(!outcome.debug.repair_success);
    assert_eq!(generator.calls().await.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_generator_timeout_degrades_to_failure() {
    let generator = ScriptedGenerator::new(vec![Scripted::Hang]);
    let outcome = orchestrator(generator.clone())
        .with_timeout(Duration::from_secs(5))
        .run(&request(ExecutionMode::AgenticRepair), &metadata())
        .await;

    assert!(outcome.plan.is_empty());
    assert_eq!(outcome.validation.status, ValidationStatus::Fail);
    assert_eq!(outcome.confidence, Confidence::Low);
    assert_eq!(generator.calls().await.len(), 1);
}

#[tokio::test]
async fn test_invalid_interval_is_not_repaired() {
    let generator = ScriptedGenerator::new(vec![
        plan(vec![ScheduleItem::new("Alpha", ts("10:00"), ts("09:00"), 60, "")]),
        resolved(),
    ]);
    let outcome = orchestrator(generator.clone())
        .run(&request(ExecutionMode::AgenticRepair), &metadata())
        .await;

    assert_eq!(outcome.validation.status, ValidationStatus::Fail);
    assert!(outcome.validation.errors[0].contains("Invalid interval"));
    assert!(!outcome.debug.repair_attempted);
    assert_eq!(generator.calls().await.len(), 1);
}

#[tokio::test]
async fn test_constraint_escalation_in_instruction() {
    let generator = ScriptedGenerator::new(vec![
        plan(vec![item("Alpha", "09:30", "10:30")]),
        plan(vec![item("Alpha", "10:00", "11:00")]),
    ]);
    let metadata = Metadata::new(
        vec!["Busy until 10 AM".to_string()],
        vec!["alpha".to_string()],
        vec!["alpha".to_string()],
    );
    let outcome = orchestrator(generator.clone())
        .run(&request(ExecutionMode::AgenticRepair), &metadata)
        .await;

    assert!(outcome.debug.repair_success);
    let calls = generator.calls().await;
    let instruction = calls[1].repair_instruction.as_deref().unwrap();
    assert!(instruction.contains("move it later"));
    assert!(instruction.contains("Task starts before 10:00 AM"));
}

#[tokio::test]
async fn test_concurrent_requests_are_isolated() {
    let shared = Arc::new(Validator::new(EngineConfig::default()));

    let grounded = {
        let generator = ScriptedGenerator::new(vec![resolved()]);
        let validator = (*shared).clone();
        tokio::spawn(async move {
            Orchestrator::new(generator, validator)
                .run(&request(ExecutionMode::Structured), &metadata())
                .await
        })
    };
    let ungrounded = {
        let generator = ScriptedGenerator::new(vec![resolved()]);
        let validator = (*shared).clone();
        tokio::spawn(async move {
            let bare = Metadata::new(vec![], vec![], vec!["alpha".to_string(), "beta".to_string()]);
            Orchestrator::new(generator, validator)
                .run(&request(ExecutionMode::Structured), &bare)
                .await
        })
    };

    let grounded = grounded.await.unwrap();
    let ungrounded = ungrounded.await.unwrap();

    assert_eq!(grounded.validation.metrics.hallucination_count, 0);
    assert_eq!(grounded.validation.status, ValidationStatus::Pass);
    assert_eq!(ungrounded.validation.metrics.hallucination_count, 2);
    assert_eq!(ungrounded.validation.status, ValidationStatus::Fail);
}
