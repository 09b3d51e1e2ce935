//! Plancheck Kernel: deterministic validation and bounded repair of generated schedules
//!
//! Given a candidate schedule and metadata extracted from the request, the
//! kernel measures constraint breaches, overlaps, ungrounded content, missed
//! requests and workload density, decides pass/fail, and on failure issues
//! exactly one correction instruction to the generator before re-checking.

pub mod config;
pub mod constraints;
pub mod error;
pub mod feasibility;
pub mod generator;
pub mod grounding;
pub mod metadata;
pub mod overlap;
pub mod repair;
pub mod schedule;
pub mod similarity;
pub mod time_expr;
pub mod validation;

pub use config::EngineConfig;
pub use constraints::{classify, ConstraintKind, TemporalConstraint};
pub use error::{ConfigError, GenerationError, ValidationError};
pub use generator::{GenerationRequest, MetadataExtractor, PlanGenerator};
pub use metadata::Metadata;
pub use repair::{ExecutionMode, Orchestrator, PlanOutcome, PlanRequest, PlanState, RunDebug};
pub use schedule::{GeneratedPlan, ScheduleItem};
pub use similarity::{Similarity, TokenSetRatio};
pub use validation::{
    derive_confidence, Confidence, ValidationMetrics, ValidationResult, ValidationStatus,
    Validator,
};
