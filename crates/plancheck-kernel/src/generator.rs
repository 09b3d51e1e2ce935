//! Collaborator seams: the plan generator and the metadata extractor.
//!
//! Both are opaque to the engine. Implementations live outside the kernel
//! (an LLM-backed one ships in the agent crate; tests script their own).

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};

use crate::error::GenerationError;
use crate::metadata::Metadata;
use crate::schedule::GeneratedPlan;

/// Everything a generator sees for one call.
#[derive(Debug, Clone, Copy)]
pub struct GenerationRequest<'a> {
    /// The user's free-form request
    pub context: &'a str,
    pub metadata: &'a Metadata,
    /// Current local time with UTC offset
    pub current_time: DateTime<FixedOffset>,
    /// IANA timezone identifier, passed through as given
    pub timezone: &'a str,
    /// Correction instruction; only set on the repair call
    pub repair_instruction: Option<&'a str>,
}

/// Turns a request into a candidate schedule.
#[async_trait]
pub trait PlanGenerator: Send + Sync {
    async fn generate(
        &self,
        request: GenerationRequest<'_>,
    ) -> Result<GeneratedPlan, GenerationError>;
}

/// Turns raw request text into structured metadata.
#[async_trait]
pub trait MetadataExtractor: Send + Sync {
    async fn extract(&self, context: &str) -> Result<Metadata, GenerationError>;
}
