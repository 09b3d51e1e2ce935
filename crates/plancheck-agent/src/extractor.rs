//! LLM-backed metadata extractor.

use async_trait::async_trait;
use tracing::{debug, info};

use plancheck_kernel::config::GroundingConfig;
use plancheck_kernel::{GenerationError, Metadata, MetadataExtractor};

use crate::llm_client::{ChatClient, ChatMessage};
use crate::planner::strip_code_fence;

const EXTRACTOR_SYSTEM_PROMPT: &str = "You are a strict JSON extractor. Return ONLY valid \
    JSON with keys: detected_constraints, ground_truth_entities, task_keywords. All values \
    must be arrays of strings. No extra keys, no commentary.";

/// Extractor backed by a chat completions endpoint.
///
/// Output is normalized before it is returned, so the engine never sees
/// duplicates or bare generic nouns.
#[derive(Debug, Clone)]
pub struct LlmExtractor {
    client: ChatClient,
    grounding: GroundingConfig,
}

impl LlmExtractor {
    pub fn new(client: ChatClient, grounding: GroundingConfig) -> Self {
        Self { client, grounding }
    }
}

#[async_trait]
impl MetadataExtractor for LlmExtractor {
    async fn extract(&self, context: &str) -> Result<Metadata, GenerationError> {
        info!(model = %self.client.model(), "Extract metadata");

        let messages = [
            ChatMessage::system(EXTRACTOR_SYSTEM_PROMPT),
            ChatMessage::user(format!("Context:\n{context}")),
        ];
        let content = self
            .client
            .complete_json(&messages)
            .await
            .map_err(|e| GenerationError::Transport(format!("{e:#}")))?;

        debug!(response = %content, "Extractor response");
        parse_metadata_response(&content, &self.grounding)
    }
}

/// Parse and normalize an extractor reply.
pub fn parse_metadata_response(
    response: &str,
    grounding: &GroundingConfig,
) -> Result<Metadata, GenerationError> {
    let raw: Metadata = serde_json::from_str(strip_code_fence(response))
        .map_err(|e| GenerationError::Malformed(format!("invalid metadata: {e}")))?;
    Ok(raw.normalized(grounding))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_normalize() {
        let response = r#"{
            "detected_constraints": ["Leave by 5 PM", "Leave by 5 PM"],
            "ground_truth_entities": ["Apollo project", "project"],
            "task_keywords": ["report", " gym "]
        }"#;
        let metadata = parse_metadata_response(response, &GroundingConfig::default()).unwrap();

        assert_eq!(metadata.detected_constraints, vec!["Leave by 5 PM"]);
        assert_eq!(metadata.ground_truth_entities, vec!["Apollo project", "Apollo"]);
        assert_eq!(metadata.task_keywords, vec!["report", "gym"]);
    }

    #[test]
    fn test_missing_keys_default_empty() {
        let metadata = parse_metadata_response("{}", &GroundingConfig::default()).unwrap();
        assert_eq!(metadata, Metadata::default());
    }

    #[test]
    fn test_ill_typed_lists_rejected() {
        let response = r#"{"task_keywords": "gym"}"#;
        assert!(matches!(
            parse_metadata_response(response, &GroundingConfig::default()),
            Err(GenerationError::Malformed(_))
        ));
    }
}
