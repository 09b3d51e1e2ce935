//! LLM-backed schedule generator.
//!
//! Prompts a chat model for a JSON schedule and parses the reply into a
//! [`GeneratedPlan`]. On a repair call the correction instruction is appended
//! to the user prompt.

use async_trait::async_trait;
use tracing::{debug, info};

use plancheck_kernel::{GeneratedPlan, GenerationError, GenerationRequest, PlanGenerator};

use crate::llm_client::{ChatClient, ChatMessage};

/// System prompt for schedule generation.
const PLANNER_SYSTEM_PROMPT: &str = "You are a planning assistant. Return ONLY valid JSON \
    with a top-level 'plan' array, plus 'assumptions' and 'questions' arrays of strings. \
    Each plan item must include: task, start_time, end_time, timebox_minutes, why. \
    Use ISO-8601 timestamps with a UTC offset. timebox_minutes must equal the minutes \
    between start_time and end_time. Tasks must not overlap and must not start before \
    the current time. Only mention people, places and projects named in the request.";

/// Generator backed by a chat completions endpoint.
#[derive(Debug, Clone)]
pub struct LlmPlanner {
    client: ChatClient,
}

impl LlmPlanner {
    pub fn new(client: ChatClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PlanGenerator for LlmPlanner {
    async fn generate(
        &self,
        request: GenerationRequest<'_>,
    ) -> Result<GeneratedPlan, GenerationError> {
        let prompt = build_user_prompt(&request);

        info!(
            model = %self.client.model(),
            repair = request.repair_instruction.is_some(),
            "Generate plan"
        );

        let messages = [
            ChatMessage::system(PLANNER_SYSTEM_PROMPT),
            ChatMessage::user(prompt),
        ];
        let content = self
            .client
            .complete_json(&messages)
            .await
            .map_err(|e| GenerationError::Transport(format!("{e:#}")))?;

        debug!(response = %content, "Planner response");
        parse_plan_response(&content)
    }
}

/// User prompt for one generation call.
pub fn build_user_prompt(request: &GenerationRequest<'_>) -> String {
    let metadata_json =
        serde_json::to_string(request.metadata).unwrap_or_else(|_| "{}".to_string());

    let mut prompt = format!(
        "Context:\n{context}\n\n\
         Extracted metadata:\n{metadata_json}\n\n\
         Current time: {now}\n\
         Timezone: {timezone}",
        context = request.context,
        now = request.current_time.to_rfc3339(),
        timezone = request.timezone,
    );

    if let Some(instruction) = request.repair_instruction {
        prompt.push_str("\n\nCorrection required:\n");
        prompt.push_str(instruction);
    }

    prompt
}

/// Parse a planner reply.
///
/// Accepts bare JSON or JSON inside a fenced code block. A reply without a
/// `plan` array, or with ill-typed items, is malformed.
pub fn parse_plan_response(response: &str) -> Result<GeneratedPlan, GenerationError> {
    let body = strip_code_fence(response);
    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| GenerationError::Malformed(format!("response is not JSON: {e}")))?;

    match value.get("plan") {
        Some(serde_json::Value::Array(_)) => {}
        Some(_) => {
            return Err(GenerationError::Malformed(
                "expected 'plan' to be a list".to_string(),
            ))
        }
        None => {
            return Err(GenerationError::Malformed(
                "response has no 'plan' field".to_string(),
            ))
        }
    }

    serde_json::from_value(value)
        .map_err(|e| GenerationError::Malformed(format!("invalid plan item: {e}")))
}

/// The payload of a ```json fenced block, or the trimmed input.
pub(crate) fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
