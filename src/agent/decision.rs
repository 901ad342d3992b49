//! The structured relevance decision.
//!
//! Before acting on a human request the agent asks the model, through a
//! schema-constrained completion, whether the request is in scope. A reply
//! that does not match the schema is a contract violation and is returned
//! as [`AgentError::DecisionParse`], never guessed.

use futures::StreamExt;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::RELEVANCE_PROMPT;
use crate::error::AgentError;
use crate::provider::ModelGateway;
use crate::tools::input_schema;

/// The model's judgment on a request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AgentDecision {
    /// Whether the request should be acted on
    pub should_do: bool,
    /// Certainty of the judgment, between 0 and 1
    pub confidence: f64,
}

impl AgentDecision {
    /// JSON schema sent as the completion's `format`.
    pub fn schema() -> Value {
        input_schema::<Self>()
    }

    /// Parses and validates the complete completion text.
    pub fn parse(raw: &str) -> Result<Self, AgentError> {
        let decision: Self =
            serde_json::from_str(raw.trim()).map_err(|e| AgentError::DecisionParse {
                raw: raw.to_string(),
                reason: e.to_string(),
            })?;
        if !(0.0..=1.0).contains(&decision.confidence) {
            return Err(AgentError::DecisionParse {
                raw: raw.to_string(),
                reason: format!("confidence {} is not between 0 and 1", decision.confidence),
            });
        }
        Ok(decision)
    }

    pub fn is_relevant(&self, threshold: f64) -> bool {
        self.should_do && self.confidence > threshold
    }
}

/// Asks the model whether `request` falls under `instructions`.
pub async fn decide(
    gateway: &dyn ModelGateway,
    instructions: &str,
    request: &str,
) -> Result<AgentDecision, AgentError> {
    let prompt = RELEVANCE_PROMPT
        .replace("{instructions}", instructions)
        .replace("{request}", request);
    let schema = AgentDecision::schema();

    let mut stream = gateway.generate(&prompt, Some(&schema)).await?;
    let mut raw = String::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        raw.push_str(&chunk.response);
        if chunk.done {
            break;
        }
    }

    let decision = AgentDecision::parse(&raw)?;
    tracing::debug!(
        should_do = decision.should_do,
        confidence = decision.confidence,
        "relevance decision"
    );
    Ok(decision)
}
