//! Error types for the agent core.
//!
//! Only failures that end a control turn live here. Tool failures never
//! reach this type: the dispatcher records them in the ledger instead.

use thiserror::Error;

use crate::provider::GatewayError;

#[derive(Debug, Error)]
pub enum AgentError {
    /// The model backend could not be reached or returned garbage.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// The structured relevance decision did not match its schema.
    #[error("model returned an invalid decision ({reason}): {raw}")]
    DecisionParse { raw: String, reason: String },
}
