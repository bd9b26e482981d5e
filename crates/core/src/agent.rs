//! Realtime Agent Description
//!
//! The agent is the persona handed to a realtime session: a display name and
//! the instruction text the model follows for the whole conversation.

use serde::{Deserialize, Serialize};

/// Instruction text used when no override is configured.
pub const DEFAULT_INSTRUCTIONS: &str =
    "Eres un asistente útil. Responde en español, claro y directo.";

/// Name given to the default agent.
pub const DEFAULT_AGENT_NAME: &str = "Assistant";

/// Describes the agent a realtime session speaks as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RealtimeAgent {
    /// Display name of the agent.
    pub name: String,
    /// System instructions sent to the model when the session is configured.
    pub instructions: String,
}

impl RealtimeAgent {
    /// Creates an agent with the given name and instructions.
    pub fn new(name: impl Into<String>, instructions: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instructions: instructions.into(),
        }
    }
}

impl Default for RealtimeAgent {
    fn default() -> Self {
        Self::new(DEFAULT_AGENT_NAME, DEFAULT_INSTRUCTIONS)
    }
}
