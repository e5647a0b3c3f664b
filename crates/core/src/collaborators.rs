//! Interfaces of the services that feed the assembler.
//!
//! Turning a lecture transcript into a content plan, talking to a language
//! model and discovering a template's fields all happen outside this
//! workspace. These traits describe what the assembler expects from them.

use crate::error::Result;
use crate::types::ContentPlan;
use serde::{Deserialize, Serialize};

/// A chat message sent to a language model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// `system`, `user` or `assistant`.
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

/// A language model client.
pub trait LlmClient {
    /// Send a conversation and return the model's reply text.
    fn generate(&self, messages: &[ChatMessage]) -> Result<String>;
}

/// Produces a content plan from source material such as a transcript.
pub trait ContentPlanSource {
    fn content_plan(&self, transcript: &str) -> Result<ContentPlan>;
}

/// Describes which fields a template offers, as the JSON schema authors use.
pub trait FieldSchemaSource {
    fn field_schema(&self, template: &[u8]) -> Result<serde_json::Value>;
}

/// A plan source that returns a fixed plan; handy when the plan already exists on disk.
#[derive(Debug, Clone)]
pub struct StaticPlan(pub ContentPlan);

impl ContentPlanSource for StaticPlan {
    fn content_plan(&self, _transcript: &str) -> Result<ContentPlan> {
        Ok(self.0.clone())
    }
}
