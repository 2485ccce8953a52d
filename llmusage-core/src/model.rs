use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque identifier the host framework assigns to one LLM invocation.
/// Used only as a map key; carries no meaning beyond uniqueness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for RunId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Token counts as reported by the provider.
/// A missing count means "unknown", never zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    #[serde(default)]
    pub prompt_tokens: Option<u32>,
    #[serde(default)]
    pub completion_tokens: Option<u32>,
    #[serde(default)]
    pub total_tokens: Option<u32>,
}

/// Provider-specific output metadata attached to a finished call.
/// Each field decodes independently; one missing key never aborts the rest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LlmOutput {
    #[serde(default)]
    pub token_usage: Option<TokenUsage>,
    #[serde(default)]
    pub model_name: Option<String>,
}

/// Final result the framework hands to `on_llm_end`.
/// `llm_output` is absent for providers that report nothing beyond text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LlmResult {
    #[serde(default)]
    pub llm_output: Option<LlmOutput>,
}

impl LlmResult {
    /// Token usage, if the provider reported any.
    pub fn token_usage(&self) -> Option<&TokenUsage> {
        self.llm_output.as_ref()?.token_usage.as_ref()
    }

    /// Raw (un-normalized) model name, if reported.
    pub fn model_name(&self) -> Option<&str> {
        self.llm_output.as_ref()?.model_name.as_deref()
    }
}
