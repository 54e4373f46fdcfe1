//! Engine-level limits, timeouts and prompt texts.

use std::collections::BTreeSet;
use std::time::Duration;

use kcommon::UserId;

use crate::error::EngineError;

pub const ASPECT_RATIOS: [&str; 9] = [
    "1:1", "16:9", "9:16", "4:3", "3:4", "3:2", "2:3", "5:4", "4:5",
];

/// Interface languages a user can switch to.
pub const LANGUAGE_CODES: [&str; 7] = ["en", "id", "ru", "es", "de", "hi", "zh"];

pub(crate) const CHAT_SYSTEM_INSTRUCTION: &str = "You are a helpful, smart, and friendly AI \
assistant inside a chat bot. Use emoji. Keep answers concise but informative. Format output in \
Markdown.";

pub(crate) const VISION_DEFAULT_PROMPT: &str = "Describe this image.";

pub(crate) const PROMPT_ENGINEER_INSTRUCTION: &str = "You are an expert AI Prompt Engineer. \
Convert the user idea into TWO professional prompts. Enclose each prompt in a Markdown code \
block (```).";

pub(crate) const PROMPT_VARIANTS_LAYOUT: &str =
    "Output:\n**Var 1:**\n```...```\n\n**Var 2:**\n```...```";

pub(crate) const REVERSE_PROMPT_INSTRUCTION: &str = "Describe this image as a highly detailed \
text-to-image prompt (English). Focus on subject, artistic style, lighting, camera angle, and \
colors. Output ONLY the prompt inside a Markdown code block (```). Do not add conversational \
text.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnginePolicy {
    /// Upper bound on staged images regardless of what a model declares.
    pub staging_cap: usize,
    pub max_num_outputs: u32,
    pub generation_timeout: Duration,
    pub completion_timeout: Duration,
    pub chat_history_cap: usize,
    pub prompt_assist_cost: u32,
    pub assist_model: String,
    pub admin_ids: BTreeSet<UserId>,
}

impl Default for EnginePolicy {
    fn default() -> Self {
        Self {
            staging_cap: 4,
            max_num_outputs: 4,
            generation_timeout: Duration::from_secs(300),
            completion_timeout: Duration::from_secs(120),
            chat_history_cap: 12,
            prompt_assist_cost: 2,
            assist_model: "google/gemini-2.5-flash".to_string(),
            admin_ids: BTreeSet::new(),
        }
    }
}

impl EnginePolicy {
    pub fn with_staging_cap(mut self, staging_cap: usize) -> Self {
        self.staging_cap = staging_cap;
        self
    }

    pub fn with_generation_timeout(mut self, timeout: Duration) -> Self {
        self.generation_timeout = timeout;
        self
    }

    pub fn with_completion_timeout(mut self, timeout: Duration) -> Self {
        self.completion_timeout = timeout;
        self
    }

    pub fn with_chat_history_cap(mut self, cap: usize) -> Self {
        self.chat_history_cap = cap;
        self
    }

    pub fn with_prompt_assist_cost(mut self, cost: u32) -> Self {
        self.prompt_assist_cost = cost;
        self
    }

    pub fn with_assist_model(mut self, model_ref: impl Into<String>) -> Self {
        self.assist_model = model_ref.into();
        self
    }

    pub fn with_admin_ids(mut self, admin_ids: impl IntoIterator<Item = UserId>) -> Self {
        self.admin_ids = admin_ids.into_iter().collect();
        self
    }

    pub fn is_admin(&self, user: UserId) -> bool {
        self.admin_ids.contains(&user)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.staging_cap == 0 {
            return Err(EngineError::invalid_configuration(
                "staging_cap must be greater than zero",
            ));
        }

        if self.max_num_outputs == 0 {
            return Err(EngineError::invalid_configuration(
                "max_num_outputs must be greater than zero",
            ));
        }

        if self.generation_timeout.is_zero() || self.completion_timeout.is_zero() {
            return Err(EngineError::invalid_configuration(
                "dispatch timeouts must be greater than zero",
            ));
        }

        if self.assist_model.trim().is_empty() {
            return Err(EngineError::invalid_configuration(
                "assist_model must not be empty",
            ));
        }

        Ok(())
    }
}
