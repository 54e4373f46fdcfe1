//! Multi-turn chat and single-image vision questions.

use kledger::Cost;
use kprovider::CompletionRequest;
use ksession::{ChatEntry, ChatRole, ConversationState, format_history};

use crate::dispatch::{CompletionJob, DispatchOutcome};
use crate::engine::{Engine, Turn};
use crate::error::EngineError;
use crate::policy::{CHAT_SYSTEM_INSTRUCTION, VISION_DEFAULT_PROMPT};
use crate::types::{ImageUpload, Outbound, Problem};

const CHAT_TEMPERATURE: f32 = 0.7;
const CHAT_MAX_OUTPUT_TOKENS: u32 = 1024;

impl Engine {
    pub(crate) async fn chat_turn(
        &self,
        turn: Turn,
        model_id: &str,
        text: &str,
    ) -> Result<Vec<Outbound>, EngineError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(turn.finish([Problem::ExpectedText.into()]));
        }
        let model = match self.state_model(model_id) {
            Ok(model) => model,
            Err(problem) => return Ok(turn.finish([problem.into()])),
        };

        let cost = Cost::credits(model.cost);
        if let Err(problem) = self.dispatcher.preflight(&turn.account, &model.id, cost) {
            return Ok(turn.finish([problem.into()]));
        }

        let user = turn.user();
        let history = self.transcripts.load_entries(user).await?;
        let mut prompt = format_history(&history);
        if !prompt.is_empty() {
            prompt.push('\n');
        }
        prompt.push_str(&format!("{}: {text}", ChatRole::User));

        let request = CompletionRequest::new(model.provider_ref.clone(), prompt)
            .with_system_instruction(CHAT_SYSTEM_INSTRUCTION)
            .with_temperature(CHAT_TEMPERATURE)
            .with_max_output_tokens(CHAT_MAX_OUTPUT_TOKENS);
        let job = CompletionJob {
            user,
            label: model.id.clone(),
            request,
            cost,
        };

        match self.dispatcher.dispatch_completion(&turn.account, job).await? {
            DispatchOutcome::Settled(settlement) => {
                let still_chatting = matches!(
                    self.sessions.get(user)?,
                    ConversationState::ChatMode { model_id } if model_id == model.id
                );
                if still_chatting {
                    self.transcripts
                        .append_entries(
                            user,
                            vec![
                                ChatEntry::user(text),
                                ChatEntry::model(settlement.output.clone()),
                            ],
                        )
                        .await?;
                }
                Ok(turn.finish([Outbound::ChatReply {
                    text: settlement.output,
                }]))
            }
            outcome => Ok(turn.finish([unsettled(outcome)])),
        }
    }

    /// Answers a question about one photo. Vision turns stay out of the chat
    /// history.
    pub(crate) async fn chat_vision(
        &self,
        turn: Turn,
        model_id: &str,
        upload: ImageUpload,
    ) -> Result<Vec<Outbound>, EngineError> {
        let model = match self.state_model(model_id) {
            Ok(model) => model,
            Err(problem) => return Ok(turn.finish([problem.into()])),
        };

        let cost = Cost::credits(model.cost);
        if let Err(problem) = self.dispatcher.preflight(&turn.account, &model.id, cost) {
            return Ok(turn.finish([problem.into()]));
        }

        let prompt = upload.prompt().unwrap_or(VISION_DEFAULT_PROMPT).to_string();
        let request = CompletionRequest::new(model.provider_ref.clone(), prompt)
            .with_system_instruction(CHAT_SYSTEM_INSTRUCTION)
            .with_image(upload.url)
            .with_temperature(CHAT_TEMPERATURE)
            .with_max_output_tokens(CHAT_MAX_OUTPUT_TOKENS);
        let job = CompletionJob {
            user: turn.user(),
            label: model.id.clone(),
            request,
            cost,
        };

        match self.dispatcher.dispatch_completion(&turn.account, job).await? {
            DispatchOutcome::Settled(settlement) => Ok(turn.finish([Outbound::ChatReply {
                text: settlement.output,
            }])),
            outcome => Ok(turn.finish([unsettled(outcome)])),
        }
    }
}

/// Problem shown for a completion that produced nothing billable.
pub(crate) fn unsettled(outcome: DispatchOutcome<String>) -> Outbound {
    match outcome {
        DispatchOutcome::Withheld {
            required,
            available,
        } => Problem::InsufficientFunds {
            required,
            available,
        }
        .into(),
        DispatchOutcome::Failed(error) => Problem::GenerationFailed {
            message: error.message,
        }
        .into(),
        DispatchOutcome::Settled(_) => Problem::UnknownSelection.into(),
    }
}
