//! Prompt assistant: idea-to-prompt rewriting and image reverse prompting.

use kledger::Cost;
use kprovider::CompletionRequest;
use ksession::ConversationState;

use crate::chat::unsettled;
use crate::dispatch::{CompletionJob, DispatchOutcome};
use crate::engine::{Engine, Turn};
use crate::error::EngineError;
use crate::policy::{PROMPT_ENGINEER_INSTRUCTION, PROMPT_VARIANTS_LAYOUT, REVERSE_PROMPT_INSTRUCTION};
use crate::types::{AssistMethod, ImageUpload, Outbound, Problem};

const ASSIST_TEMPERATURE: f32 = 0.8;
const ASSIST_MAX_OUTPUT_TOKENS: u32 = 2048;
const ASSIST_LABEL: &str = "prompt_assist";

impl Engine {
    pub(crate) async fn run_assist_idea(
        &self,
        turn: Turn,
        method: AssistMethod,
    ) -> Result<Vec<Outbound>, EngineError> {
        let ConversationState::AwaitingPromptMethod { idea } = turn.state.clone() else {
            return Ok(turn.finish([Problem::UnknownSelection.into()]));
        };

        let cost = self.assist_cost();
        if let Err(problem) = self.dispatcher.preflight(&turn.account, ASSIST_LABEL, cost) {
            return Ok(turn.finish([problem.into()]));
        }
        if !self.claim(&turn)? {
            return Ok(turn.out);
        }

        let instruction = format!(
            "{PROMPT_ENGINEER_INSTRUCTION}\n{}\n{PROMPT_VARIANTS_LAYOUT}",
            method.instruction()
        );
        let request = CompletionRequest::new(self.policy.assist_model.clone(), idea)
            .with_system_instruction(instruction)
            .with_temperature(ASSIST_TEMPERATURE)
            .with_max_output_tokens(ASSIST_MAX_OUTPUT_TOKENS);

        self.run_assist(turn, Some(method), request, cost).await
    }

    pub(crate) async fn run_assist_image(
        &self,
        turn: Turn,
        upload: ImageUpload,
    ) -> Result<Vec<Outbound>, EngineError> {
        let cost = self.assist_cost();
        if let Err(problem) = self.dispatcher.preflight(&turn.account, ASSIST_LABEL, cost) {
            return Ok(turn.finish([problem.into()]));
        }
        if !self.claim(&turn)? {
            return Ok(turn.out);
        }

        let request =
            CompletionRequest::new(self.policy.assist_model.clone(), REVERSE_PROMPT_INSTRUCTION)
                .with_image(upload.url)
                .with_temperature(ASSIST_TEMPERATURE)
                .with_max_output_tokens(ASSIST_MAX_OUTPUT_TOKENS);

        self.run_assist(turn, None, request, cost).await
    }

    async fn run_assist(
        &self,
        turn: Turn,
        method: Option<AssistMethod>,
        request: CompletionRequest,
        cost: Cost,
    ) -> Result<Vec<Outbound>, EngineError> {
        let job = CompletionJob {
            user: turn.user(),
            label: ASSIST_LABEL.to_string(),
            request,
            cost,
        };

        match self.dispatcher.dispatch_completion(&turn.account, job).await? {
            DispatchOutcome::Settled(settlement) => Ok(turn.finish([Outbound::AssistedPrompt {
                method,
                text: settlement.output,
                cost,
            }])),
            outcome => Ok(turn.finish([unsettled(outcome)])),
        }
    }

    fn assist_cost(&self) -> Cost {
        Cost::credits(self.policy.prompt_assist_cost)
    }

    /// Moves the user back to `Idle` before the provider call, unless a
    /// concurrent event already moved them.
    fn claim(&self, turn: &Turn) -> Result<bool, EngineError> {
        let expected = turn.state.clone();
        Ok(self.sessions.transition_if(
            turn.user(),
            |state| *state == expected,
            ConversationState::Idle,
        )?)
    }
}
