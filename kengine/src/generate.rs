//! Media submission: assembly, preflight, state claim and dispatch.

use kcatalog::{AssemblyInput, assemble_request};
use ksession::ConversationState;

use crate::dispatch::{DispatchOutcome, Submission};
use crate::engine::{Engine, Turn};
use crate::error::EngineError;
use crate::types::{ImageUpload, Outbound, Problem};

impl Engine {
    /// Submits one generation for the model bound to the current state.
    ///
    /// The state is claimed (moved to `Idle`) only after preflight passes, so a
    /// user without funds keeps their flow. Losing the claim to a concurrent
    /// cancel drops the submission without a provider call.
    pub(crate) async fn submit_generation(
        &self,
        turn: Turn,
        model_id: &str,
        prompt: &str,
        images: Vec<String>,
        style_id: Option<&str>,
    ) -> Result<Vec<Outbound>, EngineError> {
        let model = match self.state_model(model_id) {
            Ok(model) => model,
            Err(problem) => return Ok(turn.finish([problem.into()])),
        };
        let style = match style_id {
            Some(style_id) => match self.catalog.style(style_id) {
                Some(style) => Some(style),
                None => return Ok(turn.finish([Problem::SessionExpired.into()])),
            },
            None => None,
        };

        let input = AssemblyInput::new(prompt).with_images(images).with_style(style);
        let assembled = match assemble_request(model, &turn.account, input) {
            Ok(assembled) => assembled,
            Err(err) => {
                return Ok(turn.finish([Problem::InvalidParameterInput {
                    param_name: err.parameter,
                    message: err.message,
                }
                .into()]));
            }
        };
        if assembled.request.validate().is_err() {
            return Ok(turn.finish([Problem::ExpectedText.into()]));
        }

        let user = turn.user();
        self.hooks
            .on_request_assembled(user, &model.id, assembled.cost);
        if let Err(problem) = self
            .dispatcher
            .preflight(&turn.account, &model.id, assembled.cost)
        {
            return Ok(turn.finish([problem.into()]));
        }

        let expected = turn.state.clone();
        let claimed =
            self.sessions
                .transition_if(user, |state| *state == expected, ConversationState::Idle)?;
        if !claimed {
            return Ok(turn.out);
        }
        self.staging.clear(user)?;

        let submission = Submission {
            user,
            model_id: model.id.clone(),
            provider_ref: model.provider_ref.clone(),
            request: assembled.request,
            cost: assembled.cost,
        };
        let outcome = self
            .dispatcher
            .dispatch_generation(&turn.account, submission)
            .await?;

        let outbound = match outcome {
            DispatchOutcome::Settled(settlement) => {
                let mut outbound = vec![Outbound::Media {
                    model_id: model.id.clone(),
                    media_type: model.media_type,
                    urls: settlement.output,
                    cost: assembled.cost,
                }];
                if let Some(bonus) = settlement.referral {
                    outbound.push(Outbound::ReferralBonusEarned {
                        referrer: bonus.referrer,
                        bonus: bonus.amount,
                    });
                }
                outbound
            }
            DispatchOutcome::Withheld {
                required,
                available,
            } => vec![
                Problem::InsufficientFunds {
                    required,
                    available,
                }
                .into(),
            ],
            DispatchOutcome::Failed(error) => vec![
                Problem::GenerationFailed {
                    message: error.message,
                }
                .into(),
            ],
        };
        Ok(turn.finish(outbound))
    }

    /// Photo sent while a single-shot flow waits for a prompt. Models that take
    /// image input get the photo; the rest only see its caption.
    pub(crate) async fn submit_simple_image(
        &self,
        turn: Turn,
        model_id: &str,
        style_id: Option<&str>,
        upload: ImageUpload,
    ) -> Result<Vec<Outbound>, EngineError> {
        let model = match self.state_model(model_id) {
            Ok(model) => model,
            Err(problem) => return Ok(turn.finish([problem.into()])),
        };

        let caption = upload.prompt().unwrap_or_default().to_string();
        if model.accepts_image_input {
            return self
                .submit_generation(turn, model_id, &caption, vec![upload.url], style_id)
                .await;
        }

        if caption.is_empty() {
            return Ok(turn.finish([Problem::ExpectedText.into()]));
        }
        self.submit_generation(turn, model_id, &caption, Vec::new(), style_id)
            .await
    }
}
