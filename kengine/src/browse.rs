//! Menu navigation: providers, models, styles and the entry commands.

use kcatalog::{MediaType, ModelDefinition};
use kledger::Cost;
use ksession::ConversationState;

use crate::engine::{Engine, Turn};
use crate::error::EngineError;
use crate::hooks::ResetReason;
use crate::types::{AssistMethod, AssistMode, ModelSummary, Outbound, Problem};

impl Engine {
    pub(crate) fn open_providers(
        &self,
        turn: Turn,
        media_type: MediaType,
    ) -> Result<Vec<Outbound>, EngineError> {
        self.staging.clear(turn.user())?;
        self.sessions.set(
            turn.user(),
            ConversationState::AwaitingProviderSelection { media_type },
        )?;

        let providers = self
            .catalog
            .providers_for(media_type)
            .into_iter()
            .cloned()
            .collect();
        Ok(turn.finish([Outbound::ProviderMenu {
            media_type,
            providers,
        }]))
    }

    pub(crate) fn open_chat_models(&self, turn: Turn) -> Result<Vec<Outbound>, EngineError> {
        self.staging.clear(turn.user())?;
        self.sessions.set(
            turn.user(),
            ConversationState::AwaitingModelSelection {
                media_type: MediaType::Text,
            },
        )?;

        let models = summaries(self.catalog.models_of_type(MediaType::Text));
        Ok(turn.finish([Outbound::ModelMenu {
            media_type: MediaType::Text,
            models,
        }]))
    }

    pub(crate) fn open_assist(&self, turn: Turn) -> Result<Vec<Outbound>, EngineError> {
        self.staging.clear(turn.user())?;
        self.sessions.clear(turn.user())?;
        Ok(turn.finish([Outbound::AssistModeMenu {
            cost: Cost::credits(self.policy.prompt_assist_cost),
        }]))
    }

    pub(crate) fn open_exchange(&self, turn: Turn) -> Result<Vec<Outbound>, EngineError> {
        self.staging.clear(turn.user())?;
        self.sessions
            .set(turn.user(), ConversationState::AwaitingExchangeAmount)?;
        let rate = self.ledger().policy().diamond_exchange_rate;
        let available = turn.account.total_credits();
        Ok(turn.finish([Outbound::ExchangePrompt { rate, available }]))
    }

    /// Single-image utility flow started directly by command.
    pub(crate) fn open_transform(
        &self,
        turn: Turn,
        model_id: &str,
    ) -> Result<Vec<Outbound>, EngineError> {
        let Some(model) = self
            .catalog
            .model(model_id)
            .filter(|model| model.accepts_image_input && !model.is_video())
        else {
            return Ok(turn.finish([Problem::UnknownSelection.into()]));
        };

        if let Some(problem) = self.unaffordable(&turn, model) {
            return Ok(turn.finish([problem.into()]));
        }

        self.staging.clear(turn.user())?;
        self.sessions.set(
            turn.user(),
            ConversationState::AwaitingSimplePromptOrImage {
                model_id: model.id.clone(),
                style_id: None,
            },
        )?;
        Ok(turn.finish([Outbound::AwaitingPrompt {
            model_id: model.id.clone(),
            style_id: None,
            accepts_image: true,
        }]))
    }

    pub(crate) fn select_provider(
        &self,
        turn: Turn,
        provider_id: &str,
    ) -> Result<Vec<Outbound>, EngineError> {
        let ConversationState::AwaitingProviderSelection { media_type } = turn.state else {
            return Ok(turn.finish([Problem::UnknownSelection.into()]));
        };

        let models = self.catalog.models_for_provider(provider_id, media_type);
        if self.catalog.provider(provider_id).is_none() || models.is_empty() {
            return Ok(turn.finish([Problem::UnknownSelection.into()]));
        }

        let models = summaries(models);
        self.sessions.set(
            turn.user(),
            ConversationState::AwaitingModelSelection { media_type },
        )?;
        Ok(turn.finish([Outbound::ModelMenu { media_type, models }]))
    }

    pub(crate) async fn select_model(
        &self,
        turn: Turn,
        model_id: &str,
    ) -> Result<Vec<Outbound>, EngineError> {
        let ConversationState::AwaitingModelSelection { media_type } = turn.state else {
            return Ok(turn.finish([Problem::UnknownSelection.into()]));
        };
        let Some(model) = self
            .catalog
            .model(model_id)
            .filter(|model| model.media_type == media_type)
        else {
            return Ok(turn.finish([Problem::UnknownSelection.into()]));
        };

        if let Some(problem) = self.unaffordable(&turn, model) {
            return Ok(turn.finish([problem.into()]));
        }

        let user = turn.user();
        let model_id = model.id.clone();

        match model.media_type {
            MediaType::Text => {
                self.transcripts.clear(user).await?;
                self.sessions
                    .set(user, ConversationState::ChatMode { model_id: model_id.clone() })?;
                Ok(turn.finish([Outbound::ChatStarted { model_id }]))
            }
            MediaType::Video => {
                self.sessions.set(
                    user,
                    ConversationState::AwaitingSimplePromptOrImage {
                        model_id: model_id.clone(),
                        style_id: None,
                    },
                )?;
                Ok(turn.finish([Outbound::AwaitingPrompt {
                    model_id,
                    style_id: None,
                    accepts_image: model.accepts_image_input,
                }]))
            }
            MediaType::Image if model.style_selection => {
                self.sessions.set(
                    user,
                    ConversationState::AwaitingStyleSelection {
                        model_id: model_id.clone(),
                    },
                )?;
                let styles = self.catalog.styles().cloned().collect();
                Ok(turn.finish([Outbound::StyleMenu { model_id, styles }]))
            }
            MediaType::Image => {
                self.staging.stage(user, self.fresh_pending(model, None))?;
                self.sessions.set(
                    user,
                    ConversationState::AwaitingPromptAndSettings { model_id },
                )?;
                let dashboard = self.dashboard(model, &turn.account)?;
                Ok(turn.finish([Outbound::Dashboard(dashboard)]))
            }
        }
    }

    pub(crate) fn select_style(
        &self,
        turn: Turn,
        style_id: &str,
    ) -> Result<Vec<Outbound>, EngineError> {
        let ConversationState::AwaitingStyleSelection { model_id } = turn.state.clone() else {
            return Ok(turn.finish([Problem::UnknownSelection.into()]));
        };
        let model = match self.state_model(&model_id) {
            Ok(model) => model,
            Err(problem) => return Ok(turn.finish([problem.into()])),
        };
        if !self.catalog.has_style(style_id) {
            return Ok(turn.finish([Problem::UnknownSelection.into()]));
        }

        let user = turn.user();
        if model.accepts_multiple_images {
            let pending = self.fresh_pending(model, Some(style_id));
            let limit = pending.image_limit;
            self.staging.stage(user, pending)?;
            self.sessions.set(
                user,
                ConversationState::AwaitingMultiImageUpload {
                    model_id: model.id.clone(),
                    style_id: style_id.to_string(),
                },
            )?;
            return Ok(turn.finish([Outbound::AwaitingImages {
                model_id: model.id.clone(),
                staged: 0,
                limit,
            }]));
        }

        self.sessions.set(
            user,
            ConversationState::AwaitingSimplePromptOrImage {
                model_id: model.id.clone(),
                style_id: Some(style_id.to_string()),
            },
        )?;
        Ok(turn.finish([Outbound::AwaitingPrompt {
            model_id: model.id.clone(),
            style_id: Some(style_id.to_string()),
            accepts_image: model.accepts_image_input,
        }]))
    }

    pub(crate) fn select_assist_mode(
        &self,
        turn: Turn,
        mode: AssistMode,
    ) -> Result<Vec<Outbound>, EngineError> {
        let next = match mode {
            AssistMode::Idea => ConversationState::AwaitingPromptIdeaText,
            AssistMode::Image => ConversationState::AwaitingPromptSourceImage,
        };
        self.sessions.set(turn.user(), next)?;
        Ok(turn.finish([Outbound::AssistAwaitingInput { mode }]))
    }

    pub(crate) fn receive_idea(&self, turn: Turn, text: &str) -> Result<Vec<Outbound>, EngineError> {
        let idea = text.trim();
        if idea.is_empty() {
            return Ok(turn.finish([Problem::ExpectedText.into()]));
        }

        self.sessions.set(
            turn.user(),
            ConversationState::AwaitingPromptMethod {
                idea: idea.to_string(),
            },
        )?;
        Ok(turn.finish([Outbound::AssistMethodMenu {
            idea: idea.to_string(),
            methods: AssistMethod::ALL.to_vec(),
        }]))
    }

    pub(crate) async fn stop_chat(&self, turn: Turn) -> Result<Vec<Outbound>, EngineError> {
        if !matches!(turn.state, ConversationState::ChatMode { .. }) {
            return Ok(turn.finish([Problem::UnknownSelection.into()]));
        }
        self.reset(turn.user(), ResetReason::Cancelled).await?;
        Ok(turn.finish([Outbound::ChatEnded]))
    }

    /// Whether one unit of `model` is out of reach for the user right now.
    fn unaffordable(&self, turn: &Turn, model: &ModelDefinition) -> Option<Problem> {
        let cost = model.unit_cost();
        if self.ledger().can_cover(&turn.account, cost) {
            return None;
        }
        Some(Problem::InsufficientFunds {
            required: cost,
            available: turn.account.balance(cost.currency),
        })
    }
}

fn summaries(models: Vec<&ModelDefinition>) -> Vec<ModelSummary> {
    models.into_iter().map(ModelSummary::from).collect()
}
