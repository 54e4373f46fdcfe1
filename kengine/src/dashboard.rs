//! Settings dashboard: aspect ratio, output count, model parameters and image staging.

use kcatalog::{ModelDefinition, Parameter, generation_cost, resolve_aspect_ratio, resolve_num_outputs};
use kledger::UserAccount;
use ksession::ConversationState;
use serde_json::Value;

use crate::engine::{Engine, Turn};
use crate::error::EngineError;
use crate::policy::ASPECT_RATIOS;
use crate::types::{DashboardView, ImageUpload, ModelSummary, Outbound, ParameterView, Problem};

impl Engine {
    pub(crate) fn dashboard(
        &self,
        model: &ModelDefinition,
        account: &UserAccount,
    ) -> Result<DashboardView, EngineError> {
        let num_outputs = resolve_num_outputs(model, account);
        let staged_images = self.staged_images(account.id, &model.id)?.len();

        Ok(DashboardView {
            model: ModelSummary::from(model),
            cost: generation_cost(model, num_outputs),
            aspect_ratio: resolve_aspect_ratio(model, account),
            num_outputs,
            configurable_aspect_ratio: model.configurable_aspect_ratio && !model.is_video(),
            configurable_num_outputs: model.configurable_num_outputs && !model.single_output,
            accepts_image_input: model.accepts_image_input,
            staged_images,
            image_limit: model.image_limit().min(self.policy.staging_cap),
            parameters: model
                .editable_parameters()
                .map(|parameter| ParameterView {
                    name: parameter.name.clone(),
                    label: parameter.label.clone(),
                    value: current_value(parameter, account),
                    has_options: parameter.has_options(),
                })
                .collect(),
            templates_available: self.catalog.has_templates(),
        })
    }

    pub(crate) fn open_templates(&self, turn: Turn) -> Result<Vec<Outbound>, EngineError> {
        let model = match self.dashboard_model(&turn) {
            Some(model) if self.catalog.has_templates() => model,
            _ => return Ok(turn.finish([Problem::UnknownSelection.into()])),
        };
        let templates = self.catalog.templates().cloned().collect();
        Ok(turn.finish([Outbound::TemplateMenu {
            model_id: model.id.clone(),
            templates,
        }]))
    }

    /// Submits a catalog template as the prompt, with any staged images.
    pub(crate) async fn submit_template(
        &self,
        turn: Turn,
        template_id: &str,
    ) -> Result<Vec<Outbound>, EngineError> {
        let Some(model_id) = self.dashboard_model(&turn).map(|model| model.id.clone()) else {
            return Ok(turn.finish([Problem::UnknownSelection.into()]));
        };
        let Some(template) = self.catalog.template(template_id) else {
            return Ok(turn.finish([Problem::UnknownSelection.into()]));
        };

        let images = self.staged_images(turn.user(), &model_id)?;
        self.submit_generation(turn, &model_id, &template.prompt, images, None)
            .await
    }

    pub(crate) async fn select_aspect_ratio(
        &self,
        turn: Turn,
        ratio: &str,
    ) -> Result<Vec<Outbound>, EngineError> {
        let model = match self.dashboard_model(&turn) {
            Some(model) if model.configurable_aspect_ratio && !model.is_video() => model,
            _ => return Ok(turn.finish([Problem::UnknownSelection.into()])),
        };

        let ratio = ratio.trim();
        if !ASPECT_RATIOS.contains(&ratio) {
            return Ok(turn.finish([Problem::InvalidParameterInput {
                param_name: kprovider::ASPECT_RATIO_KEY.to_string(),
                message: format!("'{ratio}' is not a supported aspect ratio"),
            }
            .into()]));
        }

        let account = self
            .accounts
            .update(turn.user(), Some(&turn.account), |_, account| {
                account.aspect_ratio = ratio.to_string();
            })
            .await?;
        let dashboard = self.dashboard(model, &account)?;
        Ok(turn.finish([Outbound::Dashboard(dashboard)]))
    }

    pub(crate) async fn select_num_outputs(
        &self,
        turn: Turn,
        count: u32,
    ) -> Result<Vec<Outbound>, EngineError> {
        let model = match self.dashboard_model(&turn) {
            Some(model) if model.configurable_num_outputs && !model.single_output => model,
            _ => return Ok(turn.finish([Problem::UnknownSelection.into()])),
        };

        if count == 0 || count > self.policy.max_num_outputs {
            return Ok(turn.finish([Problem::InvalidParameterInput {
                param_name: kprovider::NUM_OUTPUTS_KEY.to_string(),
                message: format!(
                    "{count} is outside 1..={}",
                    self.policy.max_num_outputs
                ),
            }
            .into()]));
        }

        let account = self
            .accounts
            .update(turn.user(), Some(&turn.account), |_, account| {
                account.num_outputs = count;
            })
            .await?;
        let dashboard = self.dashboard(model, &account)?;
        Ok(turn.finish([Outbound::Dashboard(dashboard)]))
    }

    pub(crate) fn open_parameter(
        &self,
        turn: Turn,
        name: &str,
    ) -> Result<Vec<Outbound>, EngineError> {
        let Some(model) = self.dashboard_model(&turn) else {
            return Ok(turn.finish([Problem::UnknownSelection.into()]));
        };
        let Some(parameter) = model.editable_parameters().find(|parameter| parameter.name == name)
        else {
            return Ok(turn.finish([Problem::UnknownSelection.into()]));
        };

        let current = current_value(parameter, &turn.account);
        if parameter.has_options() {
            return Ok(turn.finish([Outbound::ParameterOptions {
                model_id: model.id.clone(),
                parameter: parameter.clone(),
                current,
            }]));
        }

        self.sessions.set(
            turn.user(),
            ConversationState::EditingParameter {
                model_id: model.id.clone(),
                param_name: parameter.name.clone(),
            },
        )?;
        Ok(turn.finish([Outbound::ParameterPrompt {
            model_id: model.id.clone(),
            parameter: parameter.clone(),
            current,
        }]))
    }

    /// Coerces and stores one parameter value. Rejected input keeps the state so
    /// the user can try again.
    pub(crate) async fn save_parameter(
        &self,
        turn: Turn,
        name: &str,
        raw: &str,
    ) -> Result<Vec<Outbound>, EngineError> {
        let model_id = match &turn.state {
            ConversationState::AwaitingPromptAndSettings { model_id } => model_id.clone(),
            ConversationState::EditingParameter {
                model_id,
                param_name,
            } if param_name == name => model_id.clone(),
            _ => return Ok(turn.finish([Problem::UnknownSelection.into()])),
        };
        let model = match self.state_model(&model_id) {
            Ok(model) => model,
            Err(problem) => return Ok(turn.finish([problem.into()])),
        };
        let Some(parameter) = model.editable_parameters().find(|parameter| parameter.name == name)
        else {
            return Ok(turn.finish([Problem::UnknownSelection.into()]));
        };

        let value = match parameter.coerce_text(raw) {
            Ok(value) => value,
            Err(err) => {
                return Ok(turn.finish([Problem::InvalidParameterInput {
                    param_name: err.parameter,
                    message: err.message,
                }
                .into()]));
            }
        };

        let account = self
            .accounts
            .update(turn.user(), Some(&turn.account), |_, account| {
                account
                    .custom_settings
                    .insert(parameter.name.clone(), value.clone());
            })
            .await?;

        let editing = turn.state.clone();
        self.sessions.transition_if(
            turn.user(),
            |state| *state == editing,
            ConversationState::AwaitingPromptAndSettings {
                model_id: model.id.clone(),
            },
        )?;

        let dashboard = self.dashboard(model, &account)?;
        Ok(turn.finish([
            Outbound::SettingSaved {
                name: parameter.name.clone(),
                value,
            },
            Outbound::Dashboard(dashboard),
        ]))
    }

    pub(crate) fn open_image_upload(&self, turn: Turn) -> Result<Vec<Outbound>, EngineError> {
        let model = match self.dashboard_model(&turn) {
            Some(model) if model.accepts_image_input => model,
            _ => return Ok(turn.finish([Problem::UnknownSelection.into()])),
        };

        let user = turn.user();
        let current = self.staging.get(user)?;
        let pending = match current.filter(|pending| pending.model_id == model.id) {
            Some(pending) => pending,
            None => self.staging.stage(user, self.fresh_pending(model, None))?,
        };

        self.sessions.set(
            user,
            ConversationState::AwaitingDashboardImageUpload {
                model_id: model.id.clone(),
            },
        )?;
        Ok(turn.finish([Outbound::AwaitingImages {
            model_id: model.id.clone(),
            staged: pending.image_urls.len(),
            limit: pending.image_limit,
        }]))
    }

    pub(crate) fn finish_image_upload(&self, turn: Turn) -> Result<Vec<Outbound>, EngineError> {
        match turn.state.clone() {
            ConversationState::AwaitingDashboardImageUpload { model_id } => {
                let model = match self.state_model(&model_id) {
                    Ok(model) => model,
                    Err(problem) => return Ok(turn.finish([problem.into()])),
                };
                self.sessions.set(
                    turn.user(),
                    ConversationState::AwaitingPromptAndSettings {
                        model_id: model.id.clone(),
                    },
                )?;
                let dashboard = self.dashboard(model, &turn.account)?;
                Ok(turn.finish([Outbound::Dashboard(dashboard)]))
            }
            ConversationState::AwaitingMultiImageUpload { model_id, style_id } => {
                if self.staged_images(turn.user(), &model_id)?.is_empty() {
                    return Ok(turn.finish([Problem::ExpectedImage.into()]));
                }
                Ok(turn.finish([Outbound::AwaitingPrompt {
                    model_id,
                    style_id: Some(style_id),
                    accepts_image: true,
                }]))
            }
            _ => Ok(turn.finish([Problem::UnknownSelection.into()])),
        }
    }

    pub(crate) fn clear_staged_images(&self, turn: Turn) -> Result<Vec<Outbound>, EngineError> {
        let user = turn.user();
        match turn.state.clone() {
            ConversationState::AwaitingPromptAndSettings { model_id }
            | ConversationState::AwaitingDashboardImageUpload { model_id } => {
                let model = match self.state_model(&model_id) {
                    Ok(model) => model,
                    Err(problem) => return Ok(turn.finish([problem.into()])),
                };
                self.staging.clear_images(user)?;
                let dashboard = self.dashboard(model, &turn.account)?;
                Ok(turn.finish([Outbound::Dashboard(dashboard)]))
            }
            ConversationState::AwaitingMultiImageUpload { model_id, .. } => {
                self.staging.clear_images(user)?;
                let limit = self
                    .staging
                    .get(user)?
                    .map(|pending| pending.image_limit)
                    .unwrap_or_default();
                Ok(turn.finish([Outbound::AwaitingImages {
                    model_id,
                    staged: 0,
                    limit,
                }]))
            }
            _ => Ok(turn.finish([Problem::UnknownSelection.into()])),
        }
    }

    /// Adds an uploaded image to the staging record. A caption on a prompt-ready
    /// flow submits right away with everything staged so far.
    pub(crate) async fn stage_image(
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
        if !model.accepts_image_input {
            return Ok(turn.finish([Problem::ExpectedText.into()]));
        }

        let user = turn.user();
        let staged = self
            .staging
            .add_image(user, upload.url.clone(), || self.fresh_pending(model, style_id));
        let staged = match staged {
            Ok(staged) => staged,
            Err(err) if err.is_staging_limit() => {
                let limit = self
                    .staging
                    .get(user)?
                    .map(|pending| pending.image_limit)
                    .unwrap_or_else(|| model.image_limit());
                return Ok(turn.finish([Problem::StagingLimitExceeded { limit }.into()]));
            }
            Err(err) => return Err(err.into()),
        };

        let uploading_only = matches!(
            turn.state,
            ConversationState::AwaitingDashboardImageUpload { .. }
        );
        if let (Some(caption), false) = (upload.prompt(), uploading_only) {
            let images = self.staged_images(user, model_id)?;
            let caption = caption.to_string();
            return self
                .submit_generation(turn, model_id, &caption, images, style_id)
                .await;
        }

        let limit = model.image_limit().min(self.policy.staging_cap);
        Ok(turn.finish([Outbound::ImageStaged { staged, limit }]))
    }

    fn dashboard_model(&self, turn: &Turn) -> Option<&ModelDefinition> {
        match &turn.state {
            ConversationState::AwaitingPromptAndSettings { model_id } => {
                self.catalog.model(model_id)
            }
            _ => None,
        }
    }
}

/// Saved value for a parameter, falling back to its declared default.
fn current_value(parameter: &Parameter, account: &UserAccount) -> Option<Value> {
    account
        .custom_settings
        .get(&parameter.name)
        .filter(|value| !value.is_null())
        .or_else(|| parameter.default_value())
        .cloned()
}
