//! Conversation position of one user as a tagged union.
//!
//! ```rust
//! use kcatalog::{MediaType, ModelCatalog, ModelDefinition};
//! use ksession::ConversationState;
//!
//! let catalog = ModelCatalog::builder()
//!     .model(ModelDefinition::new("flux", "bfl/flux-dev", MediaType::Image))
//!     .build()
//!     .expect("catalog should build");
//!
//! let live = ConversationState::AwaitingPromptAndSettings { model_id: "flux".into() };
//! let stale = ConversationState::ChatMode { model_id: "retired".into() };
//!
//! assert!(live.validate(&catalog).is_ok());
//! assert!(stale.validate(&catalog).is_err());
//! ```

use std::fmt::{Display, Formatter};

use kcatalog::{MediaType, ModelCatalog};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConversationState {
    #[default]
    Idle,
    AwaitingProviderSelection {
        media_type: MediaType,
    },
    AwaitingModelSelection {
        media_type: MediaType,
    },
    AwaitingStyleSelection {
        model_id: String,
    },
    AwaitingPromptAndSettings {
        model_id: String,
    },
    AwaitingDashboardImageUpload {
        model_id: String,
    },
    EditingParameter {
        model_id: String,
        param_name: String,
    },
    AwaitingMultiImageUpload {
        model_id: String,
        style_id: String,
    },
    AwaitingSimplePromptOrImage {
        model_id: String,
        style_id: Option<String>,
    },
    ChatMode {
        model_id: String,
    },
    AwaitingExchangeAmount,
    AwaitingPromptIdeaText,
    AwaitingPromptMethod {
        idea: String,
    },
    AwaitingPromptSourceImage,
}

/// Catalog reference that no longer resolves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StaleReference {
    Model(String),
    Parameter { model_id: String, param_name: String },
    Style(String),
}

impl Display for StaleReference {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Model(model_id) => write!(f, "unknown model '{model_id}'"),
            Self::Parameter {
                model_id,
                param_name,
            } => write!(f, "unknown parameter '{param_name}' on model '{model_id}'"),
            Self::Style(style_id) => write!(f, "unknown style '{style_id}'"),
        }
    }
}

impl ConversationState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn model_id(&self) -> Option<&str> {
        match self {
            Self::AwaitingStyleSelection { model_id }
            | Self::AwaitingPromptAndSettings { model_id }
            | Self::AwaitingDashboardImageUpload { model_id }
            | Self::EditingParameter { model_id, .. }
            | Self::AwaitingMultiImageUpload { model_id, .. }
            | Self::AwaitingSimplePromptOrImage { model_id, .. }
            | Self::ChatMode { model_id } => Some(model_id.as_str()),
            _ => None,
        }
    }

    pub fn style_id(&self) -> Option<&str> {
        match self {
            Self::AwaitingMultiImageUpload { style_id, .. } => Some(style_id.as_str()),
            Self::AwaitingSimplePromptOrImage { style_id, .. } => style_id.as_deref(),
            _ => None,
        }
    }

    /// Stable name used in logs and metrics labels.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::AwaitingProviderSelection { .. } => "awaiting_provider_selection",
            Self::AwaitingModelSelection { .. } => "awaiting_model_selection",
            Self::AwaitingStyleSelection { .. } => "awaiting_style_selection",
            Self::AwaitingPromptAndSettings { .. } => "awaiting_prompt_and_settings",
            Self::AwaitingDashboardImageUpload { .. } => "awaiting_dashboard_image_upload",
            Self::EditingParameter { .. } => "editing_parameter",
            Self::AwaitingMultiImageUpload { .. } => "awaiting_multi_image_upload",
            Self::AwaitingSimplePromptOrImage { .. } => "awaiting_simple_prompt_or_image",
            Self::ChatMode { .. } => "chat_mode",
            Self::AwaitingExchangeAmount => "awaiting_exchange_amount",
            Self::AwaitingPromptIdeaText => "awaiting_prompt_idea_text",
            Self::AwaitingPromptMethod { .. } => "awaiting_prompt_method",
            Self::AwaitingPromptSourceImage => "awaiting_prompt_source_image",
        }
    }

    /// Checks every model, parameter and style reference against the catalog.
    pub fn validate(&self, catalog: &ModelCatalog) -> Result<(), StaleReference> {
        if let Some(model_id) = self.model_id() {
            if !catalog.has_model(model_id) {
                return Err(StaleReference::Model(model_id.to_string()));
            }
        }

        if let Self::EditingParameter {
            model_id,
            param_name,
        } = self
        {
            if catalog.parameter(model_id, param_name).is_none() {
                return Err(StaleReference::Parameter {
                    model_id: model_id.clone(),
                    param_name: param_name.clone(),
                });
            }
        }

        if let Some(style_id) = self.style_id() {
            if !catalog.has_style(style_id) {
                return Err(StaleReference::Style(style_id.to_string()));
            }
        }

        Ok(())
    }
}

impl Display for ConversationState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
