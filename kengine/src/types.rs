//! Inbound events and outbound render instructions exchanged with the transport.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use kcatalog::{MediaType, ModelDefinition, Parameter, PromptTemplate, ProviderEntry, StyleTemplate};
use kcommon::UserId;
use kledger::{Cost, Currency, UserAccount};
use kprovider::MediaUrl;
use serde_json::Value;

/// Identity of the user an inbound event came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    pub id: UserId,
    pub username: Option<String>,
    pub language_code: Option<String>,
}

impl Sender {
    pub fn new(id: impl Into<UserId>) -> Self {
        Self {
            id: id.into(),
            username: None,
            language_code: None,
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn with_language_code(mut self, language_code: impl Into<String>) -> Self {
        self.language_code = Some(language_code.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start { referral: Option<UserId> },
    Images,
    Videos,
    Chat,
    Prompt,
    Exchange,
    Transform { model_id: String },
    Profile,
    Language,
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssistMode {
    Idea,
    Image,
}

/// Prompt-writing strategies offered after an idea is received.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssistMethod {
    ZeroShot,
    Role,
    Permutation,
    Step,
    Json,
}

impl AssistMethod {
    pub const ALL: [AssistMethod; 5] = [
        Self::ZeroShot,
        Self::Role,
        Self::Permutation,
        Self::Step,
        Self::Json,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ZeroShot => "zero_shot",
            Self::Role => "role",
            Self::Permutation => "permutation",
            Self::Step => "step",
            Self::Json => "json",
        }
    }

    pub fn instruction(self) -> &'static str {
        match self {
            Self::ZeroShot => "Style: Direct, concise.",
            Self::Role => "Style: National Geographic / Concept Artist.",
            Self::Permutation => "Style: Mix conflicting styles.",
            Self::Step => "Style: Structured (Subject, Light, Camera).",
            Self::Json => "Output Format: JSON.",
        }
    }
}

impl Display for AssistMethod {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssistMethod {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|method| method.as_str() == value.trim())
            .ok_or_else(|| format!("unknown prompt method '{value}'"))
    }
}

/// A structured menu choice made by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuSelection {
    Provider(String),
    Model(String),
    Style(String),
    AspectRatio(String),
    NumOutputs(u32),
    EditParameter(String),
    ParameterOption { param_name: String, value: String },
    ShowTemplates,
    Template(String),
    Language(String),
    UploadImages,
    ImagesDone,
    ClearImages,
    AssistMode(AssistMode),
    AssistMethod(AssistMethod),
    StopChat,
    Cancel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub url: String,
    pub caption: Option<String>,
}

impl ImageUpload {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            caption: None,
        }
    }

    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    /// Caption text, if it has any non-whitespace content.
    pub fn prompt(&self) -> Option<&str> {
        self.caption
            .as_deref()
            .map(str::trim)
            .filter(|caption| !caption.is_empty())
    }
}

/// User-visible condition reported instead of a result.
#[derive(Debug, Clone, PartialEq)]
pub enum Problem {
    InsufficientFunds { required: Cost, available: u64 },
    InvalidParameterInput { param_name: String, message: String },
    SessionExpired,
    GenerationFailed { message: String },
    StagingLimitExceeded { limit: usize },
    InvalidAmount { message: String },
    ExpectedImage,
    ExpectedText,
    UnknownSelection,
    UnknownUser(UserId),
    NotAuthorized,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AccountView {
    pub user_id: UserId,
    pub free_credits: u32,
    pub paid_credits: u32,
    pub diamonds: u32,
    pub aspect_ratio: String,
    pub num_outputs: u32,
    pub generated_image_count: u32,
    pub language_code: String,
}

impl AccountView {
    pub fn total_credits(&self) -> u64 {
        u64::from(self.free_credits) + u64::from(self.paid_credits)
    }
}

impl From<&UserAccount> for AccountView {
    fn from(account: &UserAccount) -> Self {
        Self {
            user_id: account.id,
            free_credits: account.free_credits,
            paid_credits: account.paid_credits,
            diamonds: account.diamonds,
            aspect_ratio: account.aspect_ratio.clone(),
            num_outputs: account.num_outputs,
            generated_image_count: account.generated_image_count,
            language_code: account.language_code.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelSummary {
    pub id: String,
    pub name: String,
    pub description: String,
    pub unit_cost: Cost,
}

impl From<&ModelDefinition> for ModelSummary {
    fn from(model: &ModelDefinition) -> Self {
        Self {
            id: model.id.clone(),
            name: model.name.clone(),
            description: model.description.clone(),
            unit_cost: model.unit_cost(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterView {
    pub name: String,
    pub label: String,
    pub value: Option<Value>,
    pub has_options: bool,
}

/// Settings screen for the model being configured.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardView {
    pub model: ModelSummary,
    pub cost: Cost,
    pub aspect_ratio: Option<String>,
    pub num_outputs: u32,
    pub configurable_aspect_ratio: bool,
    pub configurable_num_outputs: bool,
    pub accepts_image_input: bool,
    pub staged_images: usize,
    pub image_limit: usize,
    pub parameters: Vec<ParameterView>,
    pub templates_available: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Welcome { account: AccountView, created: bool },
    Help,
    ProviderMenu { media_type: MediaType, providers: Vec<ProviderEntry> },
    ModelMenu { media_type: MediaType, models: Vec<ModelSummary> },
    StyleMenu { model_id: String, styles: Vec<StyleTemplate> },
    Dashboard(DashboardView),
    ParameterPrompt { model_id: String, parameter: Parameter, current: Option<Value> },
    ParameterOptions { model_id: String, parameter: Parameter, current: Option<Value> },
    SettingSaved { name: String, value: Value },
    TemplateMenu { model_id: String, templates: Vec<PromptTemplate> },
    LanguageSaved { language_code: String },
    AwaitingImages { model_id: String, staged: usize, limit: usize },
    ImageStaged { staged: usize, limit: usize },
    AwaitingPrompt { model_id: String, style_id: Option<String>, accepts_image: bool },
    Media { model_id: String, media_type: MediaType, urls: Vec<MediaUrl>, cost: Cost },
    ChatStarted { model_id: String },
    ChatReply { text: String },
    ChatEnded,
    AssistModeMenu { cost: Cost },
    AssistAwaitingInput { mode: AssistMode },
    AssistMethodMenu { idea: String, methods: Vec<AssistMethod> },
    AssistedPrompt { method: Option<AssistMethod>, text: String, cost: Cost },
    ExchangePrompt { rate: u32, available: u64 },
    Exchanged { diamonds: u32, cost: Cost, account: AccountView },
    Credited { amount: u32, currency: Currency, account: AccountView },
    ReferralBonusEarned { referrer: UserId, bonus: u32 },
    Profile(AccountView),
    LanguageMenu { current: String, languages: Vec<String> },
    Cancelled,
    Problem(Problem),
}

impl From<Problem> for Outbound {
    fn from(value: Problem) -> Self {
        Outbound::Problem(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assist_methods_parse_from_their_callback_names() {
        for method in AssistMethod::ALL {
            assert_eq!(method.as_str().parse::<AssistMethod>(), Ok(method));
        }
        assert!("haiku".parse::<AssistMethod>().is_err());
    }

    #[test]
    fn blank_captions_do_not_count_as_prompts() {
        assert_eq!(ImageUpload::new("a.png").with_caption("  ").prompt(), None);
        assert_eq!(
            ImageUpload::new("a.png").with_caption(" a cat ").prompt(),
            Some("a cat")
        );
    }
}
