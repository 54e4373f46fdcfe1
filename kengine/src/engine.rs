use std::sync::Arc;

use kcatalog::{MediaType, ModelCatalog, ModelDefinition};
use kcommon::UserId;
use kledger::{Ledger, LedgerPolicy, UserAccount};
use kprovider::GenerationProvider;
use ksession::{
    ConversationState, InMemoryTranscriptStore, PendingGeneration, SessionStore, StagingStore,
    TranscriptStore,
};
use kstore::UserStore;

use crate::accounts::{AccountBook, Clock, SystemClock};
use crate::dispatch::Dispatcher;
use crate::error::EngineError;
use crate::hooks::{EngineHooks, NoopEngineHooks, ResetReason};
use crate::policy::{EnginePolicy, LANGUAGE_CODES};
use crate::types::{
    AccountView, Command, ImageUpload, MenuSelection, Outbound, Problem, Sender,
};

pub struct EngineBuilder {
    catalog: Arc<ModelCatalog>,
    provider: Arc<dyn GenerationProvider>,
    store: Arc<dyn UserStore>,
    transcripts: Option<Arc<dyn TranscriptStore>>,
    hooks: Arc<dyn EngineHooks>,
    clock: Arc<dyn Clock>,
    ledger_policy: LedgerPolicy,
    policy: EnginePolicy,
}

impl EngineBuilder {
    pub fn new(
        catalog: Arc<ModelCatalog>,
        provider: Arc<dyn GenerationProvider>,
        store: Arc<dyn UserStore>,
    ) -> Self {
        Self {
            catalog,
            provider,
            store,
            transcripts: None,
            hooks: Arc::new(NoopEngineHooks),
            clock: Arc::new(SystemClock),
            ledger_policy: LedgerPolicy::default(),
            policy: EnginePolicy::default(),
        }
    }

    pub fn transcripts(mut self, transcripts: Arc<dyn TranscriptStore>) -> Self {
        self.transcripts = Some(transcripts);
        self
    }

    pub fn hooks(mut self, hooks: Arc<dyn EngineHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn ledger_policy(mut self, ledger_policy: LedgerPolicy) -> Self {
        self.ledger_policy = ledger_policy;
        self
    }

    pub fn policy(mut self, policy: EnginePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn build(self) -> Result<Engine, EngineError> {
        self.policy.validate()?;

        let transcripts = self.transcripts.unwrap_or_else(|| {
            Arc::new(InMemoryTranscriptStore::with_capacity(
                self.policy.chat_history_cap,
            ))
        });
        let accounts = Arc::new(AccountBook::new(
            self.store,
            Ledger::new(self.ledger_policy),
        ));
        let dispatcher = Dispatcher::new(
            self.provider,
            Arc::clone(&accounts),
            Arc::clone(&self.hooks),
            self.policy.generation_timeout,
            self.policy.completion_timeout,
        );

        Ok(Engine {
            catalog: self.catalog,
            accounts,
            dispatcher,
            sessions: SessionStore::new(),
            staging: StagingStore::new(),
            transcripts,
            hooks: self.hooks,
            clock: self.clock,
            policy: self.policy,
        })
    }
}

/// Conversation engine: one entry point per inbound event kind, each returning
/// the render instructions for the transport.
pub struct Engine {
    pub(crate) catalog: Arc<ModelCatalog>,
    pub(crate) accounts: Arc<AccountBook>,
    pub(crate) dispatcher: Dispatcher,
    pub(crate) sessions: SessionStore,
    pub(crate) staging: StagingStore,
    pub(crate) transcripts: Arc<dyn TranscriptStore>,
    pub(crate) hooks: Arc<dyn EngineHooks>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) policy: EnginePolicy,
}

/// Per-event context after the account touch and the stale-state check.
pub(crate) struct Turn {
    pub account: UserAccount,
    pub created: bool,
    pub state: ConversationState,
    pub out: Vec<Outbound>,
    pub reset: bool,
}

impl Turn {
    pub(crate) fn user(&self) -> UserId {
        self.account.id
    }

    pub(crate) fn finish(mut self, outbound: impl IntoIterator<Item = Outbound>) -> Vec<Outbound> {
        self.out.extend(outbound);
        self.out
    }
}

impl Engine {
    pub fn builder(
        catalog: Arc<ModelCatalog>,
        provider: Arc<dyn GenerationProvider>,
        store: Arc<dyn UserStore>,
    ) -> EngineBuilder {
        EngineBuilder::new(catalog, provider, store)
    }

    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    pub fn ledger(&self) -> &Ledger {
        self.accounts.ledger()
    }

    pub fn policy(&self) -> &EnginePolicy {
        &self.policy
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn staging(&self) -> &StagingStore {
        &self.staging
    }

    pub async fn handle_command(
        &self,
        sender: &Sender,
        command: Command,
    ) -> Result<Vec<Outbound>, EngineError> {
        let referral = match &command {
            Command::Start { referral } => *referral,
            _ => None,
        };
        let turn = self.begin(sender, referral).await?;

        match command {
            Command::Start { .. } => self.start(turn),
            Command::Images => self.open_providers(turn, MediaType::Image),
            Command::Videos => self.open_providers(turn, MediaType::Video),
            Command::Chat => self.open_chat_models(turn),
            Command::Prompt => self.open_assist(turn),
            Command::Exchange => self.open_exchange(turn),
            Command::Transform { model_id } => self.open_transform(turn, &model_id),
            Command::Profile => {
                let view = AccountView::from(&turn.account);
                Ok(turn.finish([Outbound::Profile(view)]))
            }
            Command::Language => {
                let current = turn.account.language_code.clone();
                let languages = LANGUAGE_CODES.iter().map(|code| code.to_string()).collect();
                Ok(turn.finish([Outbound::LanguageMenu { current, languages }]))
            }
            Command::Cancel => self.cancel(turn).await,
        }
    }

    pub async fn handle_selection(
        &self,
        sender: &Sender,
        selection: MenuSelection,
    ) -> Result<Vec<Outbound>, EngineError> {
        let turn = self.begin(sender, None).await?;
        if turn.reset {
            return Ok(turn.out);
        }

        match selection {
            MenuSelection::Cancel => self.cancel(turn).await,
            MenuSelection::StopChat => self.stop_chat(turn).await,
            MenuSelection::Provider(provider_id) => self.select_provider(turn, &provider_id),
            MenuSelection::Model(model_id) => self.select_model(turn, &model_id).await,
            MenuSelection::Style(style_id) => self.select_style(turn, &style_id),
            MenuSelection::AspectRatio(ratio) => self.select_aspect_ratio(turn, &ratio).await,
            MenuSelection::NumOutputs(count) => self.select_num_outputs(turn, count).await,
            MenuSelection::EditParameter(name) => self.open_parameter(turn, &name),
            MenuSelection::ParameterOption { param_name, value } => {
                self.save_parameter(turn, &param_name, &value).await
            }
            MenuSelection::ShowTemplates => self.open_templates(turn),
            MenuSelection::Template(template_id) => {
                self.submit_template(turn, &template_id).await
            }
            MenuSelection::Language(language_code) => {
                self.select_language(turn, &language_code).await
            }
            MenuSelection::UploadImages => self.open_image_upload(turn),
            MenuSelection::ImagesDone => self.finish_image_upload(turn),
            MenuSelection::ClearImages => self.clear_staged_images(turn),
            MenuSelection::AssistMode(mode) => self.select_assist_mode(turn, mode),
            MenuSelection::AssistMethod(method) => self.run_assist_idea(turn, method).await,
        }
    }

    pub async fn handle_text(
        &self,
        sender: &Sender,
        text: &str,
    ) -> Result<Vec<Outbound>, EngineError> {
        let turn = self.begin(sender, None).await?;
        if turn.reset {
            return Ok(turn.out);
        }

        match turn.state.clone() {
            ConversationState::Idle => Ok(turn.finish([Outbound::Help])),
            ConversationState::AwaitingPromptAndSettings { model_id } => {
                let images = self.staged_images(turn.user(), &model_id)?;
                self.submit_generation(turn, &model_id, text, images, None)
                    .await
            }
            ConversationState::EditingParameter {
                param_name,
                ..
            } => self.save_parameter(turn, &param_name, text).await,
            ConversationState::AwaitingMultiImageUpload { model_id, style_id } => {
                let images = self.staged_images(turn.user(), &model_id)?;
                if images.is_empty() {
                    return Ok(turn.finish([Problem::ExpectedImage.into()]));
                }
                self.submit_generation(turn, &model_id, text, images, Some(&style_id))
                    .await
            }
            ConversationState::AwaitingSimplePromptOrImage { model_id, style_id } => {
                self.submit_generation(turn, &model_id, text, Vec::new(), style_id.as_deref())
                    .await
            }
            ConversationState::ChatMode { model_id } => {
                self.chat_turn(turn, &model_id, text).await
            }
            ConversationState::AwaitingExchangeAmount => self.exchange(turn, text).await,
            ConversationState::AwaitingPromptIdeaText => self.receive_idea(turn, text),
            ConversationState::AwaitingDashboardImageUpload { .. }
            | ConversationState::AwaitingPromptSourceImage => {
                Ok(turn.finish([Problem::ExpectedImage.into()]))
            }
            ConversationState::AwaitingProviderSelection { .. }
            | ConversationState::AwaitingModelSelection { .. }
            | ConversationState::AwaitingStyleSelection { .. }
            | ConversationState::AwaitingPromptMethod { .. } => {
                Ok(turn.finish([Problem::UnknownSelection.into()]))
            }
        }
    }

    pub async fn handle_image(
        &self,
        sender: &Sender,
        upload: ImageUpload,
    ) -> Result<Vec<Outbound>, EngineError> {
        let turn = self.begin(sender, None).await?;
        if turn.reset {
            return Ok(turn.out);
        }

        match turn.state.clone() {
            ConversationState::AwaitingPromptAndSettings { model_id }
            | ConversationState::AwaitingDashboardImageUpload { model_id } => {
                self.stage_image(turn, &model_id, None, upload).await
            }
            ConversationState::AwaitingMultiImageUpload { model_id, style_id } => {
                self.stage_image(turn, &model_id, Some(&style_id), upload)
                    .await
            }
            ConversationState::AwaitingSimplePromptOrImage { model_id, style_id } => {
                self.submit_simple_image(turn, &model_id, style_id.as_deref(), upload)
                    .await
            }
            ConversationState::ChatMode { model_id } => {
                self.chat_vision(turn, &model_id, upload).await
            }
            ConversationState::AwaitingPromptSourceImage => {
                self.run_assist_image(turn, upload).await
            }
            ConversationState::Idle => Ok(turn.finish([Outbound::Help])),
            ConversationState::EditingParameter { .. }
            | ConversationState::AwaitingExchangeAmount
            | ConversationState::AwaitingPromptIdeaText => {
                Ok(turn.finish([Problem::ExpectedText.into()]))
            }
            ConversationState::AwaitingProviderSelection { .. }
            | ConversationState::AwaitingModelSelection { .. }
            | ConversationState::AwaitingStyleSelection { .. }
            | ConversationState::AwaitingPromptMethod { .. } => {
                Ok(turn.finish([Problem::UnknownSelection.into()]))
            }
        }
    }

    /// Loads the account and replaces a state whose catalog references no longer
    /// resolve with `Idle`.
    pub(crate) async fn begin(
        &self,
        sender: &Sender,
        referral: Option<UserId>,
    ) -> Result<Turn, EngineError> {
        let touched = self
            .accounts
            .touch(sender, referral, self.clock.now())
            .await?;
        let state = self.sessions.get(sender.id)?;

        let mut turn = Turn {
            account: touched.account,
            created: touched.created,
            state,
            out: Vec::new(),
            reset: false,
        };

        if turn.state.validate(&self.catalog).is_err() {
            self.reset(turn.user(), ResetReason::StaleState).await?;
            turn.state = ConversationState::Idle;
            turn.out.push(Problem::SessionExpired.into());
            turn.reset = true;
        }

        Ok(turn)
    }

    /// Clears state, staging and chat history for the user.
    pub(crate) async fn reset(&self, user: UserId, reason: ResetReason) -> Result<(), EngineError> {
        self.sessions.clear(user)?;
        self.staging.clear(user)?;
        self.transcripts.clear(user).await?;
        self.hooks.on_state_reset(user, reason);
        Ok(())
    }

    fn start(&self, turn: Turn) -> Result<Vec<Outbound>, EngineError> {
        let account = AccountView::from(&turn.account);
        let created = turn.created;
        Ok(turn.finish([Outbound::Welcome { account, created }]))
    }

    async fn select_language(
        &self,
        turn: Turn,
        language_code: &str,
    ) -> Result<Vec<Outbound>, EngineError> {
        let language_code = language_code.trim().to_ascii_lowercase();
        if !LANGUAGE_CODES.contains(&language_code.as_str()) {
            return Ok(turn.finish([Problem::UnknownSelection.into()]));
        }

        let account = self
            .accounts
            .update(turn.user(), Some(&turn.account), |_, account| {
                account.language_code = language_code.clone();
            })
            .await?;
        Ok(turn.finish([Outbound::LanguageSaved {
            language_code: account.language_code,
        }]))
    }

    async fn cancel(&self, turn: Turn) -> Result<Vec<Outbound>, EngineError> {
        self.reset(turn.user(), ResetReason::Cancelled).await?;
        Ok(turn.finish([Outbound::Cancelled]))
    }

    /// Model referenced by the current state. `begin` has validated it already,
    /// so a miss here means the state moved underneath this event.
    pub(crate) fn state_model(&self, model_id: &str) -> Result<&ModelDefinition, Problem> {
        self.catalog.model(model_id).ok_or(Problem::SessionExpired)
    }

    pub(crate) fn fresh_pending(
        &self,
        model: &ModelDefinition,
        style_id: Option<&str>,
    ) -> PendingGeneration {
        PendingGeneration::new(
            model.id.clone(),
            model.image_limit().min(self.policy.staging_cap),
        )
        .with_style(style_id.map(str::to_string))
    }

    pub(crate) fn staged_images(
        &self,
        user: UserId,
        model_id: &str,
    ) -> Result<Vec<String>, EngineError> {
        Ok(self
            .staging
            .get(user)?
            .filter(|pending| pending.model_id == model_id)
            .map(|pending| pending.image_urls)
            .unwrap_or_default())
    }
}
