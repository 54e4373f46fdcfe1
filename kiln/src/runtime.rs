//! Runtime wiring: catalog files, provider client, hooks and the engine.

use std::path::Path;
use std::sync::Arc;

use kcatalog::{ModelCatalog, load_entries};
use kengine::{Engine, EngineHooks, EnginePolicy, Outbound, Sender};
use kledger::LedgerPolicy;
use kobserve::{FanoutEngineHooks, MetricsEngineHooks, SafeEngineHooks, TracingEngineHooks};
use kprovider::GenerationProvider;
use kstore::UserStore;
use serde::de::DeserializeOwned;

use crate::config::KilnConfig;
use crate::error::KilnError;
use crate::util::parse_command;

/// Loads the catalog files named by `config`. The model file is required;
/// the provider, style, template and package files are optional.
pub fn load_catalog(config: &KilnConfig) -> Result<ModelCatalog, KilnError> {
    let catalog = ModelCatalog::builder()
        .models(load_entries(&config.models_file)?)
        .providers(load_optional(&config.providers_file)?)
        .styles(load_optional(&config.styles_file)?)
        .templates(load_optional(&config.templates_file)?)
        .packages(load_optional(&config.packages_file)?)
        .build()?;

    tracing::info!(
        phase = "startup",
        event = "catalog_loaded",
        models = catalog.models().count(),
        styles = catalog.styles().count(),
        templates = catalog.templates().count(),
        packages = catalog.packages().count()
    );
    Ok(catalog)
}

fn load_optional<T>(path: &Path) -> Result<Vec<T>, KilnError>
where
    T: DeserializeOwned,
{
    if !path.exists() {
        tracing::warn!(
            phase = "startup",
            event = "catalog_file_missing",
            path = %path.display()
        );
        return Ok(Vec::new());
    }
    Ok(load_entries(path)?)
}

/// Tracing and metrics hooks behind a panic guard.
pub fn default_hooks() -> Arc<dyn EngineHooks> {
    let fanout = FanoutEngineHooks::new()
        .with(Arc::new(TracingEngineHooks))
        .with(Arc::new(MetricsEngineHooks));
    Arc::new(SafeEngineHooks::new(fanout))
}

pub fn engine_policy(config: &KilnConfig) -> EnginePolicy {
    EnginePolicy::default()
        .with_generation_timeout(config.generation_timeout)
        .with_completion_timeout(config.completion_timeout)
        .with_assist_model(config.assist_model.clone())
        .with_admin_ids(config.admin_ids.iter().copied())
}

pub fn ledger_policy(config: &KilnConfig) -> LedgerPolicy {
    LedgerPolicy::default().with_daily_free_grant(config.daily_free_credits)
}

#[cfg(feature = "provider-replicate")]
pub fn build_provider(config: &KilnConfig) -> Result<Arc<dyn GenerationProvider>, KilnError> {
    use kprovider::adapters::replicate::{ReplicateAuth, ReplicateHttpTransport, ReplicateProvider};

    let auth = ReplicateAuth::new(config.provider_token.as_str())?;
    let http = reqwest::Client::builder()
        .timeout(config.generation_timeout + config.completion_timeout)
        .build()
        .map_err(|err| KilnError::provider(err.to_string()))?;
    let transport =
        ReplicateHttpTransport::new(http).with_base_url(config.provider_base_url.clone());

    Ok(Arc::new(ReplicateProvider::new(auth, Arc::new(transport))))
}

/// Builds an engine around an already constructed catalog and provider.
pub fn build_engine_with(
    config: &KilnConfig,
    catalog: ModelCatalog,
    provider: Arc<dyn GenerationProvider>,
    store: Arc<dyn UserStore>,
) -> Result<Engine, KilnError> {
    let engine = Engine::builder(Arc::new(catalog), provider, store)
        .hooks(default_hooks())
        .policy(engine_policy(config))
        .ledger_policy(ledger_policy(config))
        .build()?;
    Ok(engine)
}

#[cfg(feature = "provider-replicate")]
pub fn build_engine(config: &KilnConfig, store: Arc<dyn UserStore>) -> Result<Engine, KilnError> {
    let catalog = load_catalog(config)?;
    let provider = build_provider(config)?;
    build_engine_with(config, catalog, provider, store)
}

/// Routes a text message: slash commands go to the command handler, unknown
/// commands and plain text go to the state-dependent text handler.
pub async fn handle_message(
    engine: &Engine,
    sender: &Sender,
    text: &str,
) -> Result<Vec<Outbound>, KilnError> {
    let out = match parse_command(text) {
        Some(command) => engine.handle_command(sender, command).await?,
        None => engine.handle_text(sender, text).await?,
    };
    Ok(out)
}
