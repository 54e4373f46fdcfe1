//! Unified facade over the kiln workspace crates.
//!
//! This crate is the single dependency for a bot front end. It re-exports the
//! engine, catalog, ledger and provider crates and adds environment
//! configuration, catalog-file loading, runtime wiring and tracing setup.
//!
//! ```rust
//! use kiln::{Command, parse_command};
//!
//! assert_eq!(parse_command("/img"), Some(Command::Images));
//! assert_eq!(parse_command("just a prompt"), None);
//! ```

mod config;
mod error;

pub mod prelude;
pub mod runtime;
pub mod telemetry;
pub mod util;

pub use kcatalog;
pub use kcommon;
pub use kengine;
pub use kledger;
pub use kobserve;
pub use kprovider;
pub use ksession;
pub use kstore;

pub use config::{DEFAULT_PROVIDER_BASE_URL, KilnConfig, TOKEN_VAR};
pub use error::{KilnError, KilnErrorKind};

pub use kcatalog::{
    CatalogError, CatalogErrorKind, CreditPackage, MediaType, ModelCatalog, ModelDefinition,
    ParamType, Parameter, ProviderEntry, StyleTemplate,
};
pub use kcommon::{BoxFuture, ParameterBag, UserId};
pub use kengine::{
    AccountView, AssistMethod, AssistMode, Command, CreditSource, DashboardView, DispatchPhase,
    Engine, EngineBuilder, EngineError, EngineErrorKind, EngineHooks, EnginePolicy, ImageUpload,
    MenuSelection, ModelSummary, NoopEngineHooks, Outbound, ParameterView, Problem, ResetReason,
    Sender,
};
pub use kledger::{Cost, Currency, LedgerPolicy, UserAccount};
pub use kobserve::{FanoutEngineHooks, MetricsEngineHooks, SafeEngineHooks, TracingEngineHooks};
pub use kprovider::{
    CompletionRequest, GenerationProvider, GenerationRequest, MediaUrl, ProviderError,
    ProviderErrorKind, ProviderFuture,
};
pub use ksession::{ConversationState, InMemoryTranscriptStore, TranscriptStore};
pub use kstore::{InMemoryUserStore, StoreError, StoreErrorKind, UserStore};

#[cfg(feature = "provider-replicate")]
pub use runtime::{build_engine, build_provider};
pub use runtime::{
    build_engine_with, default_hooks, engine_policy, handle_message, ledger_policy, load_catalog,
};
pub use telemetry::{init_tracing, init_tracing_with};
pub use util::{parse_admin_ids, parse_command, parse_start_payload};
