//! Conversation engine for the kiln media bot core.
//!
//! The engine turns inbound events (commands, menu selections, text and photos)
//! into render instructions, driving the per-user conversation state, the
//! pending-generation staging area, the credit ledger and the generation
//! dispatcher.
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use kcatalog::{MediaType, ModelCatalog, ModelDefinition};
//! use kengine::{Command, Engine, Outbound, Sender};
//! use kprovider::{
//!     CompletionRequest, GenerationProvider, GenerationRequest, MediaUrl, ProviderError,
//!     ProviderFuture,
//! };
//! use kstore::InMemoryUserStore;
//!
//! struct Offline;
//!
//! impl GenerationProvider for Offline {
//!     fn submit<'a>(
//!         &'a self,
//!         _model_ref: &'a str,
//!         _request: GenerationRequest,
//!     ) -> ProviderFuture<'a, Result<Vec<MediaUrl>, ProviderError>> {
//!         Box::pin(async { Err(ProviderError::unavailable("offline")) })
//!     }
//!
//!     fn complete<'a>(
//!         &'a self,
//!         _request: CompletionRequest,
//!     ) -> ProviderFuture<'a, Result<String, ProviderError>> {
//!         Box::pin(async { Err(ProviderError::unavailable("offline")) })
//!     }
//! }
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let catalog = ModelCatalog::builder()
//!     .model(ModelDefinition::new("flux", "black-forest-labs/flux-dev", MediaType::Image))
//!     .build()
//!     .expect("catalog should build");
//! let engine = Engine::builder(
//!     Arc::new(catalog),
//!     Arc::new(Offline),
//!     Arc::new(InMemoryUserStore::new()),
//! )
//! .build()
//! .expect("engine should build");
//!
//! let out = engine
//!     .handle_command(&Sender::new(kcommon::UserId::new(7)), Command::Start { referral: None })
//!     .await
//!     .expect("start should succeed");
//! assert!(matches!(out[0], Outbound::Welcome { created: true, .. }));
//! # });
//! ```

mod accounts;
mod assist;
mod browse;
mod chat;
mod dashboard;
mod dispatch;
mod engine;
mod error;
mod generate;
mod hooks;
mod policy;
mod types;
mod wallet;

pub use accounts::{Clock, SystemClock};
pub use engine::{Engine, EngineBuilder};
pub use error::{EngineError, EngineErrorKind};
pub use hooks::{CreditSource, DispatchPhase, EngineHooks, NoopEngineHooks, ResetReason};
pub use policy::{ASPECT_RATIOS, EnginePolicy, LANGUAGE_CODES};
pub use types::{
    AccountView, AssistMethod, AssistMode, Command, DashboardView, ImageUpload, MenuSelection,
    ModelSummary, Outbound, ParameterView, Problem, Sender,
};

pub mod prelude {
    pub use crate::{
        AccountView, AssistMethod, AssistMode, Clock, Command, CreditSource, DispatchPhase,
        Engine, EngineBuilder, EngineError, EngineErrorKind, EngineHooks, EnginePolicy,
        ImageUpload, MenuSelection, NoopEngineHooks, Outbound, Problem, ResetReason, Sender,
        SystemClock,
    };
}
