//! Common imports for most kiln front ends.

#[cfg(feature = "provider-replicate")]
pub use crate::{build_engine, build_provider};
pub use crate::{
    build_engine_with, default_hooks, handle_message, init_tracing, load_catalog, parse_command,
};
pub use crate::{
    AccountView, Command, Cost, Currency, Engine, EngineError, EngineHooks, GenerationProvider,
    ImageUpload, InMemoryUserStore, KilnConfig, KilnError, KilnErrorKind, MediaType,
    MenuSelection, ModelCatalog, Outbound, Problem, Sender, UserId, UserStore,
};
