//! Production-friendly observability hooks for the kiln engine.
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use kobserve::{FanoutEngineHooks, MetricsEngineHooks, SafeEngineHooks, TracingEngineHooks};
//!
//! let hooks = SafeEngineHooks::new(
//!     FanoutEngineHooks::new()
//!         .with(Arc::new(TracingEngineHooks))
//!         .with(Arc::new(MetricsEngineHooks)),
//! );
//! let _shared: Arc<dyn kengine::EngineHooks> = Arc::new(hooks);
//! ```

mod metrics_hooks;
mod safe_hooks;
mod tracing_hooks;

pub use metrics_hooks::MetricsEngineHooks;
pub use safe_hooks::{FanoutEngineHooks, SafeEngineHooks};
pub use tracing_hooks::TracingEngineHooks;

pub mod prelude {
    pub use crate::{FanoutEngineHooks, MetricsEngineHooks, SafeEngineHooks, TracingEngineHooks};
}

#[cfg(test)]
mod tests;
