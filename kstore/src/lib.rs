//! User record persistence contract for the kiln media bot core.
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use kstore::{InMemoryUserStore, UserStore};
//!
//! let _store: Arc<dyn UserStore> = Arc::new(InMemoryUserStore::new());
//! ```

mod backend;
mod error;

pub use backend::{InMemoryUserStore, UserStore};
pub use error::{StoreError, StoreErrorKind};

pub mod prelude {
    pub use crate::{InMemoryUserStore, StoreError, StoreErrorKind, UserStore};
}
