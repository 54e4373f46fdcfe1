//! Engine infrastructure errors.
//!
//! User-facing conditions such as insufficient funds are returned as
//! [`Problem`](crate::Problem) values; this type only covers failures of the
//! collaborators the engine depends on.
//!
//! ```rust
//! use kengine::{EngineError, EngineErrorKind};
//! use kstore::StoreError;
//!
//! let err: EngineError = StoreError::storage("connection reset").into();
//! assert_eq!(err.kind, EngineErrorKind::Store);
//! assert!(err.to_string().contains("connection reset"));
//! ```

use std::error::Error;
use std::fmt::{Display, Formatter};

use ksession::SessionError;
use kstore::{StoreError, StoreErrorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineErrorKind {
    Store,
    Session,
    NotFound,
    InvalidConfiguration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineError {
    pub kind: EngineErrorKind,
    pub message: String,
}

impl EngineError {
    pub fn new(kind: EngineErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn store(message: impl Into<String>) -> Self {
        Self::new(EngineErrorKind::Store, message)
    }

    pub fn session(message: impl Into<String>) -> Self {
        Self::new(EngineErrorKind::Session, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(EngineErrorKind::NotFound, message)
    }

    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        Self::new(EngineErrorKind::InvalidConfiguration, message)
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == EngineErrorKind::NotFound
    }
}

impl Display for EngineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl Error for EngineError {}

impl From<StoreError> for EngineError {
    fn from(value: StoreError) -> Self {
        match value.kind {
            StoreErrorKind::NotFound => EngineError::not_found(value.message),
            _ => EngineError::store(value.message),
        }
    }
}

impl From<SessionError> for EngineError {
    fn from(value: SessionError) -> Self {
        EngineError::session(value.message)
    }
}
