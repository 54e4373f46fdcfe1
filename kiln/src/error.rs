//! Facade errors for configuration loading and runtime wiring.

use std::error::Error;
use std::fmt::{Display, Formatter};

use kcatalog::CatalogError;
use kengine::EngineError;
use kprovider::ProviderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KilnErrorKind {
    Config,
    Catalog,
    Provider,
    Engine,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KilnError {
    pub kind: KilnErrorKind,
    pub message: String,
}

impl KilnError {
    pub fn new(kind: KilnErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(KilnErrorKind::Config, message)
    }

    pub fn catalog(message: impl Into<String>) -> Self {
        Self::new(KilnErrorKind::Catalog, message)
    }

    pub fn provider(message: impl Into<String>) -> Self {
        Self::new(KilnErrorKind::Provider, message)
    }

    pub fn engine(message: impl Into<String>) -> Self {
        Self::new(KilnErrorKind::Engine, message)
    }
}

impl Display for KilnError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl Error for KilnError {}

impl From<CatalogError> for KilnError {
    fn from(value: CatalogError) -> Self {
        KilnError::catalog(value.to_string())
    }
}

impl From<ProviderError> for KilnError {
    fn from(value: ProviderError) -> Self {
        KilnError::provider(value.to_string())
    }
}

impl From<EngineError> for KilnError {
    fn from(value: EngineError) -> Self {
        KilnError::engine(value.to_string())
    }
}
