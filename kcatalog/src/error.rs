//! Catalog loading errors and parameter input errors.

use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogErrorKind {
    Io,
    Parse,
    Invalid,
    Duplicate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogError {
    pub kind: CatalogErrorKind,
    pub message: String,
}

impl CatalogError {
    pub fn new(kind: CatalogErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::new(CatalogErrorKind::Io, message)
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(CatalogErrorKind::Parse, message)
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::new(CatalogErrorKind::Invalid, message)
    }

    pub fn duplicate(message: impl Into<String>) -> Self {
        Self::new(CatalogErrorKind::Duplicate, message)
    }
}

impl Display for CatalogError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl Error for CatalogError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterErrorKind {
    WrongType,
    OutOfRange,
    NotAnOption,
}

/// Rejected value for a declared model parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterError {
    pub kind: ParameterErrorKind,
    pub parameter: String,
    pub message: String,
}

impl ParameterError {
    pub fn new(
        kind: ParameterErrorKind,
        parameter: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            parameter: parameter.into(),
            message: message.into(),
        }
    }

    pub fn wrong_type(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ParameterErrorKind::WrongType, parameter, message)
    }

    pub fn out_of_range(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ParameterErrorKind::OutOfRange, parameter, message)
    }

    pub fn not_an_option(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ParameterErrorKind::NotAnOption, parameter, message)
    }
}

impl Display for ParameterError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} ({}): {}", self.kind, self.parameter, self.message)
    }
}

impl Error for ParameterError {}
