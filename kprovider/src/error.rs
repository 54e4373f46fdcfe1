//! Failures reported by a generation backend.
//!
//! `retryable` follows from the kind and is only recorded by observers. A failed
//! generation is reported to the user and never resubmitted.
//!
//! ```rust
//! use kprovider::{ProviderError, ProviderErrorKind};
//!
//! let refused = ProviderError::prediction_failed("NSFW content detected");
//! assert_eq!(refused.kind, ProviderErrorKind::PredictionFailed);
//! assert!(!refused.retryable);
//!
//! let slow = ProviderError::timeout("no result within 300s");
//! assert!(slow.retryable);
//! assert_eq!(slow.to_string(), "Timeout: no result within 300s");
//! ```

use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    Authentication,
    RateLimited,
    InvalidRequest,
    Timeout,
    Transport,
    Unavailable,
    /// The backend ran the prediction and reported it as failed or canceled.
    PredictionFailed,
    EmptyOutput,
    /// Output arrived in a shape that carries no media or text.
    MalformedOutput,
}

impl ProviderErrorKind {
    /// Whether the same request could succeed later without changes.
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            Self::RateLimited | Self::Timeout | Self::Transport | Self::Unavailable | Self::EmptyOutput
        )
    }

    /// Stable label for logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Authentication => "authentication",
            Self::RateLimited => "rate_limited",
            Self::InvalidRequest => "invalid_request",
            Self::Timeout => "timeout",
            Self::Transport => "transport",
            Self::Unavailable => "unavailable",
            Self::PredictionFailed => "prediction_failed",
            Self::EmptyOutput => "empty_output",
            Self::MalformedOutput => "malformed_output",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub message: String,
    pub retryable: bool,
}

impl ProviderError {
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable: kind.is_transient(),
        }
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Authentication, message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::RateLimited, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::InvalidRequest, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Timeout, message)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Transport, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Unavailable, message)
    }

    pub fn prediction_failed(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::PredictionFailed, message)
    }

    pub fn empty_output(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::EmptyOutput, message)
    }

    pub fn malformed_output(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::MalformedOutput, message)
    }
}

impl Display for ProviderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl Error for ProviderError {}
