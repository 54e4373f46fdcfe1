//! Session-layer errors for state, staging and transcript operations.

use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionErrorKind {
    Storage,
    StagingLimitExceeded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionError {
    pub kind: SessionErrorKind,
    pub message: String,
}

impl SessionError {
    pub fn new(kind: SessionErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(SessionErrorKind::Storage, message)
    }

    pub fn staging_limit_exceeded(limit: usize) -> Self {
        Self::new(
            SessionErrorKind::StagingLimitExceeded,
            format!("at most {limit} image(s) can be staged for this model"),
        )
    }

    pub fn is_staging_limit(&self) -> bool {
        self.kind == SessionErrorKind::StagingLimitExceeded
    }
}

impl Display for SessionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl Error for SessionError {}
