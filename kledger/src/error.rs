//! Ledger errors for refused draws and malformed amounts.

use std::error::Error;
use std::fmt::{Display, Formatter};

use crate::Currency;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerErrorKind {
    InsufficientFunds,
    InvalidAmount,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerError {
    pub kind: LedgerErrorKind,
    pub message: String,
}

impl LedgerError {
    pub fn new(kind: LedgerErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn insufficient_funds(currency: Currency, required: u64, available: u64) -> Self {
        Self::new(
            LedgerErrorKind::InsufficientFunds,
            format!("{currency} balance {available} does not cover cost {required}"),
        )
    }

    pub fn invalid_amount(message: impl Into<String>) -> Self {
        Self::new(LedgerErrorKind::InvalidAmount, message)
    }

    pub fn is_insufficient_funds(&self) -> bool {
        self.kind == LedgerErrorKind::InsufficientFunds
    }
}

impl Display for LedgerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl Error for LedgerError {}
