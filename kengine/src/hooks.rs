//! Lifecycle hooks for observing dispatch, settlement and session resets.
//!
//! ```rust
//! use kengine::{EngineHooks, NoopEngineHooks};
//!
//! fn accepts_hooks(_hooks: &dyn EngineHooks) {}
//!
//! let hooks = NoopEngineHooks;
//! accepts_hooks(&hooks);
//! ```

use std::time::Duration;

use kcommon::UserId;
use kledger::{Cost, Currency, ReferralBonus};
use kprovider::ProviderError;

/// Position of one submission in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DispatchPhase {
    PreflightChecked,
    Dispatched,
    Settled,
    Failed,
}

impl DispatchPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PreflightChecked => "preflight_checked",
            Self::Dispatched => "dispatched",
            Self::Settled => "settled",
            Self::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResetReason {
    StaleState,
    Cancelled,
}

impl ResetReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::StaleState => "stale_state",
            Self::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CreditSource {
    Payment,
    Admin,
    Referral,
    Exchange,
}

impl CreditSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Payment => "payment",
            Self::Admin => "admin",
            Self::Referral => "referral",
            Self::Exchange => "exchange",
        }
    }
}

pub trait EngineHooks: Send + Sync {
    fn on_request_assembled(&self, _user: UserId, _model_id: &str, _cost: Cost) {}

    fn on_preflight_rejected(&self, _user: UserId, _model_id: &str, _cost: Cost, _available: u64) {}

    fn on_phase(&self, _user: UserId, _model_id: &str, _phase: DispatchPhase) {}

    fn on_dispatch_success(
        &self,
        _user: UserId,
        _model_id: &str,
        _outputs: usize,
        _elapsed: Duration,
    ) {
    }

    fn on_dispatch_failure(
        &self,
        _user: UserId,
        _model_id: &str,
        _error: &ProviderError,
        _elapsed: Duration,
    ) {
    }

    fn on_settled(&self, _user: UserId, _model_id: &str, _cost: Cost) {}

    fn on_settlement_withheld(&self, _user: UserId, _model_id: &str, _cost: Cost, _available: u64) {
    }

    fn on_referral_bonus(&self, _bonus: &ReferralBonus) {}

    fn on_state_reset(&self, _user: UserId, _reason: ResetReason) {}

    fn on_credit(&self, _user: UserId, _amount: u32, _currency: Currency, _source: CreditSource) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEngineHooks;

impl EngineHooks for NoopEngineHooks {}
