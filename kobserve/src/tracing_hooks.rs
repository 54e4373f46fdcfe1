//! Tracing-based engine hooks for dispatch, settlement and session events.
//!
//! ```rust
//! use kengine::EngineHooks;
//! use kobserve::TracingEngineHooks;
//!
//! fn accepts_engine_hooks(_hooks: &dyn EngineHooks) {}
//!
//! let hooks = TracingEngineHooks;
//! accepts_engine_hooks(&hooks);
//! ```

use std::time::Duration;

use kcommon::UserId;
use kengine::{CreditSource, DispatchPhase, EngineHooks, ResetReason};
use kledger::{Cost, Currency, ReferralBonus};
use kprovider::ProviderError;

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEngineHooks;

impl EngineHooks for TracingEngineHooks {
    fn on_request_assembled(&self, user: UserId, model_id: &str, cost: Cost) {
        tracing::debug!(
            phase = "dispatch",
            event = "request_assembled",
            user_id = %user,
            model_id,
            cost = cost.amount,
            currency = %cost.currency
        );
    }

    fn on_preflight_rejected(&self, user: UserId, model_id: &str, cost: Cost, available: u64) {
        tracing::info!(
            phase = "dispatch",
            event = "preflight_rejected",
            user_id = %user,
            model_id,
            cost = cost.amount,
            currency = %cost.currency,
            available
        );
    }

    fn on_phase(&self, user: UserId, model_id: &str, phase: DispatchPhase) {
        tracing::debug!(
            phase = "dispatch",
            event = phase.as_str(),
            user_id = %user,
            model_id
        );
    }

    fn on_dispatch_success(&self, user: UserId, model_id: &str, outputs: usize, elapsed: Duration) {
        tracing::info!(
            phase = "dispatch",
            event = "success",
            user_id = %user,
            model_id,
            outputs,
            elapsed_ms = elapsed.as_millis() as u64
        );
    }

    fn on_dispatch_failure(
        &self,
        user: UserId,
        model_id: &str,
        error: &ProviderError,
        elapsed: Duration,
    ) {
        tracing::error!(
            phase = "dispatch",
            event = "failure",
            user_id = %user,
            model_id,
            error_kind = error.kind.as_str(),
            retryable = error.retryable,
            elapsed_ms = elapsed.as_millis() as u64,
            error = %error
        );
    }

    fn on_settled(&self, user: UserId, model_id: &str, cost: Cost) {
        tracing::info!(
            phase = "ledger",
            event = "settled",
            user_id = %user,
            model_id,
            cost = cost.amount,
            currency = %cost.currency
        );
    }

    fn on_settlement_withheld(&self, user: UserId, model_id: &str, cost: Cost, available: u64) {
        tracing::warn!(
            phase = "ledger",
            event = "settlement_withheld",
            user_id = %user,
            model_id,
            cost = cost.amount,
            currency = %cost.currency,
            available
        );
    }

    fn on_referral_bonus(&self, bonus: &ReferralBonus) {
        tracing::info!(
            phase = "ledger",
            event = "referral_bonus",
            referrer = %bonus.referrer,
            referred = %bonus.referred,
            amount = bonus.amount
        );
    }

    fn on_state_reset(&self, user: UserId, reason: ResetReason) {
        tracing::info!(
            phase = "session",
            event = "reset",
            user_id = %user,
            reason = reason.as_str()
        );
    }

    fn on_credit(&self, user: UserId, amount: u32, currency: Currency, source: CreditSource) {
        tracing::info!(
            phase = "ledger",
            event = "credit",
            user_id = %user,
            amount,
            currency = %currency,
            source = source.as_str()
        );
    }
}
