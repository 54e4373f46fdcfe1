//! Metrics-based engine hooks.
//!
//! ```rust
//! use kengine::EngineHooks;
//! use kobserve::MetricsEngineHooks;
//!
//! fn accepts_engine_hooks(_hooks: &dyn EngineHooks) {}
//!
//! let hooks = MetricsEngineHooks;
//! accepts_engine_hooks(&hooks);
//! ```

use std::time::Duration;

use kcommon::UserId;
use kengine::{CreditSource, DispatchPhase, EngineHooks, ResetReason};
use kledger::{Cost, Currency, ReferralBonus};
use kprovider::ProviderError;

#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsEngineHooks;

impl EngineHooks for MetricsEngineHooks {
    fn on_preflight_rejected(&self, _user: UserId, model_id: &str, cost: Cost, _available: u64) {
        metrics::counter!(
            "kiln_dispatch_preflight_rejected_total",
            "model" => model_id.to_string(),
            "currency" => cost.currency.to_string()
        )
        .increment(1);
    }

    fn on_phase(&self, _user: UserId, model_id: &str, phase: DispatchPhase) {
        metrics::counter!(
            "kiln_dispatch_phase_total",
            "model" => model_id.to_string(),
            "phase" => phase.as_str()
        )
        .increment(1);
    }

    fn on_dispatch_success(&self, _user: UserId, model_id: &str, outputs: usize, elapsed: Duration) {
        metrics::counter!(
            "kiln_dispatch_success_total",
            "model" => model_id.to_string()
        )
        .increment(1);
        metrics::histogram!(
            "kiln_dispatch_latency_seconds",
            "model" => model_id.to_string(),
            "outcome" => "success"
        )
        .record(elapsed.as_secs_f64());
        metrics::histogram!(
            "kiln_dispatch_outputs",
            "model" => model_id.to_string()
        )
        .record(outputs as f64);
    }

    fn on_dispatch_failure(
        &self,
        _user: UserId,
        model_id: &str,
        error: &ProviderError,
        elapsed: Duration,
    ) {
        metrics::counter!(
            "kiln_dispatch_failure_total",
            "model" => model_id.to_string(),
            "error_kind" => error.kind.as_str()
        )
        .increment(1);
        metrics::histogram!(
            "kiln_dispatch_latency_seconds",
            "model" => model_id.to_string(),
            "outcome" => "failure"
        )
        .record(elapsed.as_secs_f64());
    }

    fn on_settled(&self, _user: UserId, model_id: &str, cost: Cost) {
        metrics::counter!(
            "kiln_ledger_settled_total",
            "model" => model_id.to_string(),
            "currency" => cost.currency.to_string()
        )
        .increment(1);
        metrics::counter!(
            "kiln_ledger_spent_total",
            "currency" => cost.currency.to_string()
        )
        .increment(u64::from(cost.amount));
    }

    fn on_settlement_withheld(&self, _user: UserId, model_id: &str, cost: Cost, _available: u64) {
        metrics::counter!(
            "kiln_ledger_withheld_total",
            "model" => model_id.to_string(),
            "currency" => cost.currency.to_string()
        )
        .increment(1);
    }

    fn on_referral_bonus(&self, _bonus: &ReferralBonus) {
        metrics::counter!("kiln_ledger_referral_bonus_total").increment(1);
    }

    fn on_state_reset(&self, _user: UserId, reason: ResetReason) {
        metrics::counter!(
            "kiln_session_reset_total",
            "reason" => reason.as_str()
        )
        .increment(1);
    }

    fn on_credit(&self, _user: UserId, amount: u32, currency: Currency, source: CreditSource) {
        metrics::counter!(
            "kiln_ledger_credited_total",
            "currency" => currency.to_string(),
            "source" => source.as_str()
        )
        .increment(u64::from(amount));
    }
}
