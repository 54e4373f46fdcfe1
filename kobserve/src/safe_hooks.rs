use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Duration;

use kcommon::UserId;
use kengine::{CreditSource, DispatchPhase, EngineHooks, ResetReason};
use kledger::{Cost, Currency, ReferralBonus};
use kprovider::ProviderError;

/// Swallows panics raised by the wrapped hooks so observers never break a turn.
pub struct SafeEngineHooks<H> {
    inner: H,
}

impl<H> SafeEngineHooks<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }
}

impl<H> EngineHooks for SafeEngineHooks<H>
where
    H: EngineHooks,
{
    fn on_request_assembled(&self, user: UserId, model_id: &str, cost: Cost) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_request_assembled(user, model_id, cost)
        }));
    }

    fn on_preflight_rejected(&self, user: UserId, model_id: &str, cost: Cost, available: u64) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner
                .on_preflight_rejected(user, model_id, cost, available)
        }));
    }

    fn on_phase(&self, user: UserId, model_id: &str, phase: DispatchPhase) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_phase(user, model_id, phase)
        }));
    }

    fn on_dispatch_success(&self, user: UserId, model_id: &str, outputs: usize, elapsed: Duration) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner
                .on_dispatch_success(user, model_id, outputs, elapsed)
        }));
    }

    fn on_dispatch_failure(
        &self,
        user: UserId,
        model_id: &str,
        error: &ProviderError,
        elapsed: Duration,
    ) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner
                .on_dispatch_failure(user, model_id, error, elapsed)
        }));
    }

    fn on_settled(&self, user: UserId, model_id: &str, cost: Cost) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_settled(user, model_id, cost)
        }));
    }

    fn on_settlement_withheld(&self, user: UserId, model_id: &str, cost: Cost, available: u64) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner
                .on_settlement_withheld(user, model_id, cost, available)
        }));
    }

    fn on_referral_bonus(&self, bonus: &ReferralBonus) {
        let _ = catch_unwind(AssertUnwindSafe(|| self.inner.on_referral_bonus(bonus)));
    }

    fn on_state_reset(&self, user: UserId, reason: ResetReason) {
        let _ = catch_unwind(AssertUnwindSafe(|| self.inner.on_state_reset(user, reason)));
    }

    fn on_credit(&self, user: UserId, amount: u32, currency: Currency, source: CreditSource) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_credit(user, amount, currency, source)
        }));
    }
}

/// Forwards every callback to each hook in registration order.
#[derive(Default, Clone)]
pub struct FanoutEngineHooks {
    hooks: Vec<Arc<dyn EngineHooks>>,
}

impl FanoutEngineHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, hooks: Arc<dyn EngineHooks>) -> Self {
        self.hooks.push(hooks);
        self
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

impl EngineHooks for FanoutEngineHooks {
    fn on_request_assembled(&self, user: UserId, model_id: &str, cost: Cost) {
        for hooks in &self.hooks {
            hooks.on_request_assembled(user, model_id, cost);
        }
    }

    fn on_preflight_rejected(&self, user: UserId, model_id: &str, cost: Cost, available: u64) {
        for hooks in &self.hooks {
            hooks.on_preflight_rejected(user, model_id, cost, available);
        }
    }

    fn on_phase(&self, user: UserId, model_id: &str, phase: DispatchPhase) {
        for hooks in &self.hooks {
            hooks.on_phase(user, model_id, phase);
        }
    }

    fn on_dispatch_success(&self, user: UserId, model_id: &str, outputs: usize, elapsed: Duration) {
        for hooks in &self.hooks {
            hooks.on_dispatch_success(user, model_id, outputs, elapsed);
        }
    }

    fn on_dispatch_failure(
        &self,
        user: UserId,
        model_id: &str,
        error: &ProviderError,
        elapsed: Duration,
    ) {
        for hooks in &self.hooks {
            hooks.on_dispatch_failure(user, model_id, error, elapsed);
        }
    }

    fn on_settled(&self, user: UserId, model_id: &str, cost: Cost) {
        for hooks in &self.hooks {
            hooks.on_settled(user, model_id, cost);
        }
    }

    fn on_settlement_withheld(&self, user: UserId, model_id: &str, cost: Cost, available: u64) {
        for hooks in &self.hooks {
            hooks.on_settlement_withheld(user, model_id, cost, available);
        }
    }

    fn on_referral_bonus(&self, bonus: &ReferralBonus) {
        for hooks in &self.hooks {
            hooks.on_referral_bonus(bonus);
        }
    }

    fn on_state_reset(&self, user: UserId, reason: ResetReason) {
        for hooks in &self.hooks {
            hooks.on_state_reset(user, reason);
        }
    }

    fn on_credit(&self, user: UserId, amount: u32, currency: Currency, source: CreditSource) {
        for hooks in &self.hooks {
            hooks.on_credit(user, amount, currency, source);
        }
    }
}
