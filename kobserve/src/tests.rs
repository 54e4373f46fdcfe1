use std::sync::{Arc, Mutex};
use std::time::Duration;

use kcommon::UserId;
use kengine::{CreditSource, DispatchPhase, EngineHooks, ResetReason};
use kledger::{Cost, Currency, ReferralBonus};
use kprovider::ProviderError;

use crate::{FanoutEngineHooks, MetricsEngineHooks, SafeEngineHooks, TracingEngineHooks};

fn sample_bonus() -> ReferralBonus {
    ReferralBonus {
        referrer: UserId::new(1),
        referred: UserId::new(2),
        amount: 5,
    }
}

fn exercise(hooks: &dyn EngineHooks) {
    let user = UserId::new(2);
    let error = ProviderError::timeout("no result within 300s");

    hooks.on_request_assembled(user, "flux", Cost::credits(2));
    hooks.on_preflight_rejected(user, "kling", Cost::diamonds(1), 0);
    hooks.on_phase(user, "flux", DispatchPhase::PreflightChecked);
    hooks.on_phase(user, "flux", DispatchPhase::Dispatched);
    hooks.on_dispatch_success(user, "flux", 2, Duration::from_millis(40));
    hooks.on_dispatch_failure(user, "flux", &error, Duration::from_secs(300));
    hooks.on_settled(user, "flux", Cost::credits(2));
    hooks.on_settlement_withheld(user, "flux", Cost::credits(2), 1);
    hooks.on_referral_bonus(&sample_bonus());
    hooks.on_state_reset(user, ResetReason::StaleState);
    hooks.on_credit(user, 100, Currency::Credits, CreditSource::Payment);
}

#[test]
fn tracing_hooks_smoke_test_all_callbacks() {
    exercise(&TracingEngineHooks);
}

#[test]
fn metrics_hooks_smoke_test_all_callbacks() {
    exercise(&MetricsEngineHooks);
}

#[derive(Default, Clone)]
struct RecordingHooks {
    events: Arc<Mutex<Vec<&'static str>>>,
}

impl EngineHooks for RecordingHooks {
    fn on_phase(&self, _user: UserId, _model_id: &str, phase: DispatchPhase) {
        self.events.lock().expect("events lock").push(phase.as_str());
    }

    fn on_referral_bonus(&self, _bonus: &ReferralBonus) {
        self.events.lock().expect("events lock").push("referral");
    }

    fn on_state_reset(&self, _user: UserId, reason: ResetReason) {
        self.events.lock().expect("events lock").push(reason.as_str());
    }
}

struct PanickingHooks;

impl EngineHooks for PanickingHooks {
    fn on_phase(&self, _user: UserId, _model_id: &str, _phase: DispatchPhase) {
        panic!("phase hook panic");
    }

    fn on_credit(&self, _user: UserId, _amount: u32, _currency: Currency, _source: CreditSource) {
        panic!("credit hook panic");
    }
}

#[test]
fn safe_hooks_forward_callbacks() {
    let recording = RecordingHooks::default();
    let safe = SafeEngineHooks::new(recording.clone());

    safe.on_phase(UserId::new(2), "flux", DispatchPhase::Settled);
    safe.on_referral_bonus(&sample_bonus());
    safe.on_state_reset(UserId::new(2), ResetReason::Cancelled);

    let events = recording.events.lock().expect("events lock").clone();
    assert_eq!(events, vec!["settled", "referral", "cancelled"]);
}

#[test]
fn safe_hooks_swallow_panics() {
    let safe = SafeEngineHooks::new(PanickingHooks);

    safe.on_phase(UserId::new(2), "flux", DispatchPhase::Failed);
    safe.on_credit(UserId::new(2), 5, Currency::Credits, CreditSource::Admin);
}

#[test]
fn fanout_reaches_every_registered_hook_in_order() {
    let first = RecordingHooks::default();
    let second = RecordingHooks::default();
    let fanout = FanoutEngineHooks::new()
        .with(Arc::new(first.clone()))
        .with(Arc::new(second.clone()));
    assert_eq!(fanout.len(), 2);

    fanout.on_phase(UserId::new(3), "kontext", DispatchPhase::Dispatched);
    fanout.on_state_reset(UserId::new(3), ResetReason::StaleState);

    for recording in [first, second] {
        let events = recording.events.lock().expect("events lock").clone();
        assert_eq!(events, vec!["dispatched", "stale_state"]);
    }
}

#[test]
fn safe_fanout_keeps_later_hooks_running_after_a_panic() {
    let recording = RecordingHooks::default();
    let fanout = FanoutEngineHooks::new()
        .with(Arc::new(SafeEngineHooks::new(PanickingHooks)))
        .with(Arc::new(recording.clone()));

    fanout.on_phase(UserId::new(4), "flux", DispatchPhase::PreflightChecked);

    let events = recording.events.lock().expect("events lock").clone();
    assert_eq!(events, vec!["preflight_checked"]);
}
