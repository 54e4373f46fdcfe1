//! Dual-currency ledger operations over a user account.
//!
//! Credits are held as a free sub-balance that is re-granted once per UTC day and a
//! paid sub-balance that only grows through top-ups. Draws always spend free credits
//! first. Diamonds are a separate balance and never mix with credits in one draw.
//!
//! ```rust
//! use chrono::Utc;
//! use kcommon::UserId;
//! use kledger::{Ledger, UserAccount};
//!
//! let ledger = Ledger::default();
//! let mut account = UserAccount::new(UserId::new(1), Utc::now(), 3);
//! account.paid_credits = 10;
//!
//! ledger.draw(&mut account, 5).expect("balance should cover the draw");
//! assert_eq!((account.free_credits, account.paid_credits), (0, 8));
//! ```

use chrono::{DateTime, Utc};
use kcommon::UserId;

use crate::account::{Cost, Currency, UserAccount};
use crate::error::LedgerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerPolicy {
    pub daily_free_grant: u32,
    pub referral_threshold: u32,
    pub referral_bonus: u32,
    /// Credits charged per diamond when exchanging.
    pub diamond_exchange_rate: u32,
}

impl Default for LedgerPolicy {
    fn default() -> Self {
        Self {
            daily_free_grant: 5,
            referral_threshold: 2,
            referral_bonus: 5,
            diamond_exchange_rate: 20,
        }
    }
}

impl LedgerPolicy {
    pub fn with_daily_free_grant(mut self, grant: u32) -> Self {
        self.daily_free_grant = grant;
        self
    }

    pub fn with_referral_bonus(mut self, bonus: u32) -> Self {
        self.referral_bonus = bonus;
        self
    }

    pub fn with_diamond_exchange_rate(mut self, rate: u32) -> Self {
        self.diamond_exchange_rate = rate;
        self
    }
}

/// Bonus owed to a referrer after the referred user's counter hit the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferralBonus {
    pub referrer: UserId,
    pub referred: UserId,
    pub amount: u32,
}

#[derive(Debug, Clone, Default)]
pub struct Ledger {
    policy: LedgerPolicy,
}

impl Ledger {
    pub fn new(policy: LedgerPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &LedgerPolicy {
        &self.policy
    }

    pub fn new_account(&self, id: UserId, now: DateTime<Utc>) -> UserAccount {
        UserAccount::new(id, now, self.policy.daily_free_grant)
    }

    pub fn affordable(&self, user: &UserAccount, cost: u32) -> bool {
        user.total_credits() >= u64::from(cost)
    }

    pub fn draw(&self, user: &mut UserAccount, cost: u32) -> Result<(), LedgerError> {
        if !self.affordable(user, cost) {
            return Err(LedgerError::insufficient_funds(
                Currency::Credits,
                u64::from(cost),
                user.total_credits(),
            ));
        }

        let from_free = cost.min(user.free_credits);
        user.free_credits -= from_free;
        user.paid_credits -= cost - from_free;
        Ok(())
    }

    pub fn affordable_diamonds(&self, user: &UserAccount, cost: u32) -> bool {
        user.diamonds >= cost
    }

    pub fn draw_diamonds(&self, user: &mut UserAccount, cost: u32) -> Result<(), LedgerError> {
        if !self.affordable_diamonds(user, cost) {
            return Err(LedgerError::insufficient_funds(
                Currency::Diamonds,
                u64::from(cost),
                u64::from(user.diamonds),
            ));
        }

        user.diamonds -= cost;
        Ok(())
    }

    pub fn can_cover(&self, user: &UserAccount, cost: Cost) -> bool {
        match cost.currency {
            Currency::Credits => self.affordable(user, cost.amount),
            Currency::Diamonds => self.affordable_diamonds(user, cost.amount),
        }
    }

    /// Draws `cost` from the balance named by its currency.
    pub fn charge(&self, user: &mut UserAccount, cost: Cost) -> Result<(), LedgerError> {
        match cost.currency {
            Currency::Credits => self.draw(user, cost.amount),
            Currency::Diamonds => self.draw_diamonds(user, cost.amount),
        }
    }

    /// Credits land on the paid balance; diamonds on the diamond balance.
    pub fn credit(&self, user: &mut UserAccount, amount: u32, currency: Currency) {
        match currency {
            Currency::Credits => user.paid_credits = user.paid_credits.saturating_add(amount),
            Currency::Diamonds => user.diamonds = user.diamonds.saturating_add(amount),
        }
    }

    /// Re-grants free credits when `now` falls on a different UTC day than the last
    /// reset. Missed days are not accumulated. Returns whether the account changed.
    pub fn daily_free_reset(&self, user: &mut UserAccount, now: DateTime<Utc>) -> bool {
        if user.last_free_reset.date_naive() == now.date_naive() {
            return false;
        }

        user.free_credits = self.policy.daily_free_grant;
        user.last_free_reset = now;
        true
    }

    /// Counts one settled generation and reports the referral bonus when the counter
    /// lands exactly on the threshold.
    pub fn record_generation(&self, user: &mut UserAccount) -> Option<ReferralBonus> {
        user.generated_image_count = user.generated_image_count.saturating_add(1);
        self.referral_bonus_due(user)
    }

    pub fn referral_bonus_due(&self, user: &UserAccount) -> Option<ReferralBonus> {
        if user.generated_image_count != self.policy.referral_threshold {
            return None;
        }

        user.referrer_id().map(|referrer| ReferralBonus {
            referrer,
            referred: user.id,
            amount: self.policy.referral_bonus,
        })
    }

    pub fn apply_referral_bonus(&self, referrer: &mut UserAccount, bonus: &ReferralBonus) {
        self.credit(referrer, bonus.amount, Currency::Credits);
    }

    /// Converts credits into diamonds at the policy rate. Either both sides move or
    /// neither does.
    pub fn exchange_for_diamonds(
        &self,
        user: &mut UserAccount,
        diamonds: u32,
    ) -> Result<Cost, LedgerError> {
        if diamonds == 0 {
            return Err(LedgerError::invalid_amount(
                "diamond amount must be greater than zero",
            ));
        }

        let price = diamonds
            .checked_mul(self.policy.diamond_exchange_rate)
            .ok_or_else(|| LedgerError::invalid_amount("diamond amount is too large"))?;

        self.draw(user, price)?;
        self.credit(user, diamonds, Currency::Diamonds);
        Ok(Cost::credits(price))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::LedgerErrorKind;

    fn noon(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, day, 12, 0, 0)
            .single()
            .expect("valid timestamp")
    }

    fn account_with(free: u32, paid: u32) -> UserAccount {
        let mut account = UserAccount::new(UserId::new(1), noon(10), free);
        account.paid_credits = paid;
        account
    }

    #[test]
    fn draw_spends_free_credits_before_paid() {
        let ledger = Ledger::default();
        let mut account = account_with(3, 10);

        ledger.draw(&mut account, 5).expect("draw should succeed");

        assert_eq!(account.free_credits, 0);
        assert_eq!(account.paid_credits, 8);
    }

    #[test]
    fn draw_covered_by_free_credits_leaves_paid_untouched() {
        let ledger = Ledger::default();
        let mut account = account_with(5, 4);

        ledger.draw(&mut account, 2).expect("draw should succeed");

        assert_eq!((account.free_credits, account.paid_credits), (3, 4));
    }

    #[test]
    fn draw_beyond_total_balance_changes_nothing() {
        let ledger = Ledger::default();
        let mut account = account_with(2, 3);
        let before = account.clone();

        let err = ledger
            .draw(&mut account, 6)
            .expect_err("draw beyond balance must fail");

        assert_eq!(err.kind, LedgerErrorKind::InsufficientFunds);
        assert_eq!(account, before);
    }

    #[test]
    fn draw_of_exact_balance_empties_both_sub_balances() {
        let ledger = Ledger::default();
        let mut account = account_with(2, 3);

        ledger.draw(&mut account, 5).expect("exact draw should succeed");

        assert_eq!((account.free_credits, account.paid_credits), (0, 0));
        assert!(!ledger.affordable(&account, 1));
        assert!(ledger.affordable(&account, 0));
    }

    #[test]
    fn balances_never_go_negative_across_mixed_operations() {
        let ledger = Ledger::default();
        let mut account = account_with(1, 1);

        for cost in [1, 5, 1, 1, 3] {
            let _ = ledger.draw(&mut account, cost);
            let _ = ledger.draw_diamonds(&mut account, cost);
            assert!(account.total_credits() <= 2);
        }
        ledger.credit(&mut account, u32::MAX, Currency::Credits);
        ledger.credit(&mut account, 1, Currency::Credits);

        assert_eq!(account.paid_credits, u32::MAX);
        assert_eq!(account.free_credits, 0);
    }

    #[test]
    fn diamonds_are_a_separate_currency() {
        let ledger = Ledger::default();
        let mut account = account_with(50, 50);
        account.diamonds = 2;

        let err = ledger
            .draw_diamonds(&mut account, 3)
            .expect_err("credits must not cover diamonds");
        assert_eq!(err.kind, LedgerErrorKind::InsufficientFunds);
        assert_eq!(account.diamonds, 2);
        assert_eq!(account.total_credits(), 100);

        ledger
            .charge(&mut account, Cost::diamonds(2))
            .expect("diamond charge should succeed");
        assert_eq!(account.diamonds, 0);
        assert_eq!(account.total_credits(), 100);
    }

    #[test]
    fn credit_adds_to_paid_or_diamond_balance() {
        let ledger = Ledger::default();
        let mut account = account_with(5, 0);

        ledger.credit(&mut account, 12, Currency::Credits);
        ledger.credit(&mut account, 3, Currency::Diamonds);

        assert_eq!(account.paid_credits, 12);
        assert_eq!(account.free_credits, 5);
        assert_eq!(account.diamonds, 3);
    }

    #[test]
    fn daily_reset_applies_once_per_utc_day() {
        let ledger = Ledger::default();
        let mut account = account_with(0, 0);
        account.last_free_reset = noon(9);

        assert!(ledger.daily_free_reset(&mut account, noon(10)));
        assert_eq!(account.free_credits, 5);
        assert_eq!(account.last_free_reset, noon(10));

        ledger.draw(&mut account, 4).expect("draw should succeed");
        assert!(!ledger.daily_free_reset(&mut account, noon(10) + Duration::hours(11)));
        assert_eq!(account.free_credits, 1);
    }

    #[test]
    fn daily_reset_after_many_idle_days_grants_once() {
        let ledger = Ledger::new(LedgerPolicy::default().with_daily_free_grant(7));
        let mut account = account_with(2, 0);
        account.last_free_reset = noon(1);

        assert!(ledger.daily_free_reset(&mut account, noon(20)));
        assert_eq!(account.free_credits, 7);
    }

    #[test]
    fn referral_bonus_fires_exactly_at_threshold() {
        let ledger = Ledger::default();
        let referrer_id = UserId::new(900);
        let mut referrer = UserAccount::new(referrer_id, noon(10), 5);
        let mut referred = account_with(5, 0).with_referrer(referrer_id);
        referred.generated_image_count = 1;

        let mut bonuses = Vec::new();
        for _ in 0..2 {
            if let Some(bonus) = ledger.record_generation(&mut referred) {
                ledger.apply_referral_bonus(&mut referrer, &bonus);
                bonuses.push(bonus);
            }
        }

        assert_eq!(referred.generated_image_count, 3);
        assert_eq!(bonuses.len(), 1);
        assert_eq!(bonuses[0].referred, UserId::new(1));
        assert_eq!(referrer.paid_credits, 5);
    }

    #[test]
    fn referral_bonus_requires_a_referrer() {
        let ledger = Ledger::default();
        let mut account = account_with(5, 0);
        account.generated_image_count = 1;

        assert_eq!(ledger.record_generation(&mut account), None);
        assert_eq!(account.generated_image_count, 2);
    }

    #[test]
    fn exchange_moves_credits_into_diamonds_atomically() {
        let ledger = Ledger::default();
        let mut account = account_with(5, 40);

        let price = ledger
            .exchange_for_diamonds(&mut account, 2)
            .expect("exchange should succeed");
        assert_eq!(price, Cost::credits(40));
        assert_eq!((account.free_credits, account.paid_credits), (0, 5));
        assert_eq!(account.diamonds, 2);

        let before = account.clone();
        let err = ledger
            .exchange_for_diamonds(&mut account, 1)
            .expect_err("exchange beyond balance must fail");
        assert!(err.is_insufficient_funds());
        assert_eq!(account, before);

        let err = ledger
            .exchange_for_diamonds(&mut account, 0)
            .expect_err("zero diamonds must fail");
        assert_eq!(err.kind, LedgerErrorKind::InvalidAmount);
    }
}
