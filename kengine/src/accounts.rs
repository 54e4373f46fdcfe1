//! Serialized access to persisted accounts.
//!
//! Every read-modify-write of an account runs under that user's async lock and
//! starts from the stored record, so two concurrent draws can never spend the
//! same balance twice.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use kcommon::UserId;
use kledger::{Ledger, UserAccount};
use kstore::UserStore;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::error::EngineError;
use crate::types::Sender;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Default)]
pub(crate) struct AccountLocks {
    locks: Mutex<HashMap<UserId, Arc<AsyncMutex<()>>>>,
}

impl AccountLocks {
    pub(crate) async fn lock(&self, user: UserId) -> Result<AccountGuard<'_>, EngineError> {
        let lock = {
            let mut locks = self
                .locks
                .lock()
                .map_err(|_| EngineError::store("account lock table poisoned"))?;
            Arc::clone(locks.entry(user).or_default())
        };
        Ok(AccountGuard {
            locks: self,
            user,
            guard: Some(lock.lock_owned().await),
        })
    }

    /// Drops the user's lock once nobody holds or awaits it.
    fn release(&self, user: UserId) {
        let Ok(mut locks) = self.locks.lock() else {
            return;
        };
        if locks
            .get(&user)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&user);
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.lock().map(|locks| locks.len()).unwrap_or_default()
    }
}

/// Holds one user's account lock.
pub(crate) struct AccountGuard<'a> {
    locks: &'a AccountLocks,
    user: UserId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for AccountGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.locks.release(self.user);
    }
}

/// Result of touching an account on an inbound event.
#[derive(Debug, Clone)]
pub(crate) struct Touched {
    pub account: UserAccount,
    pub created: bool,
}

pub(crate) struct AccountBook {
    store: Arc<dyn UserStore>,
    ledger: Ledger,
    locks: AccountLocks,
}

impl AccountBook {
    pub(crate) fn new(store: Arc<dyn UserStore>, ledger: Ledger) -> Self {
        Self {
            store,
            ledger,
            locks: AccountLocks::default(),
        }
    }

    pub(crate) fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub(crate) async fn find(&self, user: UserId) -> Result<Option<UserAccount>, EngineError> {
        Ok(self.store.get_user(user).await?)
    }

    /// Loads or creates the sender's account and applies the daily free reset.
    /// `referral` only applies to an account created by this call.
    pub(crate) async fn touch(
        &self,
        sender: &Sender,
        referral: Option<UserId>,
        now: DateTime<Utc>,
    ) -> Result<Touched, EngineError> {
        let _guard = self.locks.lock(sender.id).await?;

        let (mut account, created) = match self.store.get_user(sender.id).await? {
            Some(account) => (account, false),
            None => {
                let mut account = self.ledger.new_account(sender.id, now);
                if let Some(referrer) = referral {
                    account = account.with_referrer(referrer);
                }
                if let Some(username) = &sender.username {
                    account = account.with_username(username.clone());
                }
                if let Some(language_code) = &sender.language_code {
                    account = account.with_language_code(language_code.clone());
                }
                (self.store.create_user(account).await?, true)
            }
        };

        if self.ledger.daily_free_reset(&mut account, now) {
            self.store.update_user(account.clone()).await?;
        }

        Ok(Touched { account, created })
    }

    /// Applies `f` to the stored account and persists it when `f` succeeds.
    /// `fallback` stands in when the store has no record yet.
    pub(crate) async fn mutate<R, E>(
        &self,
        user: UserId,
        fallback: Option<&UserAccount>,
        f: impl FnOnce(&Ledger, &mut UserAccount) -> Result<R, E>,
    ) -> Result<Result<(UserAccount, R), E>, EngineError> {
        let _guard = self.locks.lock(user).await?;

        let (mut account, stored) = match self.store.get_user(user).await? {
            Some(account) => (account, true),
            None => {
                let account = fallback.cloned().ok_or_else(|| {
                    EngineError::not_found(format!("user {user} has no account"))
                })?;
                (account, false)
            }
        };

        let value = match f(&self.ledger, &mut account) {
            Ok(value) => value,
            Err(err) => return Ok(Err(err)),
        };

        if stored {
            self.store.update_user(account.clone()).await?;
        } else {
            account = self.store.create_user(account).await?;
        }
        Ok(Ok((account, value)))
    }

    /// [`AccountBook::mutate`] for changes that cannot be refused.
    pub(crate) async fn update(
        &self,
        user: UserId,
        fallback: Option<&UserAccount>,
        f: impl FnOnce(&Ledger, &mut UserAccount),
    ) -> Result<UserAccount, EngineError> {
        let updated = self
            .mutate(user, fallback, |ledger, account| {
                f(ledger, account);
                Ok::<_, Infallible>(())
            })
            .await?;

        match updated {
            Ok((account, ())) => Ok(account),
            Err(never) => match never {},
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use kledger::Currency;
    use kstore::InMemoryUserStore;

    use super::*;

    fn day(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, 9, 30, 0)
            .single()
            .expect("valid timestamp")
    }

    #[tokio::test]
    async fn touch_creates_with_referrer_then_resets_once_per_day() {
        let store = Arc::new(InMemoryUserStore::new());
        let book = AccountBook::new(store.clone(), Ledger::default());
        let sender = Sender::new(UserId::new(10)).with_username("mira");

        let first = book
            .touch(&sender, Some(UserId::new(3)), day(1))
            .await
            .expect("touch should create");
        assert!(first.created);
        assert_eq!(first.account.referrer_id(), Some(UserId::new(3)));
        assert_eq!(first.account.username.as_deref(), Some("mira"));

        book.mutate(sender.id, None, |ledger, account| {
            ledger.draw(account, 5)
        })
        .await
        .expect("store should work")
        .expect("draw should succeed");

        let same_day = book
            .touch(&sender, Some(UserId::new(4)), day(1))
            .await
            .expect("touch should load");
        assert!(!same_day.created);
        assert_eq!(same_day.account.free_credits, 0);
        assert_eq!(same_day.account.referrer_id(), Some(UserId::new(3)));

        let next_day = book
            .touch(&sender, None, day(4))
            .await
            .expect("touch should load");
        assert_eq!(next_day.account.free_credits, 5);
    }

    #[tokio::test]
    async fn failed_mutation_is_not_persisted() {
        let store = Arc::new(InMemoryUserStore::new());
        let book = AccountBook::new(store.clone(), Ledger::default());
        let sender = Sender::new(UserId::new(2));
        book.touch(&sender, None, day(2)).await.expect("touch should create");

        let refused = book
            .mutate(sender.id, None, |ledger, account| {
                ledger.credit(account, 100, Currency::Credits);
                ledger.draw(account, 1_000)
            })
            .await
            .expect("store should work");
        assert!(refused.is_err());

        let stored = store
            .get_user(sender.id)
            .await
            .expect("get should succeed")
            .expect("account should exist");
        assert_eq!(stored.paid_credits, 0);
    }

    #[tokio::test]
    async fn released_locks_leave_the_table() {
        let book = AccountBook::new(Arc::new(InMemoryUserStore::new()), Ledger::default());
        for id in 1..=3 {
            book.touch(&Sender::new(UserId::new(id)), None, day(3))
                .await
                .expect("touch should create");
        }
        assert_eq!(book.locks.len(), 0);

        let held = book.locks.lock(UserId::new(1)).await.expect("lock should succeed");
        assert_eq!(book.locks.len(), 1);
        drop(held);
        assert_eq!(book.locks.len(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_draws_never_share_a_balance() {
        let store = Arc::new(InMemoryUserStore::new());
        let book = Arc::new(AccountBook::new(store.clone(), Ledger::default()));
        let sender = Sender::new(UserId::new(8));
        book.touch(&sender, None, day(3)).await.expect("touch should create");

        let draws = (0..8)
            .map(|_| {
                let book = Arc::clone(&book);
                tokio::spawn(async move {
                    book.mutate(UserId::new(8), None, |ledger, account| ledger.draw(account, 1))
                        .await
                        .expect("store should work")
                        .is_ok()
                })
            })
            .collect::<Vec<_>>();

        let mut granted = 0;
        for draw in draws {
            if draw.await.expect("draw task should join") {
                granted += 1;
            }
        }
        assert_eq!(granted, 5);
        assert_eq!(book.locks.len(), 0);
    }

    #[tokio::test]
    async fn mutate_without_record_or_fallback_is_not_found() {
        let book = AccountBook::new(Arc::new(InMemoryUserStore::new()), Ledger::default());
        let err = book
            .mutate(UserId::new(99), None, |_, _| Ok::<_, Infallible>(()))
            .await
            .expect_err("missing account must fail");
        assert!(err.is_not_found());
    }
}
