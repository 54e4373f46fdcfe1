//! User store trait and in-memory implementation.
//!
//! The store is a key-value collaborator addressed by user identity. Callers must
//! not assume that a write is visible to other processes immediately.

use std::collections::HashMap;
use std::sync::Mutex;

use kcommon::{BoxFuture, UserId};
use kledger::UserAccount;

use crate::error::StoreError;

pub trait UserStore: Send + Sync {
    fn get_user<'a>(
        &'a self,
        id: UserId,
    ) -> BoxFuture<'a, Result<Option<UserAccount>, StoreError>>;

    /// Stores a new record. When a record already exists for the id, the existing
    /// record is returned unchanged.
    fn create_user<'a>(
        &'a self,
        account: UserAccount,
    ) -> BoxFuture<'a, Result<UserAccount, StoreError>>;

    fn update_user<'a>(&'a self, account: UserAccount) -> BoxFuture<'a, Result<(), StoreError>>;
}

#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    users: Mutex<HashMap<UserId, UserAccount>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(accounts: impl IntoIterator<Item = UserAccount>) -> Self {
        let users = accounts
            .into_iter()
            .map(|account| (account.id, account))
            .collect::<HashMap<_, _>>();
        Self {
            users: Mutex::new(users),
        }
    }

    pub fn len(&self) -> Result<usize, StoreError> {
        let users = self
            .users
            .lock()
            .map_err(|_| StoreError::storage("user store lock poisoned"))?;
        Ok(users.len())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }
}

impl UserStore for InMemoryUserStore {
    fn get_user<'a>(
        &'a self,
        id: UserId,
    ) -> BoxFuture<'a, Result<Option<UserAccount>, StoreError>> {
        Box::pin(async move {
            let users = self
                .users
                .lock()
                .map_err(|_| StoreError::storage("user store lock poisoned"))?;

            Ok(users.get(&id).cloned())
        })
    }

    fn create_user<'a>(
        &'a self,
        account: UserAccount,
    ) -> BoxFuture<'a, Result<UserAccount, StoreError>> {
        Box::pin(async move {
            let mut users = self
                .users
                .lock()
                .map_err(|_| StoreError::storage("user store lock poisoned"))?;

            Ok(users.entry(account.id).or_insert(account).clone())
        })
    }

    fn update_user<'a>(&'a self, account: UserAccount) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(async move {
            let mut users = self
                .users
                .lock()
                .map_err(|_| StoreError::storage("user store lock poisoned"))?;

            let Some(slot) = users.get_mut(&account.id) else {
                return Err(StoreError::not_found(format!(
                    "user '{}' does not exist",
                    account.id
                )));
            };
            *slot = account;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::StoreErrorKind;

    fn account(id: i64) -> UserAccount {
        UserAccount::new(UserId::new(id), Utc::now(), 5)
    }

    #[tokio::test]
    async fn create_then_get_returns_stored_record() {
        let store = InMemoryUserStore::new();
        assert!(store.is_empty().expect("len should be readable"));

        let created = store
            .create_user(account(1))
            .await
            .expect("create should succeed");
        let loaded = store
            .get_user(UserId::new(1))
            .await
            .expect("get should succeed");

        assert_eq!(loaded, Some(created));
        assert_eq!(
            store.get_user(UserId::new(2)).await.expect("get should succeed"),
            None
        );
    }

    #[tokio::test]
    async fn create_for_existing_id_keeps_first_record() {
        let store = InMemoryUserStore::new();
        let mut first = account(1);
        first.paid_credits = 40;
        store.create_user(first).await.expect("create should succeed");

        let second = store
            .create_user(account(1))
            .await
            .expect("duplicate create should not fail");

        assert_eq!(second.paid_credits, 40);
        assert_eq!(store.len().expect("len should be readable"), 1);
    }

    #[tokio::test]
    async fn update_replaces_record_and_rejects_unknown_users() {
        let store = InMemoryUserStore::with_users([account(1)]);

        let mut changed = account(1);
        changed.diamonds = 3;
        store
            .update_user(changed.clone())
            .await
            .expect("update should succeed");
        let loaded = store
            .get_user(UserId::new(1))
            .await
            .expect("get should succeed")
            .expect("user should exist");
        assert_eq!(loaded.diamonds, 3);

        let err = store
            .update_user(account(2))
            .await
            .expect_err("unknown user must fail");
        assert_eq!(err.kind, StoreErrorKind::NotFound);
    }
}
