//! Process-wide conversation state keyed by user.
//!
//! ```rust
//! use kcommon::UserId;
//! use ksession::{ConversationState, SessionStore};
//!
//! let sessions = SessionStore::new();
//! let user = UserId::new(3);
//!
//! assert_eq!(sessions.get(user).expect("read"), ConversationState::Idle);
//! sessions.set(user, ConversationState::AwaitingExchangeAmount).expect("write");
//! let moved = sessions
//!     .transition_if(
//!         user,
//!         |state| matches!(state, ConversationState::AwaitingExchangeAmount),
//!         ConversationState::Idle,
//!     )
//!     .expect("transition");
//! assert!(moved);
//! ```

use kcommon::UserId;

use crate::error::SessionError;
use crate::keyed::KeyedCells;
use crate::state::ConversationState;

#[derive(Debug)]
pub struct SessionStore {
    states: KeyedCells<ConversationState>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            states: KeyedCells::new("session"),
        }
    }

    /// Current state, `Idle` when the user has none.
    pub fn get(&self, user: UserId) -> Result<ConversationState, SessionError> {
        self.states.with(user, |state| state.clone())
    }

    pub fn set(&self, user: UserId, next: ConversationState) -> Result<(), SessionError> {
        self.states.with(user, |state| *state = next)
    }

    pub fn clear(&self, user: UserId) -> Result<(), SessionError> {
        self.set(user, ConversationState::Idle)
    }

    /// Runs `f` under the user's lock.
    pub fn update<R>(
        &self,
        user: UserId,
        f: impl FnOnce(&mut ConversationState) -> R,
    ) -> Result<R, SessionError> {
        self.states.with(user, f)
    }

    /// Moves to `next` only if `predicate` holds for the current state.
    pub fn transition_if(
        &self,
        user: UserId,
        predicate: impl FnOnce(&ConversationState) -> bool,
        next: ConversationState,
    ) -> Result<bool, SessionError> {
        self.states.with(user, |state| {
            if predicate(state) {
                *state = next;
                true
            } else {
                false
            }
        })
    }

    /// Resets to `Idle` and returns the previous state if `predicate` holds.
    pub fn take_if(
        &self,
        user: UserId,
        predicate: impl FnOnce(&ConversationState) -> bool,
    ) -> Result<Option<ConversationState>, SessionError> {
        self.states.with(user, |state| {
            if predicate(state) {
                Some(std::mem::take(state))
            } else {
                None
            }
        })
    }
}
