//! Chat-mode history storage with a bounded in-memory implementation.

use std::collections::{HashMap, VecDeque};
use std::fmt::{Display, Formatter};
use std::sync::Mutex;

use kcommon::{BoxFuture, UserId};

use crate::error::SessionError;

pub const DEFAULT_TRANSCRIPT_CAPACITY: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Model,
}

impl Display for ChatRole {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => f.write_str("User"),
            Self::Model => f.write_str("Model"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEntry {
    pub role: ChatRole,
    pub content: String,
}

impl ChatEntry {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn model(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Model,
            content: content.into(),
        }
    }
}

/// Renders entries as `Role: content` lines for a completion prompt.
pub fn format_history(entries: &[ChatEntry]) -> String {
    entries
        .iter()
        .map(|entry| format!("{}: {}", entry.role, entry.content))
        .collect::<Vec<_>>()
        .join("\n")
}

pub trait TranscriptStore: Send + Sync {
    fn load_entries<'a>(
        &'a self,
        user: UserId,
    ) -> BoxFuture<'a, Result<Vec<ChatEntry>, SessionError>>;

    fn append_entries<'a>(
        &'a self,
        user: UserId,
        entries: Vec<ChatEntry>,
    ) -> BoxFuture<'a, Result<(), SessionError>>;

    fn clear<'a>(&'a self, user: UserId) -> BoxFuture<'a, Result<(), SessionError>>;
}

/// Keeps the newest `capacity` entries per user.
#[derive(Debug)]
pub struct InMemoryTranscriptStore {
    capacity: usize,
    transcripts: Mutex<HashMap<UserId, VecDeque<ChatEntry>>>,
}

impl Default for InMemoryTranscriptStore {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_TRANSCRIPT_CAPACITY)
    }
}

impl InMemoryTranscriptStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            transcripts: Mutex::new(HashMap::new()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl TranscriptStore for InMemoryTranscriptStore {
    fn load_entries<'a>(
        &'a self,
        user: UserId,
    ) -> BoxFuture<'a, Result<Vec<ChatEntry>, SessionError>> {
        Box::pin(async move {
            let transcripts = self
                .transcripts
                .lock()
                .map_err(|_| SessionError::storage("transcript store lock poisoned"))?;

            Ok(transcripts
                .get(&user)
                .map(|entries| entries.iter().cloned().collect())
                .unwrap_or_default())
        })
    }

    fn append_entries<'a>(
        &'a self,
        user: UserId,
        entries: Vec<ChatEntry>,
    ) -> BoxFuture<'a, Result<(), SessionError>> {
        Box::pin(async move {
            let mut transcripts = self
                .transcripts
                .lock()
                .map_err(|_| SessionError::storage("transcript store lock poisoned"))?;

            let transcript = transcripts.entry(user).or_default();
            transcript.extend(entries);
            while transcript.len() > self.capacity {
                transcript.pop_front();
            }

            Ok(())
        })
    }

    fn clear<'a>(&'a self, user: UserId) -> BoxFuture<'a, Result<(), SessionError>> {
        Box::pin(async move {
            let mut transcripts = self
                .transcripts
                .lock()
                .map_err(|_| SessionError::storage("transcript store lock poisoned"))?;

            transcripts.remove(&user);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn oldest_entries_fall_off_past_capacity() {
        let store = InMemoryTranscriptStore::with_capacity(4);
        let user = UserId::new(1);

        for turn in 0..3 {
            store
                .append_entries(
                    user,
                    vec![
                        ChatEntry::user(format!("q{turn}")),
                        ChatEntry::model(format!("a{turn}")),
                    ],
                )
                .await
                .expect("append should succeed");
        }

        let entries = store.load_entries(user).await.expect("load should succeed");
        assert_eq!(
            entries
                .iter()
                .map(|entry| entry.content.as_str())
                .collect::<Vec<_>>(),
            vec!["q1", "a1", "q2", "a2"]
        );
    }

    #[tokio::test]
    async fn clear_drops_history_for_one_user_only() {
        let store = InMemoryTranscriptStore::new();
        let alice = UserId::new(1);
        let bob = UserId::new(2);
        store
            .append_entries(alice, vec![ChatEntry::user("hi")])
            .await
            .expect("append should succeed");
        store
            .append_entries(bob, vec![ChatEntry::user("yo")])
            .await
            .expect("append should succeed");

        store.clear(alice).await.expect("clear should succeed");

        assert!(store.load_entries(alice).await.expect("load").is_empty());
        assert_eq!(store.load_entries(bob).await.expect("load").len(), 1);
    }

    #[test]
    fn history_is_rendered_with_role_prefixes() {
        let rendered = format_history(&[ChatEntry::user("draw a cat"), ChatEntry::model("Sure.")]);
        assert_eq!(rendered, "User: draw a cat\nModel: Sure.");
    }
}
