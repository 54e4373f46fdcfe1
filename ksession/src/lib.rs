//! Per-user conversation state, generation staging and chat transcripts.
//!
//! ```rust
//! use kcommon::UserId;
//! use ksession::{PendingGeneration, StagingStore};
//!
//! let staging = StagingStore::new();
//! let user = UserId::new(8);
//! staging.stage(user, PendingGeneration::new("kontext", 1)).expect("stage");
//!
//! staging.add_image(user, "a.png", || PendingGeneration::new("kontext", 1)).expect("first fits");
//! assert!(staging.add_image(user, "b.png", || PendingGeneration::new("kontext", 1)).is_err());
//! ```

mod error;
mod keyed;
mod staging;
mod state;
mod store;
mod transcript;

pub use error::{SessionError, SessionErrorKind};
pub use staging::{PendingGeneration, StagingStore};
pub use state::{ConversationState, StaleReference};
pub use store::SessionStore;
pub use transcript::{
    ChatEntry, ChatRole, DEFAULT_TRANSCRIPT_CAPACITY, InMemoryTranscriptStore, TranscriptStore,
    format_history,
};

pub mod prelude {
    pub use crate::{
        ChatEntry, ChatRole, ConversationState, InMemoryTranscriptStore, PendingGeneration,
        SessionError, SessionErrorKind, SessionStore, StagingStore, StaleReference,
        TranscriptStore,
    };
}
