//! Pending generations accumulated across several messages before submission.

use kcommon::UserId;

use crate::error::SessionError;
use crate::keyed::KeyedCells;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingGeneration {
    pub model_id: String,
    pub prompt: String,
    pub style_id: Option<String>,
    pub image_urls: Vec<String>,
    /// Model's multi-image cap, fixed when staging begins.
    pub image_limit: usize,
    /// Transport message showing the staged images, if any.
    pub staging_message: Option<i64>,
}

impl PendingGeneration {
    pub fn new(model_id: impl Into<String>, image_limit: usize) -> Self {
        Self {
            model_id: model_id.into(),
            prompt: String::new(),
            style_id: None,
            image_urls: Vec::new(),
            image_limit,
            staging_message: None,
        }
    }

    pub fn with_style(mut self, style_id: Option<String>) -> Self {
        self.style_id = style_id;
        self
    }

    pub fn is_full(&self) -> bool {
        self.image_urls.len() >= self.image_limit
    }

    fn push_image(&mut self, url: String) -> Result<usize, SessionError> {
        if self.is_full() {
            return Err(SessionError::staging_limit_exceeded(self.image_limit));
        }
        self.image_urls.push(url);
        Ok(self.image_urls.len())
    }
}

#[derive(Debug)]
pub struct StagingStore {
    pending: KeyedCells<Option<PendingGeneration>>,
}

impl Default for StagingStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StagingStore {
    pub fn new() -> Self {
        Self {
            pending: KeyedCells::new("staging"),
        }
    }

    /// Starts a fresh record, replacing any earlier one.
    pub fn stage(
        &self,
        user: UserId,
        pending: PendingGeneration,
    ) -> Result<PendingGeneration, SessionError> {
        self.pending.with(user, |slot| {
            *slot = Some(pending.clone());
            pending
        })
    }

    /// Appends one image and returns the staged count. When no record exists,
    /// `fresh` builds one first. A full record is left unchanged.
    pub fn add_image(
        &self,
        user: UserId,
        url: impl Into<String>,
        fresh: impl FnOnce() -> PendingGeneration,
    ) -> Result<usize, SessionError> {
        let url = url.into();
        self.pending
            .with(user, |slot| slot.get_or_insert_with(fresh).push_image(url))?
    }

    pub fn get(&self, user: UserId) -> Result<Option<PendingGeneration>, SessionError> {
        self.pending.with(user, |slot| slot.clone())
    }

    /// Removes and returns the record for submission.
    pub fn take(&self, user: UserId) -> Result<Option<PendingGeneration>, SessionError> {
        self.pending.with(user, Option::take)
    }

    pub fn clear(&self, user: UserId) -> Result<(), SessionError> {
        self.take(user).map(|_| ())
    }

    pub fn clear_images(&self, user: UserId) -> Result<(), SessionError> {
        self.pending.with(user, |slot| {
            if let Some(pending) = slot.as_mut() {
                pending.image_urls.clear();
            }
        })
    }

    pub fn set_prompt(&self, user: UserId, prompt: impl Into<String>) -> Result<(), SessionError> {
        let prompt = prompt.into();
        self.pending.with(user, |slot| {
            if let Some(pending) = slot.as_mut() {
                pending.prompt = prompt;
            }
        })
    }

    pub fn set_staging_message(&self, user: UserId, message_id: i64) -> Result<(), SessionError> {
        self.pending.with(user, |slot| {
            if let Some(pending) = slot.as_mut() {
                pending.staging_message = Some(message_id);
            }
        })
    }
}
