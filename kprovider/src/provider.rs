use std::future::Future;
use std::pin::Pin;

use crate::{CompletionRequest, GenerationRequest, MediaUrl, ProviderError};

pub type ProviderFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// External generation service: submit a job, get media references back.
pub trait GenerationProvider: Send + Sync {
    fn submit<'a>(
        &'a self,
        model_ref: &'a str,
        request: GenerationRequest,
    ) -> ProviderFuture<'a, Result<Vec<MediaUrl>, ProviderError>>;

    /// Text or vision completion returning plain text.
    fn complete<'a>(
        &'a self,
        request: CompletionRequest,
    ) -> ProviderFuture<'a, Result<String, ProviderError>>;
}
