//! Replicate provider implementation over transport and shared request types.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::{
    CompletionRequest, GenerationProvider, GenerationRequest, MediaUrl, ProviderError,
    ProviderFuture, media_urls_from_output, text_from_output,
};

use super::auth::ReplicateAuth;
use super::transport::ReplicateTransport;
use super::types::{ReplicateModelRef, ReplicatePredictionRequest};

#[derive(Debug, Clone)]
pub struct ReplicateProvider {
    auth: ReplicateAuth,
    transport: Arc<dyn ReplicateTransport>,
    poll_interval: Duration,
    max_polls: u32,
}

impl ReplicateProvider {
    pub fn new(auth: ReplicateAuth, transport: Arc<dyn ReplicateTransport>) -> Self {
        Self {
            auth,
            transport,
            poll_interval: Duration::from_secs(1),
            max_polls: 600,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_max_polls(mut self, max_polls: u32) -> Self {
        self.max_polls = max_polls;
        self
    }

    /// Creates a prediction and polls it until it reaches a terminal status.
    async fn run(
        &self,
        model_ref: &str,
        input: serde_json::Map<String, Value>,
    ) -> Result<Value, ProviderError> {
        let target = ReplicateModelRef::parse(model_ref)?;
        let request = ReplicatePredictionRequest {
            version: None,
            input,
        };

        let mut prediction = self
            .transport
            .create_prediction(target, request, &self.auth)
            .await?;

        let mut polls = 0_u32;
        while !prediction.status.is_terminal() {
            if polls >= self.max_polls {
                return Err(ProviderError::timeout(format!(
                    "prediction {} did not finish after {polls} polls",
                    prediction.id
                )));
            }

            let Some(url) = prediction.urls.get.clone() else {
                return Err(ProviderError::transport(format!(
                    "prediction {} is pending without a status url",
                    prediction.id
                )));
            };

            tokio::time::sleep(self.poll_interval).await;
            prediction = self.transport.get_prediction(&url, &self.auth).await?;
            polls += 1;
        }

        prediction.into_output()
    }
}

impl GenerationProvider for ReplicateProvider {
    fn submit<'a>(
        &'a self,
        model_ref: &'a str,
        request: GenerationRequest,
    ) -> ProviderFuture<'a, Result<Vec<MediaUrl>, ProviderError>> {
        Box::pin(async move {
            request.validate()?;
            let output = self.run(model_ref, request.to_input()).await?;
            media_urls_from_output(&output)
        })
    }

    fn complete<'a>(
        &'a self,
        request: CompletionRequest,
    ) -> ProviderFuture<'a, Result<String, ProviderError>> {
        Box::pin(async move {
            request.validate()?;
            let output = self.run(&request.model_ref, request.to_input()).await?;
            text_from_output(&output)
        })
    }
}
