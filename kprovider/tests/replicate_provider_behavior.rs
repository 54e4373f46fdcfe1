#![cfg(feature = "provider-replicate")]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use kprovider::adapters::replicate::{
    ReplicateAuth, ReplicateModelRef, ReplicatePrediction, ReplicatePredictionRequest,
    ReplicateProvider, ReplicateTransport,
};
use kprovider::{
    CompletionRequest, GenerationProvider, GenerationRequest, ImageInput, ProviderError,
    ProviderErrorKind, ProviderFuture,
};
use serde_json::json;

#[derive(Debug, Default)]
struct FakeTransport {
    created: Mutex<Vec<(ReplicateModelRef, ReplicatePredictionRequest)>>,
    polled: Mutex<Vec<String>>,
    responses: Mutex<VecDeque<Result<ReplicatePrediction, ProviderError>>>,
}

impl FakeTransport {
    fn scripted(responses: Vec<serde_json::Value>) -> Self {
        let responses = responses
            .into_iter()
            .map(|value| Ok(serde_json::from_value(value).expect("scripted prediction")))
            .collect();
        Self {
            responses: Mutex::new(responses),
            ..Self::default()
        }
    }

    fn next(&self) -> Result<ReplicatePrediction, ProviderError> {
        self.responses
            .lock()
            .expect("responses lock")
            .pop_front()
            .unwrap_or_else(|| Err(ProviderError::transport("no scripted response left")))
    }
}

impl ReplicateTransport for FakeTransport {
    fn create_prediction<'a>(
        &'a self,
        target: ReplicateModelRef,
        request: ReplicatePredictionRequest,
        _auth: &'a ReplicateAuth,
    ) -> ProviderFuture<'a, Result<ReplicatePrediction, ProviderError>> {
        Box::pin(async move {
            self.created
                .lock()
                .expect("created lock")
                .push((target, request));
            self.next()
        })
    }

    fn get_prediction<'a>(
        &'a self,
        url: &'a str,
        _auth: &'a ReplicateAuth,
    ) -> ProviderFuture<'a, Result<ReplicatePrediction, ProviderError>> {
        Box::pin(async move {
            self.polled.lock().expect("polled lock").push(url.to_string());
            self.next()
        })
    }
}

fn provider(transport: Arc<FakeTransport>) -> ReplicateProvider {
    ReplicateProvider::new(
        ReplicateAuth::new("r8_test").expect("token should be valid"),
        transport,
    )
    .with_poll_interval(Duration::from_millis(1))
}

#[tokio::test]
async fn submit_sends_assembled_input_and_returns_media() {
    let transport = Arc::new(FakeTransport::scripted(vec![json!({
        "id": "p1",
        "status": "succeeded",
        "output": ["https://cdn/a.webp", "https://cdn/b.webp"],
    })]));
    let provider = provider(Arc::clone(&transport));

    let request = GenerationRequest::new("neon city")
        .with_images(ImageInput::Single("https://cdn/in.png".to_string()))
        .with_aspect_ratio("9:16")
        .with_num_outputs(2);
    let media = provider
        .submit("black-forest-labs/flux-dev", request)
        .await
        .expect("submit should succeed");

    assert_eq!(media, vec!["https://cdn/a.webp", "https://cdn/b.webp"]);

    let created = transport.created.lock().expect("created lock");
    let (target, sent) = &created[0];
    assert_eq!(
        target,
        &ReplicateModelRef::Model {
            owner: "black-forest-labs".to_string(),
            name: "flux-dev".to_string(),
        }
    );
    assert_eq!(sent.input["prompt"], "neon city");
    assert_eq!(sent.input["input_image"], "https://cdn/in.png");
    assert_eq!(sent.input["aspect_ratio"], "9:16");
    assert_eq!(sent.input["num_outputs"], 2);
}

#[tokio::test]
async fn submit_polls_pending_predictions_until_terminal() {
    let transport = Arc::new(FakeTransport::scripted(vec![
        json!({"id": "p2", "status": "starting", "urls": {"get": "https://api/p2"}}),
        json!({"id": "p2", "status": "processing", "urls": {"get": "https://api/p2"}}),
        json!({"id": "p2", "status": "succeeded", "output": "https://cdn/video.mp4"}),
    ]));
    let provider = provider(Arc::clone(&transport));

    let media = provider
        .submit("kwaivgi/kling-v2.1", GenerationRequest::new("waves"))
        .await
        .expect("submit should succeed after polling");

    assert_eq!(media, vec!["https://cdn/video.mp4"]);
    assert_eq!(transport.polled.lock().expect("polled lock").len(), 2);
}

#[tokio::test]
async fn empty_output_is_a_failure() {
    let transport = Arc::new(FakeTransport::scripted(vec![json!({
        "id": "p3",
        "status": "succeeded",
        "output": [],
    })]));

    let err = provider(transport)
        .submit("owner/model", GenerationRequest::new("x"))
        .await
        .expect_err("empty output must fail");

    assert_eq!(err.kind, ProviderErrorKind::EmptyOutput);
}

#[tokio::test]
async fn failed_prediction_is_reported_without_retry() {
    let transport = Arc::new(FakeTransport::scripted(vec![json!({
        "id": "p4",
        "status": "failed",
        "error": "model crashed",
    })]));
    let provider = provider(Arc::clone(&transport));

    let err = provider
        .submit("owner/model", GenerationRequest::new("x"))
        .await
        .expect_err("failed prediction must fail");

    assert_eq!(err.kind, ProviderErrorKind::PredictionFailed);
    assert_eq!(transport.created.lock().expect("created lock").len(), 1);
}

#[tokio::test]
async fn poll_budget_exhaustion_times_out() {
    let transport = Arc::new(FakeTransport::scripted(vec![
        json!({"id": "p5", "status": "processing", "urls": {"get": "https://api/p5"}}),
        json!({"id": "p5", "status": "processing", "urls": {"get": "https://api/p5"}}),
    ]));

    let err = provider(transport)
        .with_max_polls(1)
        .submit("owner/model", GenerationRequest::new("x"))
        .await
        .expect_err("exhausted polls must fail");

    assert_eq!(err.kind, ProviderErrorKind::Timeout);
}

#[tokio::test]
async fn completion_concatenates_streamed_text_and_uses_version_refs() {
    let transport = Arc::new(FakeTransport::scripted(vec![json!({
        "id": "p6",
        "status": "succeeded",
        "output": ["A cinematic ", "portrait"],
    })]));
    let provider = provider(Arc::clone(&transport));

    let text = provider
        .complete(
            CompletionRequest::new("google/gemini:v1", "describe")
                .with_image("https://cdn/cat.png"),
        )
        .await
        .expect("completion should succeed");

    assert_eq!(text, "A cinematic portrait");
    let created = transport.created.lock().expect("created lock");
    assert_eq!(
        created[0].0,
        ReplicateModelRef::Version {
            version: "v1".to_string(),
        }
    );
    assert_eq!(created[0].1.input["images"], json!(["https://cdn/cat.png"]));
}

#[tokio::test]
async fn invalid_requests_never_reach_the_transport() {
    let transport = Arc::new(FakeTransport::default());
    let provider = provider(Arc::clone(&transport));

    let err = provider
        .submit("owner/model", GenerationRequest::new("").with_num_outputs(1))
        .await
        .expect_err("empty request must fail");

    assert_eq!(err.kind, ProviderErrorKind::InvalidRequest);
    assert!(transport.created.lock().expect("created lock").is_empty());
}
