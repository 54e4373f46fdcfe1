//! Replicate transport trait and reqwest-based HTTP implementation.

use reqwest::{Client, Response, StatusCode};

use crate::{ProviderError, ProviderFuture};

use super::auth::ReplicateAuth;
use super::types::{ReplicateModelRef, ReplicatePrediction, ReplicatePredictionRequest};

pub trait ReplicateTransport: Send + Sync + std::fmt::Debug {
    fn create_prediction<'a>(
        &'a self,
        target: ReplicateModelRef,
        request: ReplicatePredictionRequest,
        auth: &'a ReplicateAuth,
    ) -> ProviderFuture<'a, Result<ReplicatePrediction, ProviderError>>;

    fn get_prediction<'a>(
        &'a self,
        url: &'a str,
        auth: &'a ReplicateAuth,
    ) -> ProviderFuture<'a, Result<ReplicatePrediction, ProviderError>>;
}

#[derive(Debug, Clone)]
pub struct ReplicateHttpTransport {
    client: Client,
    base_url: String,
}

impl ReplicateHttpTransport {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            base_url: "https://api.replicate.com/v1".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    fn prediction_url(&self, target: &ReplicateModelRef) -> String {
        match target {
            ReplicateModelRef::Model { owner, name } => {
                self.endpoint(&format!("models/{owner}/{name}/predictions"))
            }
            ReplicateModelRef::Version { .. } => self.endpoint("predictions"),
        }
    }

    fn map_send_error(err: reqwest::Error) -> ProviderError {
        if err.is_timeout() {
            ProviderError::timeout(err.to_string())
        } else {
            ProviderError::transport(err.to_string())
        }
    }

    async fn parse_error(response: Response) -> ProviderError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = extract_error_message(&body)
            .unwrap_or_else(|| format!("Replicate request failed with status {status}"));

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                ProviderError::authentication(message)
            }
            StatusCode::TOO_MANY_REQUESTS => ProviderError::rate_limited(message),
            StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
                ProviderError::timeout(message)
            }
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY | StatusCode::NOT_FOUND => {
                ProviderError::invalid_request(message)
            }
            StatusCode::SERVICE_UNAVAILABLE | StatusCode::BAD_GATEWAY => {
                ProviderError::unavailable(message)
            }
            _ => ProviderError::transport(message),
        }
    }

    async fn decode(response: Response) -> Result<ReplicatePrediction, ProviderError> {
        if !response.status().is_success() {
            return Err(Self::parse_error(response).await);
        }

        response
            .json::<ReplicatePrediction>()
            .await
            .map_err(|err| ProviderError::transport(err.to_string()))
    }
}

impl ReplicateTransport for ReplicateHttpTransport {
    fn create_prediction<'a>(
        &'a self,
        target: ReplicateModelRef,
        mut request: ReplicatePredictionRequest,
        auth: &'a ReplicateAuth,
    ) -> ProviderFuture<'a, Result<ReplicatePrediction, ProviderError>> {
        Box::pin(async move {
            if let ReplicateModelRef::Version { version } = &target {
                request.version = Some(version.clone());
            }

            let response = self
                .client
                .post(self.prediction_url(&target))
                .bearer_auth(auth.expose())
                .header("Prefer", "wait")
                .json(&request)
                .send()
                .await
                .map_err(Self::map_send_error)?;

            Self::decode(response).await
        })
    }

    fn get_prediction<'a>(
        &'a self,
        url: &'a str,
        auth: &'a ReplicateAuth,
    ) -> ProviderFuture<'a, Result<ReplicatePrediction, ProviderError>> {
        Box::pin(async move {
            let response = self
                .client
                .get(url)
                .bearer_auth(auth.expose())
                .send()
                .await
                .map_err(Self::map_send_error)?;

            Self::decode(response).await
        })
    }
}

fn extract_error_message(body: &str) -> Option<String> {
    let value = serde_json::from_str::<serde_json::Value>(body).ok()?;
    value
        .get("detail")
        .or_else(|| value.get("error"))
        .and_then(|detail| detail.as_str())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prediction_url_depends_on_reference_kind() {
        let transport =
            ReplicateHttpTransport::new(Client::new()).with_base_url("https://example.test/v1/");

        let model = ReplicateModelRef::Model {
            owner: "bytedance".to_string(),
            name: "seedream-4".to_string(),
        };
        assert_eq!(
            transport.prediction_url(&model),
            "https://example.test/v1/models/bytedance/seedream-4/predictions"
        );

        let version = ReplicateModelRef::Version {
            version: "abc".to_string(),
        };
        assert_eq!(
            transport.prediction_url(&version),
            "https://example.test/v1/predictions"
        );
    }

    #[test]
    fn error_message_prefers_detail_field() {
        assert_eq!(
            extract_error_message("{\"detail\":\"Invalid version\"}"),
            Some("Invalid version".to_string())
        );
        assert_eq!(extract_error_message("not json"), None);
    }
}
