use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ProviderError;

/// Target of a prediction: an official model path or a pinned version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplicateModelRef {
    Model { owner: String, name: String },
    Version { version: String },
}

impl ReplicateModelRef {
    pub fn parse(model_ref: &str) -> Result<Self, ProviderError> {
        let model_ref = model_ref.trim();
        let (path, version) = match model_ref.split_once(':') {
            Some((path, version)) => (path, Some(version)),
            None => (model_ref, None),
        };

        if let Some(version) = version.filter(|value| !value.trim().is_empty()) {
            return Ok(Self::Version {
                version: version.trim().to_string(),
            });
        }

        match path.split_once('/') {
            Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
                Ok(Self::Model {
                    owner: owner.to_string(),
                    name: name.to_string(),
                })
            }
            _ => Err(ProviderError::invalid_request(format!(
                "model reference '{model_ref}' must look like 'owner/name' or 'owner/name:version'"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplicatePredictionRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub input: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplicateStatus {
    Starting,
    Processing,
    Succeeded,
    Failed,
    Canceled,
    #[serde(other)]
    Unknown,
}

impl ReplicateStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Canceled)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct ReplicateUrls {
    #[serde(default)]
    pub get: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReplicatePrediction {
    #[serde(default)]
    pub id: String,
    pub status: ReplicateStatus,
    #[serde(default)]
    pub output: Value,
    #[serde(default)]
    pub error: Option<Value>,
    #[serde(default)]
    pub urls: ReplicateUrls,
}

impl ReplicatePrediction {
    /// Output of a succeeded prediction, or the provider-side failure.
    pub fn into_output(self) -> Result<Value, ProviderError> {
        match self.status {
            ReplicateStatus::Succeeded => Ok(self.output),
            ReplicateStatus::Canceled => Err(ProviderError::prediction_failed(format!(
                "prediction {} was canceled",
                self.id
            ))),
            _ => {
                let reason = match self.error {
                    Some(Value::String(message)) => message,
                    Some(other) if !other.is_null() => other.to_string(),
                    _ => "no error detail".to_string(),
                };
                Err(ProviderError::prediction_failed(format!(
                    "prediction {} failed: {reason}",
                    self.id
                )))
            }
        }
    }
}
