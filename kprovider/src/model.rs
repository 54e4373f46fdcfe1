//! Provider-neutral request types for media generation and text completion.
//!
//! ```rust
//! use kprovider::{GenerationRequest, ImageInput};
//!
//! let request = GenerationRequest::new("a red fox at dusk")
//!     .with_images(ImageInput::Single("https://cdn/fox.png".into()))
//!     .with_aspect_ratio("16:9")
//!     .with_num_outputs(2);
//!
//! let input = request.to_input();
//! assert_eq!(input["prompt"], "a red fox at dusk");
//! assert_eq!(input["input_image"], "https://cdn/fox.png");
//! assert_eq!(input["num_outputs"], 2);
//! ```

use kcommon::ParameterBag;
use serde_json::{Map, Value};

use crate::ProviderError;

pub const DEFAULT_IMAGE_PARAMETER: &str = "input_image";
pub const PROMPT_KEY: &str = "prompt";
pub const ASPECT_RATIO_KEY: &str = "aspect_ratio";
pub const NUM_OUTPUTS_KEY: &str = "num_outputs";

pub type MediaUrl = String;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ImageInput {
    #[default]
    None,
    Single(String),
    Multiple(Vec<String>),
}

impl ImageInput {
    /// Models that accept several images always receive a list, even of one.
    pub fn from_urls(mut urls: Vec<String>, multiple: bool) -> Self {
        if urls.is_empty() {
            return Self::None;
        }
        if multiple {
            return Self::Multiple(urls);
        }
        Self::Single(urls.swap_remove(0))
    }

    pub fn len(&self) -> usize {
        match self {
            Self::None => 0,
            Self::Single(_) => 1,
            Self::Multiple(urls) => urls.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn to_value(&self) -> Option<Value> {
        match self {
            Self::None => None,
            Self::Single(url) => Some(Value::String(url.clone())),
            Self::Multiple(urls) => Some(Value::Array(
                urls.iter().cloned().map(Value::String).collect(),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub images: ImageInput,
    pub image_parameter: String,
    pub aspect_ratio: Option<String>,
    pub num_outputs: u32,
    pub parameters: ParameterBag,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            images: ImageInput::None,
            image_parameter: DEFAULT_IMAGE_PARAMETER.to_string(),
            aspect_ratio: None,
            num_outputs: 1,
            parameters: ParameterBag::new(),
        }
    }

    pub fn with_images(mut self, images: ImageInput) -> Self {
        self.images = images;
        self
    }

    pub fn with_image_parameter(mut self, name: impl Into<String>) -> Self {
        self.image_parameter = name.into();
        self
    }

    pub fn with_aspect_ratio(mut self, aspect_ratio: impl Into<String>) -> Self {
        self.aspect_ratio = Some(aspect_ratio.into());
        self
    }

    pub fn with_num_outputs(mut self, num_outputs: u32) -> Self {
        self.num_outputs = num_outputs;
        self
    }

    pub fn with_parameters(mut self, parameters: ParameterBag) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn validate(&self) -> Result<(), ProviderError> {
        if self.num_outputs == 0 {
            return Err(ProviderError::invalid_request(
                "num_outputs must be at least one",
            ));
        }

        if self.prompt.trim().is_empty() && self.images.is_empty() {
            return Err(ProviderError::invalid_request(
                "a prompt or at least one image is required",
            ));
        }

        if self.image_parameter.trim().is_empty() && !self.images.is_empty() {
            return Err(ProviderError::invalid_request(
                "image parameter name must not be empty",
            ));
        }

        Ok(())
    }

    /// Builds the provider input object. Model parameters go in first so the explicit
    /// prompt, image, aspect ratio and output count always win on a key collision.
    pub fn to_input(&self) -> Map<String, Value> {
        let mut input = self
            .parameters
            .iter()
            .filter(|(_, value)| !value.is_null())
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect::<Map<_, _>>();

        if !self.prompt.is_empty() {
            input.insert(PROMPT_KEY.to_string(), Value::String(self.prompt.clone()));
        }

        if let Some(images) = self.images.to_value() {
            input.insert(self.image_parameter.clone(), images);
        }

        if let Some(aspect_ratio) = self.aspect_ratio.as_ref().filter(|value| !value.is_empty()) {
            input.insert(
                ASPECT_RATIO_KEY.to_string(),
                Value::String(aspect_ratio.clone()),
            );
        }

        input.insert(NUM_OUTPUTS_KEY.to_string(), Value::from(self.num_outputs));
        input
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model_ref: String,
    pub prompt: String,
    pub system_instruction: Option<String>,
    pub image_url: Option<String>,
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
}

impl CompletionRequest {
    pub fn new(model_ref: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model_ref: model_ref.into(),
            prompt: prompt.into(),
            system_instruction: None,
            image_url: None,
            temperature: None,
            max_output_tokens: None,
        }
    }

    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    pub fn with_image(mut self, image_url: impl Into<String>) -> Self {
        self.image_url = Some(image_url.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = Some(max_output_tokens);
        self
    }

    pub fn is_vision(&self) -> bool {
        self.image_url.is_some()
    }

    pub fn validate(&self) -> Result<(), ProviderError> {
        if self.model_ref.trim().is_empty() {
            return Err(ProviderError::invalid_request("model must not be empty"));
        }

        if self.prompt.trim().is_empty() {
            return Err(ProviderError::invalid_request("prompt must not be empty"));
        }

        if let Some(max_output_tokens) = self.max_output_tokens {
            if max_output_tokens == 0 {
                return Err(ProviderError::invalid_request(
                    "max_output_tokens must be greater than zero",
                ));
            }
        }

        if let Some(temperature) = self.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(ProviderError::invalid_request(
                    "temperature must be in the inclusive range 0.0..=2.0",
                ));
            }
        }

        Ok(())
    }

    /// Vision requests carry the image as a one-element `images` list.
    pub fn to_input(&self) -> Map<String, Value> {
        let mut input = Map::new();
        input.insert(PROMPT_KEY.to_string(), Value::String(self.prompt.clone()));

        if let Some(instruction) = &self.system_instruction {
            input.insert(
                "system_instruction".to_string(),
                Value::String(instruction.clone()),
            );
        }

        if let Some(image_url) = &self.image_url {
            input.insert(
                "images".to_string(),
                Value::Array(vec![Value::String(image_url.clone())]),
            );
        }

        if let Some(temperature) = self.temperature {
            input.insert("temperature".to_string(), Value::from(f64::from(temperature)));
        }

        if let Some(max_output_tokens) = self.max_output_tokens {
            input.insert("max_output_tokens".to_string(), Value::from(max_output_tokens));
        }

        input
    }
}

/// Reads media references from a provider output that is either a single string or
/// an array of strings. Non-string array items are skipped.
pub fn media_urls_from_output(output: &Value) -> Result<Vec<MediaUrl>, ProviderError> {
    let urls = match output {
        Value::String(url) => vec![url.clone()],
        Value::Array(items) => items
            .iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect(),
        Value::Null => Vec::new(),
        _ => {
            return Err(ProviderError::malformed_output(
                "prediction output is in an unknown format",
            ));
        }
    };

    let urls = urls
        .into_iter()
        .filter(|url| !url.trim().is_empty())
        .collect::<Vec<_>>();
    if urls.is_empty() {
        return Err(ProviderError::empty_output("prediction returned no media"));
    }

    Ok(urls)
}

/// Reads completion text. Array output is streamed token chunks and is concatenated.
pub fn text_from_output(output: &Value) -> Result<String, ProviderError> {
    let text = match output {
        Value::String(text) => text.clone(),
        Value::Array(items) => items.iter().filter_map(Value::as_str).collect::<String>(),
        _ => {
            return Err(ProviderError::malformed_output(
                "completion output is in an unknown format",
            ));
        }
    };

    if text.trim().is_empty() {
        return Err(ProviderError::empty_output("completion returned no text"));
    }

    Ok(text)
}
