//! Read-only catalog entries: models, their parameters, providers, styles and packages.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use kledger::Cost;
use kprovider::{ASPECT_RATIO_KEY, DEFAULT_IMAGE_PARAMETER, NUM_OUTPUTS_KEY};

use crate::error::CatalogError;

pub const DEFAULT_MAX_IMAGES: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    #[default]
    Image,
    Video,
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    #[serde(alias = "int")]
    Integer,
    #[serde(alias = "float")]
    Number,
    String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: ParamType,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub default: Option<Value>,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default)]
    pub options: Vec<String>,
}

impl Parameter {
    pub fn new(name: impl Into<String>, param_type: ParamType) -> Self {
        let name = name.into();
        Self {
            label: name.clone(),
            name,
            param_type,
            description: String::new(),
            default: None,
            min: None,
            max: None,
            options: Vec::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    /// Names handled by the aspect-ratio and output-count settings instead.
    pub fn is_reserved(&self) -> bool {
        self.name == ASPECT_RATIO_KEY || self.name == NUM_OUTPUTS_KEY
    }

    pub fn has_options(&self) -> bool {
        !self.options.is_empty()
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref().filter(|value| !value.is_null())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDefinition {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "replicate_id", alias = "provider_ref")]
    pub provider_ref: String,
    #[serde(rename = "type", default)]
    pub media_type: MediaType,
    #[serde(default)]
    pub cost: u32,
    #[serde(default)]
    pub diamond_cost: u32,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    #[serde(default)]
    pub accepts_image_input: bool,
    #[serde(default)]
    pub accepts_multiple_images: bool,
    #[serde(default)]
    pub max_images: Option<usize>,
    #[serde(default)]
    pub configurable_aspect_ratio: bool,
    #[serde(default)]
    pub configurable_num_outputs: bool,
    /// Utility transforms that only ever produce one output.
    #[serde(default)]
    pub single_output: bool,
    #[serde(default, alias = "show_templates")]
    pub style_selection: bool,
    #[serde(default)]
    pub image_parameter_name: Option<String>,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
}

fn enabled_by_default() -> bool {
    true
}

impl ModelDefinition {
    pub fn new(
        id: impl Into<String>,
        provider_ref: impl Into<String>,
        media_type: MediaType,
    ) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            description: String::new(),
            provider_ref: provider_ref.into(),
            media_type,
            cost: 0,
            diamond_cost: 0,
            enabled: true,
            accepts_image_input: false,
            accepts_multiple_images: false,
            max_images: None,
            configurable_aspect_ratio: false,
            configurable_num_outputs: false,
            single_output: false,
            style_selection: false,
            image_parameter_name: None,
            parameters: Vec::new(),
        }
    }

    pub fn with_cost(mut self, cost: u32) -> Self {
        self.cost = cost;
        self
    }

    pub fn with_diamond_cost(mut self, diamond_cost: u32) -> Self {
        self.diamond_cost = diamond_cost;
        self
    }

    pub fn with_image_input(mut self, multiple: bool) -> Self {
        self.accepts_image_input = true;
        self.accepts_multiple_images = multiple;
        self
    }

    pub fn with_max_images(mut self, max_images: usize) -> Self {
        self.max_images = Some(max_images);
        self
    }

    pub fn with_configurable_aspect_ratio(mut self) -> Self {
        self.configurable_aspect_ratio = true;
        self
    }

    pub fn with_configurable_num_outputs(mut self) -> Self {
        self.configurable_num_outputs = true;
        self
    }

    pub fn with_single_output(mut self) -> Self {
        self.single_output = true;
        self
    }

    pub fn with_style_selection(mut self) -> Self {
        self.style_selection = true;
        self
    }

    pub fn with_parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn is_video(&self) -> bool {
        self.media_type == MediaType::Video
    }

    /// Price of one output in the currency this model is billed in.
    pub fn unit_cost(&self) -> Cost {
        match self.media_type {
            MediaType::Video => Cost::diamonds(self.diamond_cost),
            MediaType::Image | MediaType::Text => Cost::credits(self.cost),
        }
    }

    /// How many images may be staged for one submission.
    pub fn image_limit(&self) -> usize {
        if !self.accepts_image_input {
            return 0;
        }
        if self.accepts_multiple_images {
            return self.max_images.unwrap_or(DEFAULT_MAX_IMAGES);
        }
        1
    }

    pub fn image_parameter(&self) -> &str {
        self.image_parameter_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(DEFAULT_IMAGE_PARAMETER)
    }

    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|parameter| parameter.name == name)
    }

    /// Parameters a user may edit; reserved names are excluded.
    pub fn editable_parameters(&self) -> impl Iterator<Item = &Parameter> {
        self.parameters.iter().filter(|parameter| !parameter.is_reserved())
    }

    /// Owner segment of the provider reference, e.g. `black-forest-labs`.
    pub fn provider_id(&self) -> Option<&str> {
        self.provider_ref
            .split_once('/')
            .map(|(owner, _)| owner)
            .filter(|owner| !owner.is_empty())
    }

    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.id.trim().is_empty() {
            return Err(CatalogError::invalid("model id must not be empty"));
        }

        if self.provider_ref.trim().is_empty() {
            return Err(CatalogError::invalid(format!(
                "model '{}' has an empty replicate_id",
                self.id
            )));
        }

        if self.max_images == Some(0) {
            return Err(CatalogError::invalid(format!(
                "model '{}' declares max_images = 0",
                self.id
            )));
        }

        let mut seen = Vec::with_capacity(self.parameters.len());
        for parameter in &self.parameters {
            if parameter.name.trim().is_empty() {
                return Err(CatalogError::invalid(format!(
                    "model '{}' declares a parameter without a name",
                    self.id
                )));
            }

            if seen.contains(&parameter.name.as_str()) {
                return Err(CatalogError::duplicate(format!(
                    "model '{}' declares parameter '{}' twice",
                    self.id, parameter.name
                )));
            }
            seen.push(parameter.name.as_str());

            if let (Some(min), Some(max)) = (parameter.min, parameter.max) {
                if min > max {
                    return Err(CatalogError::invalid(format!(
                        "parameter '{}' of model '{}' has min {min} greater than max {max}",
                        parameter.name, self.id
                    )));
                }
            }

            if let Some(default) = parameter.default_value() {
                parameter.coerce_value(default).map_err(|err| {
                    CatalogError::invalid(format!(
                        "default of parameter '{}' of model '{}' is invalid: {}",
                        parameter.name, self.id, err.message
                    ))
                })?;
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderEntry {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleTemplate {
    pub id: String,
    #[serde(alias = "title")]
    pub name: String,
    #[serde(default)]
    pub prompt: String,
}

impl StyleTemplate {
    pub const PLACEHOLDER: &'static str = "{prompt}";

    /// Merges the user's prompt into the template.
    pub fn apply(&self, prompt: &str) -> String {
        let template = self.prompt.trim();
        if template.is_empty() {
            return prompt.to_string();
        }
        if template.contains(Self::PLACEHOLDER) {
            return template.replace(Self::PLACEHOLDER, prompt.trim());
        }
        if prompt.trim().is_empty() {
            return template.to_string();
        }
        format!("{}, {template}", prompt.trim())
    }
}

/// Ready-made prompt offered from the settings screen and submitted as is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptTemplate {
    pub id: String,
    #[serde(alias = "name")]
    pub title: String,
    pub prompt: String,
}

impl PromptTemplate {
    pub fn new(id: impl Into<String>, title: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            prompt: prompt.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditPackage {
    pub id: String,
    #[serde(default)]
    pub stars_amount: u32,
    pub credits_amount: u32,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::CatalogErrorKind;

    #[test]
    fn model_json_uses_catalog_field_names_and_defaults() {
        let model: ModelDefinition = serde_json::from_value(json!({
            "id": "flux-kontext",
            "name": "Flux Kontext",
            "replicate_id": "black-forest-labs/flux-kontext-pro",
            "cost": 3,
            "accepts_image_input": true,
            "configurable_aspect_ratio": true,
            "parameters": [
                {"name": "seed", "type": "integer", "label": "Seed", "min": 0, "max": 1000}
            ]
        }))
        .expect("model should decode");

        assert!(model.enabled);
        assert_eq!(model.media_type, MediaType::Image);
        assert_eq!(model.provider_id(), Some("black-forest-labs"));
        assert_eq!(model.image_parameter(), "input_image");
        assert_eq!(model.image_limit(), 1);
        assert_eq!(model.unit_cost(), Cost::credits(3));
        assert_eq!(
            model.parameter("seed").map(|parameter| parameter.param_type),
            Some(ParamType::Integer)
        );
        assert!(model.validate().is_ok());
    }

    #[test]
    fn video_models_bill_in_diamonds() {
        let model = ModelDefinition::new("veo", "google/veo-3", MediaType::Video)
            .with_cost(99)
            .with_diamond_cost(4);
        assert_eq!(model.unit_cost(), Cost::diamonds(4));
    }

    #[test]
    fn image_limit_follows_capability_flags() {
        let text_only = ModelDefinition::new("a", "o/a", MediaType::Image);
        let multi = ModelDefinition::new("b", "o/b", MediaType::Image).with_image_input(true);
        let capped = multi.clone().with_max_images(2);

        assert_eq!(text_only.image_limit(), 0);
        assert_eq!(multi.image_limit(), DEFAULT_MAX_IMAGES);
        assert_eq!(capped.image_limit(), 2);
    }

    #[test]
    fn reserved_parameters_are_not_editable() {
        let model = ModelDefinition::new("m", "o/m", MediaType::Image)
            .with_parameter(Parameter::new("aspect_ratio", ParamType::String))
            .with_parameter(Parameter::new("num_outputs", ParamType::Integer))
            .with_parameter(Parameter::new("guidance", ParamType::Number));

        let names = model
            .editable_parameters()
            .map(|parameter| parameter.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["guidance"]);
    }

    #[test]
    fn validate_rejects_inconsistent_definitions() {
        let inverted = ModelDefinition::new("m", "o/m", MediaType::Image).with_parameter(
            Parameter::new("steps", ParamType::Integer).with_range(Some(50.0), Some(1.0)),
        );
        let err = inverted.validate().expect_err("min > max must fail");
        assert_eq!(err.kind, CatalogErrorKind::Invalid);

        let duplicated = ModelDefinition::new("m", "o/m", MediaType::Image)
            .with_parameter(Parameter::new("seed", ParamType::Integer))
            .with_parameter(Parameter::new("seed", ParamType::Integer));
        let err = duplicated.validate().expect_err("duplicate parameter must fail");
        assert_eq!(err.kind, CatalogErrorKind::Duplicate);

        let bad_default = ModelDefinition::new("m", "o/m", MediaType::Image).with_parameter(
            Parameter::new("steps", ParamType::Integer)
                .with_range(Some(1.0), Some(10.0))
                .with_default(json!(40)),
        );
        let err = bad_default.validate().expect_err("out of range default must fail");
        assert_eq!(err.kind, CatalogErrorKind::Invalid);

        let no_ref = ModelDefinition::new("m", " ", MediaType::Image);
        assert!(no_ref.validate().is_err());
    }

    #[test]
    fn style_templates_merge_prompts() {
        let placeholder = StyleTemplate {
            id: "noir".to_string(),
            name: "Noir".to_string(),
            prompt: "black and white film still of {prompt}, high contrast".to_string(),
        };
        let suffix = StyleTemplate {
            id: "anime".to_string(),
            name: "Anime".to_string(),
            prompt: "anime style".to_string(),
        };
        let empty = StyleTemplate {
            id: "none".to_string(),
            name: "None".to_string(),
            prompt: String::new(),
        };

        assert_eq!(
            placeholder.apply(" a cat "),
            "black and white film still of a cat, high contrast"
        );
        assert_eq!(suffix.apply("a cat"), "a cat, anime style");
        assert_eq!(suffix.apply(""), "anime style");
        assert_eq!(empty.apply("a cat"), "a cat");
    }
}
