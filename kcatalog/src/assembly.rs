//! Request assembly: resolves settings against a model definition and produces a
//! sanitized provider request with its cost.
//!
//! The user's settings map is one namespace shared by every model the user ever
//! configured, so assembly only reads keys the target model declares.
//!
//! ```rust
//! use chrono::Utc;
//! use kcatalog::{AssemblyInput, MediaType, ModelDefinition, ParamType, Parameter, assemble_request};
//! use kcommon::UserId;
//! use kledger::{Cost, UserAccount};
//!
//! let model = ModelDefinition::new("sdxl", "stability-ai/sdxl", MediaType::Image)
//!     .with_cost(2)
//!     .with_configurable_num_outputs()
//!     .with_parameter(Parameter::new("seed", ParamType::Integer));
//! let mut user = UserAccount::new(UserId::new(1), Utc::now(), 5);
//! user.num_outputs = 3;
//! user.custom_settings.insert("seed".into(), serde_json::json!(11));
//! user.custom_settings.insert("style".into(), serde_json::json!("noir"));
//!
//! let assembled = assemble_request(&model, &user, AssemblyInput::new("a castle"))
//!     .expect("settings should be valid");
//!
//! assert_eq!(assembled.cost, Cost::credits(6));
//! assert_eq!(assembled.request.num_outputs, 3);
//! assert!(!assembled.request.parameters.contains_key("style"));
//! ```

use kcommon::ParameterBag;
use kledger::{Cost, UserAccount};
use kprovider::{GenerationRequest, ImageInput};

use crate::error::ParameterError;
use crate::model::{MediaType, ModelDefinition, StyleTemplate};

/// Per-submission input gathered by the conversation flow.
#[derive(Debug, Clone, Default)]
pub struct AssemblyInput<'a> {
    pub prompt: &'a str,
    pub image_urls: Vec<String>,
    pub style: Option<&'a StyleTemplate>,
    pub overrides: Option<&'a ParameterBag>,
}

impl<'a> AssemblyInput<'a> {
    pub fn new(prompt: &'a str) -> Self {
        Self {
            prompt,
            ..Self::default()
        }
    }

    pub fn with_images(mut self, image_urls: Vec<String>) -> Self {
        self.image_urls = image_urls;
        self
    }

    pub fn with_style(mut self, style: Option<&'a StyleTemplate>) -> Self {
        self.style = style;
        self
    }

    pub fn with_overrides(mut self, overrides: &'a ParameterBag) -> Self {
        self.overrides = Some(overrides);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssembledRequest {
    pub request: GenerationRequest,
    pub cost: Cost,
}

pub fn resolve_aspect_ratio(model: &ModelDefinition, user: &UserAccount) -> Option<String> {
    if !model.configurable_aspect_ratio || model.is_video() {
        return None;
    }
    Some(user.aspect_ratio.clone()).filter(|ratio| !ratio.trim().is_empty())
}

pub fn resolve_num_outputs(model: &ModelDefinition, user: &UserAccount) -> u32 {
    if model.single_output || model.is_video() || !model.configurable_num_outputs {
        return 1;
    }
    user.num_outputs.max(1)
}

/// `unit cost x outputs` in credits, or the flat diamond price for video.
pub fn generation_cost(model: &ModelDefinition, num_outputs: u32) -> Cost {
    match model.media_type {
        MediaType::Video => Cost::diamonds(model.diamond_cost),
        MediaType::Image | MediaType::Text => {
            Cost::credits(model.cost.saturating_mul(num_outputs.max(1)))
        }
    }
}

/// Builds the parameter bag from declared parameters only. For each declared name
/// the override wins over the saved setting, which wins over the declared default.
///
/// An invalid override is an error. A saved value that does not fit this model
/// was most likely written for another model under the same name, so it falls
/// back to the default.
pub fn sanitize_parameters(
    model: &ModelDefinition,
    settings: &ParameterBag,
    overrides: Option<&ParameterBag>,
) -> Result<ParameterBag, ParameterError> {
    let mut sanitized = ParameterBag::new();

    for parameter in model.editable_parameters() {
        let present = |bag: &ParameterBag| {
            bag.get(&parameter.name)
                .filter(|value| !value.is_null())
                .cloned()
        };

        let supplied = match overrides.and_then(present) {
            Some(value) => Some(parameter.coerce_value(&value)?),
            None => present(settings).and_then(|value| parameter.coerce_value(&value).ok()),
        };

        let value = match supplied.or_else(|| parameter.default_value().cloned()) {
            Some(value) => value,
            None => continue,
        };

        sanitized.insert(parameter.name.clone(), value);
    }

    Ok(sanitized)
}

pub fn assemble_request(
    model: &ModelDefinition,
    user: &UserAccount,
    input: AssemblyInput<'_>,
) -> Result<AssembledRequest, ParameterError> {
    let parameters = sanitize_parameters(model, &user.custom_settings, input.overrides)?;
    let num_outputs = resolve_num_outputs(model, user);

    let prompt = match input.style {
        Some(style) => style.apply(input.prompt),
        None => input.prompt.trim().to_string(),
    };

    let images = if model.accepts_image_input {
        let mut urls = input.image_urls;
        urls.truncate(model.image_limit());
        ImageInput::from_urls(urls, model.accepts_multiple_images)
    } else {
        ImageInput::None
    };

    let mut request = GenerationRequest::new(prompt)
        .with_images(images)
        .with_image_parameter(model.image_parameter())
        .with_num_outputs(num_outputs)
        .with_parameters(parameters);
    if let Some(aspect_ratio) = resolve_aspect_ratio(model, user) {
        request = request.with_aspect_ratio(aspect_ratio);
    }

    Ok(AssembledRequest {
        request,
        cost: generation_cost(model, num_outputs),
    })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use kcommon::UserId;
    use serde_json::json;

    use super::*;
    use crate::{ParamType, Parameter, ParameterErrorKind};

    fn user() -> UserAccount {
        UserAccount::new(UserId::new(1), Utc::now(), 5)
    }

    fn seed_guidance_model() -> ModelDefinition {
        ModelDefinition::new("flux", "black-forest-labs/flux-dev", MediaType::Image)
            .with_cost(2)
            .with_parameter(Parameter::new("seed", ParamType::Integer))
            .with_parameter(
                Parameter::new("guidance", ParamType::Number).with_default(json!(3.5)),
            )
    }

    #[test]
    fn settings_from_other_models_never_leak_into_the_request() {
        let model = seed_guidance_model();
        let mut user = user();
        user.custom_settings.insert("seed".to_string(), json!(7));
        user.custom_settings.insert("style".to_string(), json!("noir"));
        user.custom_settings.insert("num_outputs".to_string(), json!(9));

        let assembled =
            assemble_request(&model, &user, AssemblyInput::new("a fox")).expect("valid settings");

        let mut expected = ParameterBag::new();
        expected.insert("seed".to_string(), json!(7));
        expected.insert("guidance".to_string(), json!(3.5));
        assert_eq!(assembled.request.parameters, expected);
        assert_eq!(assembled.request.num_outputs, 1);
        assert_eq!(assembled.request.to_input()["num_outputs"], 1);
    }

    #[test]
    fn reserved_names_are_skipped_even_when_declared() {
        let model = seed_guidance_model()
            .with_parameter(Parameter::new("aspect_ratio", ParamType::String).with_default(json!("3:2")))
            .with_parameter(Parameter::new("num_outputs", ParamType::Integer).with_default(json!(4)));

        let sanitized =
            sanitize_parameters(&model, &ParameterBag::new(), None).expect("defaults are valid");

        assert!(!sanitized.contains_key("aspect_ratio"));
        assert!(!sanitized.contains_key("num_outputs"));
        assert_eq!(sanitized.get("guidance"), Some(&json!(3.5)));
    }

    #[test]
    fn overrides_win_over_saved_settings_but_stay_whitelisted() {
        let model = seed_guidance_model();
        let mut settings = ParameterBag::new();
        settings.insert("seed".to_string(), json!(7));
        let mut overrides = ParameterBag::new();
        overrides.insert("seed".to_string(), json!("12"));
        overrides.insert("scheduler".to_string(), json!("K_EULER"));

        let sanitized =
            sanitize_parameters(&model, &settings, Some(&overrides)).expect("valid overrides");

        assert_eq!(sanitized.get("seed"), Some(&json!(12)));
        assert!(!sanitized.contains_key("scheduler"));
    }

    #[test]
    fn saved_value_that_does_not_fit_falls_back_to_the_default() {
        let model = ModelDefinition::new("kling", "kwaivgi/kling", MediaType::Video)
            .with_diamond_cost(3)
            .with_parameter(
                Parameter::new("duration", ParamType::String)
                    .with_options(["5", "10"])
                    .with_default(json!("5")),
            )
            .with_parameter(
                Parameter::new("steps", ParamType::Integer).with_range(Some(1.0), Some(10.0)),
            );
        let mut user = user();
        user.custom_settings.insert("duration".to_string(), json!(8));
        user.custom_settings.insert("steps".to_string(), json!(40));

        let assembled = assemble_request(&model, &user, AssemblyInput::new("waves"))
            .expect("saved values from another model must not block submission");

        assert_eq!(assembled.request.parameters.get("duration"), Some(&json!("5")));
        assert!(!assembled.request.parameters.contains_key("steps"));
    }

    #[test]
    fn out_of_range_override_is_reported_not_clamped() {
        let model = ModelDefinition::new("m", "o/m", MediaType::Image).with_parameter(
            Parameter::new("steps", ParamType::Integer).with_range(Some(1.0), Some(10.0)),
        );
        let mut overrides = ParameterBag::new();
        overrides.insert("steps".to_string(), json!(40));

        let err = sanitize_parameters(&model, &ParameterBag::new(), Some(&overrides))
            .expect_err("out of range must be rejected");
        assert_eq!(err.kind, ParameterErrorKind::OutOfRange);
    }

    #[test]
    fn output_count_and_aspect_ratio_follow_capabilities() {
        let mut user = user();
        user.num_outputs = 4;
        user.aspect_ratio = "16:9".to_string();

        let fixed = seed_guidance_model();
        assert_eq!(resolve_num_outputs(&fixed, &user), 1);
        assert_eq!(resolve_aspect_ratio(&fixed, &user), None);

        let configurable = seed_guidance_model()
            .with_configurable_num_outputs()
            .with_configurable_aspect_ratio();
        assert_eq!(resolve_num_outputs(&configurable, &user), 4);
        assert_eq!(resolve_aspect_ratio(&configurable, &user), Some("16:9".to_string()));

        let utility = configurable.clone().with_single_output();
        assert_eq!(resolve_num_outputs(&utility, &user), 1);
    }

    #[test]
    fn cost_scales_with_outputs_for_credits_and_is_flat_for_video() {
        let image = seed_guidance_model().with_configurable_num_outputs();
        let mut user = user();
        user.num_outputs = 3;
        let assembled =
            assemble_request(&image, &user, AssemblyInput::new("x")).expect("valid settings");
        assert_eq!(assembled.cost, Cost::credits(6));

        let video = ModelDefinition::new("kling", "kwaivgi/kling", MediaType::Video)
            .with_diamond_cost(3)
            .with_configurable_num_outputs()
            .with_configurable_aspect_ratio();
        let assembled =
            assemble_request(&video, &user, AssemblyInput::new("x")).expect("valid settings");
        assert_eq!(assembled.cost, Cost::diamonds(3));
        assert_eq!(assembled.request.num_outputs, 1);
        assert_eq!(assembled.request.aspect_ratio, None);
    }

    #[test]
    fn images_are_dropped_or_capped_by_model_capability() {
        let urls = vec!["1.png".to_string(), "2.png".to_string(), "3.png".to_string()];

        let no_images = seed_guidance_model();
        let assembled = assemble_request(
            &no_images,
            &user(),
            AssemblyInput::new("x").with_images(urls.clone()),
        )
        .expect("valid settings");
        assert_eq!(assembled.request.images, ImageInput::None);

        let multi = seed_guidance_model().with_image_input(true).with_max_images(2);
        let assembled =
            assemble_request(&multi, &user(), AssemblyInput::new("x").with_images(urls))
                .expect("valid settings");
        assert_eq!(
            assembled.request.images,
            ImageInput::Multiple(vec!["1.png".to_string(), "2.png".to_string()])
        );
    }

    #[test]
    fn style_is_applied_to_the_prompt() {
        let style = StyleTemplate {
            id: "cinematic".to_string(),
            name: "Cinematic".to_string(),
            prompt: "cinematic still, {prompt}".to_string(),
        };
        let assembled = assemble_request(
            &seed_guidance_model(),
            &user(),
            AssemblyInput::new("a harbor").with_style(Some(&style)),
        )
        .expect("valid settings");
        assert_eq!(assembled.request.prompt, "cinematic still, a harbor");
    }
}
