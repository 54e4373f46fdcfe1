//! Process-lifetime model catalog loaded from JSON configuration.
//!
//! ```rust
//! use kcatalog::{MediaType, ModelCatalog};
//!
//! let models = r#"[
//!     {"id": "flux", "replicate_id": "black-forest-labs/flux-dev", "cost": 2},
//!     {"id": "old", "replicate_id": "someone/old", "enabled": false}
//! ]"#;
//! let catalog = ModelCatalog::builder()
//!     .models(kcatalog::parse_entries("models.json", models).expect("valid json"))
//!     .build()
//!     .expect("valid catalog");
//!
//! assert!(catalog.model("flux").is_some());
//! assert!(catalog.model("old").is_none());
//! assert_eq!(catalog.models_of_type(MediaType::Image).len(), 1);
//! ```

use std::path::Path;

use kcommon::Registry;
use serde::de::DeserializeOwned;

use crate::error::CatalogError;
use crate::model::{
    CreditPackage, MediaType, ModelDefinition, Parameter, PromptTemplate, ProviderEntry,
    StyleTemplate,
};

/// Parses a JSON array of catalog entries. `source` names the input in errors.
pub fn parse_entries<T>(source: &str, json: &str) -> Result<Vec<T>, CatalogError>
where
    T: DeserializeOwned,
{
    serde_json::from_str(json)
        .map_err(|err| CatalogError::parse(format!("could not parse {source}: {err}")))
}

pub fn load_entries<T>(path: impl AsRef<Path>) -> Result<Vec<T>, CatalogError>
where
    T: DeserializeOwned,
{
    let path = path.as_ref();
    let json = std::fs::read_to_string(path)
        .map_err(|err| CatalogError::io(format!("could not read {}: {err}", path.display())))?;
    parse_entries(&path.display().to_string(), &json)
}

#[derive(Debug, Clone, Default)]
pub struct ModelCatalog {
    models: Registry<String, ModelDefinition>,
    providers: Registry<String, ProviderEntry>,
    styles: Registry<String, StyleTemplate>,
    templates: Registry<String, PromptTemplate>,
    packages: Registry<String, CreditPackage>,
}

impl ModelCatalog {
    pub fn builder() -> ModelCatalogBuilder {
        ModelCatalogBuilder::default()
    }

    pub fn model(&self, id: &str) -> Option<&ModelDefinition> {
        self.models.get(id)
    }

    pub fn has_model(&self, id: &str) -> bool {
        self.models.contains_key(id)
    }

    pub fn parameter(&self, model_id: &str, name: &str) -> Option<&Parameter> {
        self.model(model_id)?.parameter(name)
    }

    pub fn provider(&self, id: &str) -> Option<&ProviderEntry> {
        self.providers.get(id)
    }

    pub fn style(&self, id: &str) -> Option<&StyleTemplate> {
        self.styles.get(id)
    }

    pub fn has_style(&self, id: &str) -> bool {
        self.styles.contains_key(id)
    }

    pub fn template(&self, id: &str) -> Option<&PromptTemplate> {
        self.templates.get(id)
    }

    pub fn package(&self, id: &str) -> Option<&CreditPackage> {
        self.packages.get(id)
    }

    pub fn models(&self) -> impl Iterator<Item = &ModelDefinition> {
        self.models.values()
    }

    pub fn styles(&self) -> impl Iterator<Item = &StyleTemplate> {
        self.styles.values()
    }

    pub fn templates(&self) -> impl Iterator<Item = &PromptTemplate> {
        self.templates.values()
    }

    pub fn has_templates(&self) -> bool {
        !self.templates.is_empty()
    }

    pub fn packages(&self) -> impl Iterator<Item = &CreditPackage> {
        self.packages.values()
    }

    pub fn models_of_type(&self, media_type: MediaType) -> Vec<&ModelDefinition> {
        self.models
            .values()
            .filter(|model| model.media_type == media_type)
            .collect()
    }

    /// Models of `media_type` whose provider reference starts with `<provider_id>/`.
    pub fn models_for_provider(
        &self,
        provider_id: &str,
        media_type: MediaType,
    ) -> Vec<&ModelDefinition> {
        self.models
            .values()
            .filter(|model| model.media_type == media_type)
            .filter(|model| model.provider_id() == Some(provider_id))
            .collect()
    }

    /// Providers offering at least one model of `media_type`, in catalog order.
    pub fn providers_for(&self, media_type: MediaType) -> Vec<&ProviderEntry> {
        self.providers
            .values()
            .filter(|provider| !self.models_for_provider(&provider.id, media_type).is_empty())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ModelCatalogBuilder {
    models: Vec<ModelDefinition>,
    providers: Vec<ProviderEntry>,
    styles: Vec<StyleTemplate>,
    templates: Vec<PromptTemplate>,
    packages: Vec<CreditPackage>,
}

impl ModelCatalogBuilder {
    pub fn models(mut self, models: Vec<ModelDefinition>) -> Self {
        self.models = models;
        self
    }

    pub fn model(mut self, model: ModelDefinition) -> Self {
        self.models.push(model);
        self
    }

    pub fn providers(mut self, providers: Vec<ProviderEntry>) -> Self {
        self.providers = providers;
        self
    }

    pub fn styles(mut self, styles: Vec<StyleTemplate>) -> Self {
        self.styles = styles;
        self
    }

    pub fn templates(mut self, templates: Vec<PromptTemplate>) -> Self {
        self.templates = templates;
        self
    }

    pub fn packages(mut self, packages: Vec<CreditPackage>) -> Self {
        self.packages = packages;
        self
    }

    /// Validates every entry, drops disabled models and rejects duplicate ids.
    pub fn build(self) -> Result<ModelCatalog, CatalogError> {
        let mut catalog = ModelCatalog::default();

        for model in self.models.into_iter().filter(|model| model.enabled) {
            model.validate()?;
            catalog
                .models
                .try_insert(model.id.clone(), model)
                .map_err(|model| {
                    CatalogError::duplicate(format!("model '{}' is declared twice", model.id))
                })?;
        }

        for provider in self.providers {
            catalog
                .providers
                .try_insert(provider.id.clone(), provider)
                .map_err(|provider| {
                    CatalogError::duplicate(format!("provider '{}' is declared twice", provider.id))
                })?;
        }

        for style in self.styles {
            catalog
                .styles
                .try_insert(style.id.clone(), style)
                .map_err(|style| {
                    CatalogError::duplicate(format!("style '{}' is declared twice", style.id))
                })?;
        }

        for template in self.templates {
            if template.prompt.trim().is_empty() {
                return Err(CatalogError::invalid(format!(
                    "template '{}' has no prompt",
                    template.id
                )));
            }
            catalog
                .templates
                .try_insert(template.id.clone(), template)
                .map_err(|template| {
                    CatalogError::duplicate(format!("template '{}' is declared twice", template.id))
                })?;
        }

        for package in self.packages {
            if package.credits_amount == 0 {
                return Err(CatalogError::invalid(format!(
                    "package '{}' grants no credits",
                    package.id
                )));
            }
            catalog
                .packages
                .try_insert(package.id.clone(), package)
                .map_err(|package| {
                    CatalogError::duplicate(format!("package '{}' is declared twice", package.id))
                })?;
        }

        Ok(catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CatalogErrorKind;

    fn provider(id: &str) -> ProviderEntry {
        ProviderEntry {
            id: id.to_string(),
            name: id.to_uppercase(),
            description: String::new(),
        }
    }

    fn catalog() -> ModelCatalog {
        ModelCatalog::builder()
            .model(ModelDefinition::new("flux", "bfl/flux-dev", MediaType::Image))
            .model(ModelDefinition::new("kontext", "bfl/kontext", MediaType::Image))
            .model(ModelDefinition::new("veo", "google/veo-3", MediaType::Video))
            .model(ModelDefinition::new("gemini", "google/gemini-2.5-flash", MediaType::Text))
            .providers(vec![provider("bfl"), provider("google"), provider("idle")])
            .build()
            .expect("catalog should build")
    }

    #[test]
    fn providers_are_filtered_by_media_type_of_their_models() {
        let catalog = catalog();

        let image_providers = catalog
            .providers_for(MediaType::Image)
            .into_iter()
            .map(|provider| provider.id.as_str())
            .collect::<Vec<_>>();
        assert_eq!(image_providers, vec!["bfl"]);

        let video_providers = catalog.providers_for(MediaType::Video);
        assert_eq!(video_providers.len(), 1);
        assert_eq!(video_providers[0].id, "google");
    }

    #[test]
    fn models_for_provider_keep_catalog_order() {
        let catalog = catalog();
        let ids = catalog
            .models_for_provider("bfl", MediaType::Image)
            .into_iter()
            .map(|model| model.id.as_str())
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["flux", "kontext"]);
        assert!(catalog.models_for_provider("bfl", MediaType::Video).is_empty());
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let err = ModelCatalog::builder()
            .model(ModelDefinition::new("flux", "bfl/flux-dev", MediaType::Image))
            .model(ModelDefinition::new("flux", "bfl/flux-pro", MediaType::Image))
            .build()
            .expect_err("duplicate model must fail");
        assert_eq!(err.kind, CatalogErrorKind::Duplicate);
    }

    #[test]
    fn disabled_models_are_skipped_before_duplicate_checks() {
        let mut disabled = ModelDefinition::new("flux", "bfl/flux-old", MediaType::Image);
        disabled.enabled = false;

        let catalog = ModelCatalog::builder()
            .model(disabled)
            .model(ModelDefinition::new("flux", "bfl/flux-dev", MediaType::Image))
            .build()
            .expect("disabled duplicate is ignored");
        assert_eq!(
            catalog.model("flux").map(|model| model.provider_ref.as_str()),
            Some("bfl/flux-dev")
        );
    }

    #[test]
    fn entries_parse_from_json_and_report_bad_input() {
        let styles: Vec<StyleTemplate> = parse_entries(
            "styles.json",
            r#"[{"id": "noir", "title": "Noir", "prompt": "noir film, {prompt}"}]"#,
        )
        .expect("styles should parse");
        assert_eq!(styles[0].name, "Noir");

        let err = parse_entries::<CreditPackage>("packages.json", "{oops")
            .expect_err("broken json must fail");
        assert_eq!(err.kind, CatalogErrorKind::Parse);
        assert!(err.message.contains("packages.json"));

        let err = load_entries::<ProviderEntry>("/nonexistent/providers.json")
            .expect_err("missing file must fail");
        assert_eq!(err.kind, CatalogErrorKind::Io);
    }

    #[test]
    fn templates_keep_file_order_and_need_a_prompt() {
        let templates: Vec<PromptTemplate> = parse_entries(
            "templates.json",
            r#"[
                {"id": "portrait", "title": "Studio portrait", "prompt": "studio portrait, soft light"},
                {"id": "poster", "title": "Poster", "prompt": "retro travel poster of a harbor"}
            ]"#,
        )
        .expect("templates should parse");
        let catalog = ModelCatalog::builder()
            .templates(templates)
            .build()
            .expect("catalog should build");

        let ids = catalog
            .templates()
            .map(|template| template.id.as_str())
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["portrait", "poster"]);
        assert_eq!(
            catalog.template("poster").map(|template| template.title.as_str()),
            Some("Poster")
        );

        let err = ModelCatalog::builder()
            .templates(vec![PromptTemplate::new("blank", "Blank", "  ")])
            .build()
            .expect_err("blank template must fail");
        assert_eq!(err.kind, CatalogErrorKind::Invalid);
    }

    #[test]
    fn packages_must_grant_credits() {
        let err = ModelCatalog::builder()
            .packages(vec![CreditPackage {
                id: "free".to_string(),
                stars_amount: 10,
                credits_amount: 0,
                title: String::new(),
                description: String::new(),
            }])
            .build()
            .expect_err("empty package must fail");
        assert_eq!(err.kind, CatalogErrorKind::Invalid);
    }
}
