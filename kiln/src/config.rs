//! Environment-driven configuration.
//!
//! ```rust
//! use std::time::Duration;
//!
//! use kiln::KilnConfig;
//!
//! let config = KilnConfig::from_lookup(|key| match key {
//!     "REPLICATE_API_TOKEN" => Some("r8_example".to_string()),
//!     "KILN_GENERATION_TIMEOUT_SECS" => Some("90".to_string()),
//!     _ => None,
//! })
//! .expect("config should load");
//!
//! assert_eq!(config.generation_timeout, Duration::from_secs(90));
//! assert_eq!(config.daily_free_credits, 5);
//! ```

use std::fmt::{Debug, Formatter};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use kcommon::UserId;

use crate::error::KilnError;
use crate::util::parse_admin_ids;

pub const TOKEN_VAR: &str = "REPLICATE_API_TOKEN";
pub const DEFAULT_PROVIDER_BASE_URL: &str = "https://api.replicate.com/v1";

#[derive(Clone, PartialEq, Eq)]
pub struct KilnConfig {
    pub provider_token: String,
    pub provider_base_url: String,
    pub models_file: PathBuf,
    pub providers_file: PathBuf,
    pub styles_file: PathBuf,
    pub templates_file: PathBuf,
    pub packages_file: PathBuf,
    pub admin_ids: Vec<UserId>,
    pub generation_timeout: Duration,
    pub completion_timeout: Duration,
    pub assist_model: String,
    pub daily_free_credits: u32,
}

impl KilnConfig {
    /// Reads the process environment after loading `.env` when one exists.
    pub fn from_env() -> Result<Self, KilnError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, KilnError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let provider_token = value(TOKEN_VAR)
            .ok_or_else(|| KilnError::config(format!("{TOKEN_VAR} must be set")))?;

        let admin_ids = match value("KILN_ADMIN_IDS") {
            Some(raw) => parse_admin_ids(&raw).ok_or_else(|| {
                KilnError::config(format!("KILN_ADMIN_IDS is not a list of user ids: '{raw}'"))
            })?,
            None => Vec::new(),
        };

        Ok(Self {
            provider_token,
            provider_base_url: value("KILN_PROVIDER_BASE_URL")
                .unwrap_or_else(|| DEFAULT_PROVIDER_BASE_URL.to_string()),
            models_file: value("KILN_MODELS_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("config/models.json")),
            providers_file: value("KILN_PROVIDERS_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("config/providers.json")),
            styles_file: value("KILN_STYLES_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("config/styles.json")),
            templates_file: value("KILN_TEMPLATES_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("config/templates.json")),
            packages_file: value("KILN_PACKAGES_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("config/packages.json")),
            admin_ids,
            generation_timeout: Duration::from_secs(parse_or(
                "KILN_GENERATION_TIMEOUT_SECS",
                value("KILN_GENERATION_TIMEOUT_SECS"),
                300,
            )?),
            completion_timeout: Duration::from_secs(parse_or(
                "KILN_COMPLETION_TIMEOUT_SECS",
                value("KILN_COMPLETION_TIMEOUT_SECS"),
                120,
            )?),
            assist_model: value("KILN_ASSIST_MODEL")
                .unwrap_or_else(|| "google/gemini-2.5-flash".to_string()),
            daily_free_credits: parse_or(
                "KILN_DAILY_FREE_CREDITS",
                value("KILN_DAILY_FREE_CREDITS"),
                5,
            )?,
        })
    }
}

impl Debug for KilnConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KilnConfig")
            .field("provider_token", &"[REDACTED]")
            .field("provider_base_url", &self.provider_base_url)
            .field("models_file", &self.models_file)
            .field("providers_file", &self.providers_file)
            .field("styles_file", &self.styles_file)
            .field("templates_file", &self.templates_file)
            .field("packages_file", &self.packages_file)
            .field("admin_ids", &self.admin_ids)
            .field("generation_timeout", &self.generation_timeout)
            .field("completion_timeout", &self.completion_timeout)
            .field("assist_model", &self.assist_model)
            .field("daily_free_credits", &self.daily_free_credits)
            .finish()
    }
}

fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> Result<T, KilnError>
where
    T: FromStr,
{
    match raw {
        Some(raw) => raw.parse().map_err(|_| {
            KilnError::config(format!("{key} must be a non-negative integer, got '{raw}'"))
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::time::Duration;

    use kcommon::UserId;

    use super::{DEFAULT_PROVIDER_BASE_URL, KilnConfig};
    use crate::KilnErrorKind;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_the_token_is_set() {
        let config = KilnConfig::from_lookup(lookup(&[("REPLICATE_API_TOKEN", "r8_token")]))
            .expect("config should load");

        assert_eq!(config.provider_token, "r8_token");
        assert_eq!(config.provider_base_url, DEFAULT_PROVIDER_BASE_URL);
        assert_eq!(config.models_file, PathBuf::from("config/models.json"));
        assert_eq!(config.templates_file, PathBuf::from("config/templates.json"));
        assert_eq!(config.packages_file, PathBuf::from("config/packages.json"));
        assert!(config.admin_ids.is_empty());
        assert_eq!(config.generation_timeout, Duration::from_secs(300));
        assert_eq!(config.completion_timeout, Duration::from_secs(120));
        assert_eq!(config.assist_model, "google/gemini-2.5-flash");
        assert_eq!(config.daily_free_credits, 5);
    }

    #[test]
    fn overrides_are_read_from_the_environment() {
        let config = KilnConfig::from_lookup(lookup(&[
            ("REPLICATE_API_TOKEN", "r8_token"),
            ("KILN_PROVIDER_BASE_URL", "http://localhost:8080/v1"),
            ("KILN_MODELS_FILE", "/etc/kiln/models.json"),
            ("KILN_ADMIN_IDS", "42, 7"),
            ("KILN_COMPLETION_TIMEOUT_SECS", "30"),
            ("KILN_DAILY_FREE_CREDITS", "10"),
        ]))
        .expect("config should load");

        assert_eq!(config.provider_base_url, "http://localhost:8080/v1");
        assert_eq!(config.models_file, PathBuf::from("/etc/kiln/models.json"));
        assert_eq!(config.admin_ids, vec![UserId::new(42), UserId::new(7)]);
        assert_eq!(config.completion_timeout, Duration::from_secs(30));
        assert_eq!(config.daily_free_credits, 10);
    }

    #[test]
    fn missing_token_is_a_config_error() {
        let err = KilnConfig::from_lookup(lookup(&[("REPLICATE_API_TOKEN", "  ")]))
            .expect_err("blank token should be rejected");
        assert_eq!(err.kind, KilnErrorKind::Config);
        assert!(err.message.contains("REPLICATE_API_TOKEN"));
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        let err = KilnConfig::from_lookup(lookup(&[
            ("REPLICATE_API_TOKEN", "r8_token"),
            ("KILN_GENERATION_TIMEOUT_SECS", "five minutes"),
        ]))
        .expect_err("non-numeric timeout should be rejected");
        assert!(err.message.contains("KILN_GENERATION_TIMEOUT_SECS"));

        let err = KilnConfig::from_lookup(lookup(&[
            ("REPLICATE_API_TOKEN", "r8_token"),
            ("KILN_ADMIN_IDS", "42,alice"),
        ]))
        .expect_err("non-numeric admin id should be rejected");
        assert!(err.message.contains("KILN_ADMIN_IDS"));
    }

    #[test]
    fn debug_output_redacts_the_token() {
        let config = KilnConfig::from_lookup(lookup(&[("REPLICATE_API_TOKEN", "r8_secret")]))
            .expect("config should load");
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("r8_secret"));
        assert!(rendered.contains("[REDACTED]"));
    }
}
