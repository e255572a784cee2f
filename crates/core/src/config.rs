use std::path::Path;

use serde::Deserialize;

use crate::error::AudienceResult;

/// Root application configuration. Loaded from an optional TOML file and
/// environment variables with the prefix `AUDIENCE_STUDIO__`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub evaluator: EvaluatorConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_filter")]
    pub filter: String,
    #[serde(default = "default_log_json")]
    pub json: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EvaluatorConfig {
    /// Outcome of a complete condition whose field is absent from the record.
    #[serde(default = "default_missing_field_matches")]
    pub missing_field_matches: bool,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RegistryConfig {
    /// JSON catalog replacing the built-in field registry.
    #[serde(default)]
    pub catalog_path: Option<String>,
}

// Default functions
fn default_log_filter() -> String {
    "audience_cli=info,audience_segmentation=info".to_string()
}
fn default_log_json() -> bool {
    false
}
fn default_missing_field_matches() -> bool {
    false
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            json: default_log_json(),
        }
    }
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            missing_field_matches: default_missing_field_matches(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log: LogConfig::default(),
            evaluator: EvaluatorConfig::default(),
            registry: RegistryConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables and an optional config file.
    pub fn load(file: Option<&Path>) -> AudienceResult<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        let builder = builder.add_source(
            config::Environment::with_prefix("AUDIENCE_STUDIO")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }
}
