use std::path::PathBuf;

use config::{builder::DefaultState, Config, ConfigBuilder, ConfigError, Environment, File};
use error_stack::{Result, ResultExt};
use thiserror::Error;

pub const DEFAULT_BUSINESS_CONFIG: &str = "config.json";
pub const DEFAULT_SERVICE_ACCOUNT: &str = "service_account.json";
pub const DEFAULT_SOURCE: &str = "Code.gs";
pub const DEFAULT_SCRIPT_API_URL: &str = "https://script.googleapis.com/v1";

#[derive(serde::Deserialize, Debug, Clone)]
pub struct AppConfig {
    pub files: FilesConfig,
    pub script: ScriptApiConfig,
}

/// Locations of the three local inputs, relative to the working directory
/// unless absolute.
#[derive(serde::Deserialize, Debug, Clone)]
pub struct FilesConfig {
    pub business_config: PathBuf,
    pub service_account: PathBuf,
    pub source: PathBuf,
}

#[derive(serde::Deserialize, Debug, Clone)]
pub struct ScriptApiConfig {
    pub base_url: Box<str>,
}

#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("could not build tool settings")]
    Build,
    #[error("tool settings have an unexpected shape")]
    Deserialize,
}

impl AppConfig {
    /// Defaults, then an optional `Deploy.*` file, then `DEPLOY_*` variables.
    pub fn load() -> Result<Self, AppConfigError> {
        Self::from_sources("Deploy", Self::environment())
    }

    /// Layers the file named `file` (any extension `config` knows, optional)
    /// and then `env` over the defaults.
    fn from_sources(file: &str, env: Environment) -> Result<Self, AppConfigError> {
        Self::builder()
            .change_context(AppConfigError::Build)?
            .add_source(File::with_name(file).required(false))
            .add_source(env)
            .build()
            .change_context(AppConfigError::Build)?
            .try_deserialize()
            .change_context(AppConfigError::Deserialize)
    }

    fn environment() -> Environment {
        Environment::with_prefix("DEPLOY")
            .prefix_separator("_")
            .separator("__")
    }

    /// Built-in settings only.
    #[cfg(test)]
    pub(crate) fn defaults() -> Self {
        Self::builder()
            .and_then(|builder| builder.build())
            .and_then(|config| config.try_deserialize())
            .unwrap()
    }

    fn builder() -> std::result::Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            .set_default("files.business_config", DEFAULT_BUSINESS_CONFIG)?
            .set_default("files.service_account", DEFAULT_SERVICE_ACCOUNT)?
            .set_default("files.source", DEFAULT_SOURCE)?
            .set_default("script.base_url", DEFAULT_SCRIPT_API_URL)
    }
}
