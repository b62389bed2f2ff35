use crate::error::{to_env_var, ConfigError};
use config::{Config, Environment, File, FileFormat};
use llama::connection::{DEFAULT_CHAT_ENDPOINT, DEFAULT_HOST, DEFAULT_MODEL, DEFAULT_TIMEOUT};
use llama::ConnectionConfig;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "config/configuration.toml";

#[derive(Debug, Deserialize)]
pub struct ApiSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default)]
    pub key: String,
    /// Request timeout in milliseconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

#[derive(Debug, Deserialize)]
pub struct EndpointSettings {
    #[serde(default = "default_chat_endpoint")]
    pub chat: String,
}

#[derive(Debug, Deserialize)]
pub struct ModelSettings {
    #[serde(default = "default_model")]
    pub default: String,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub api: ApiSettings,
    pub endpoints: EndpointSettings,
    pub model: ModelSettings,
}

impl Settings {
    /// Resolve settings from defaults, then `config_file` (or the default file when it
    /// exists), then `LLAMA_*` environment variables.
    pub fn new(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_and_validate(config_file)
    }

    fn load_and_validate(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        // An explicitly named file must exist, the default one is optional
        let file = match config_file {
            Some(path) => File::from(path).format(FileFormat::Toml).required(true),
            None => File::new(DEFAULT_CONFIG_FILE, FileFormat::Toml).required(false),
        };

        let config = Config::builder()
            .set_default("api.host", default_host())?
            .set_default("api.timeout", default_timeout())?
            .set_default("endpoints.chat", default_chat_endpoint())?
            .set_default("model.default", default_model())?
            .add_source(file)
            .add_source(
                Environment::with_prefix("LLAMA")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Self = match config.try_deserialize() {
            Ok(settings) => settings,
            Err(err) => {
                tracing::debug!("Configuration error: {:?}", &err);

                return Err(match &err {
                    config::ConfigError::NotFound(field) => ConfigError::MissingEnvVar {
                        env_var: to_env_var(field),
                    },
                    _ => ConfigError::Other(err),
                });
            }
        };

        if settings.api.key.is_empty() {
            return Err(ConfigError::MissingEnvVar {
                env_var: to_env_var("api.key"),
            });
        }

        Ok(settings)
    }

    pub fn into_connection_config(self) -> ConnectionConfig {
        ConnectionConfig::new(self.api.host, self.model.default, self.api.key)
            .with_endpoint(self.endpoints.chat)
            .with_timeout(Duration::from_millis(self.api.timeout))
    }
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT.as_millis() as u64
}

fn default_chat_endpoint() -> String {
    DEFAULT_CHAT_ENDPOINT.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}
