use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {env_var}")]
    MissingEnvVar { env_var: String },
    #[error("Configuration error: {0}")]
    Other(#[from] config::ConfigError),
}

// Map a configuration path such as `api.key` to the variable that overrides it
pub fn to_env_var(field_path: &str) -> String {
    format!("LLAMA_{}", field_path.replace('.', "__").to_uppercase())
}
