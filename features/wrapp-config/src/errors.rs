use std::sync::Arc;

/// Errors when reading a config
#[derive(thiserror::Error, Debug, Clone)]
pub enum ConfigError {
    /// The required value is not set
    #[error("The config value '{0}' is not set")]
    MissingValue(String),

    /// The required section is not set
    #[error("The config section '{0}' is not set")]
    MissingSection(String),

    /// The node exists, but holds a plain value
    #[error("The config node '{0}' is not a section")]
    NotASection(String),

    /// The value does not deserialize into the requested type
    #[error("The config value '{key}' is invalid - error: {error}")]
    InvalidValue {
        key: String,
        error: Arc<serde_json::Error>,
    },
}
