use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(
        "API token not configured. Set WEBDOCK_TOKEN or add `token` to one of:\n\
        - ./webdock.yaml, ./.webdock.yaml\n\
        - ~/.config/webdock/config.yaml\n\
        or point WEBDOCK_CONFIG_PATH at a config file"
    )]
    MissingToken,

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid value for {name}: {value:?}")]
    InvalidEnv { name: &'static str, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
