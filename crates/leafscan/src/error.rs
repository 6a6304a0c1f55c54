use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LeafError {
    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Inference did not finish within {0:?}")]
    Timeout(Duration),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Failed to encode preview: {0}")]
    Preview(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),
}

impl LeafError {
    /// Message safe to show to the end user. Internal details stay in the logs.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Decode(_) => "Please provide a valid image.",
            Self::Inference(_) | Self::Timeout(_) | Self::Preview(_) => "Could not analyze image.",
            Self::Configuration(_) | Self::Io(_) | Self::Json(_) | Self::TomlDe(_) | Self::TomlSer(_) => {
                "The classifier is misconfigured. Please try again later."
            }
        }
    }

    /// True when the caller sent bad input, as opposed to a fault on our side.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Decode(_))
    }
}

pub type Result<T> = std::result::Result<T, LeafError>;
