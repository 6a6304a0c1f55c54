use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShopError {
    #[error("Missing lat or lng parameters")]
    MissingCoordinates,

    #[error("Invalid lat or lng: {0}")]
    InvalidCoordinates(String),

    #[error("Shop lookup request failed: {0}")]
    Upstream(String),

    #[error("Shop lookup did not answer within {0:?}")]
    Timeout(Duration),

    #[error("Unexpected shop lookup response: {0}")]
    MalformedResponse(String),
}

impl ShopError {
    /// True when the caller sent bad coordinates
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::MissingCoordinates | Self::InvalidCoordinates(_))
    }

    /// Message safe to show to the end user
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::MissingCoordinates => "Missing lat or lng parameters",
            Self::InvalidCoordinates(_) => "Invalid lat or lng",
            Self::Upstream(_) | Self::Timeout(_) | Self::MalformedResponse(_) => {
                "Shop lookup service unavailable"
            }
        }
    }
}

impl From<reqwest::Error> for ShopError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::MalformedResponse(err.to_string())
        } else {
            Self::Upstream(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, ShopError>;
