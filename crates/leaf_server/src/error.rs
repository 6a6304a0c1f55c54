//! API error types

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use leafscan::LeafError;
use serde::Serialize;
use shops::ShopError;
use thiserror::Error;
use tracing::{error, warn};

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;

/// API error with HTTP status code
#[derive(Debug, Clone, Serialize, Error)]
pub struct ApiError {
    #[serde(skip)]
    pub status: StatusCode,

    /// Message shown to the user
    pub message: String,

    /// Stable code for client handling
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            code: None,
        }
    }

    pub fn with_code(status: StatusCode, message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            code: Some(code.into()),
        }
    }

    /// 400 Bad Request
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::with_code(StatusCode::BAD_REQUEST, message, "BAD_REQUEST")
    }

    /// 500 Internal Server Error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::with_code(StatusCode::INTERNAL_SERVER_ERROR, message, "INTERNAL_ERROR")
    }

    /// 503 Service Unavailable
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::with_code(StatusCode::SERVICE_UNAVAILABLE, message, "SERVICE_UNAVAILABLE")
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match &self.code {
            Some(code) => write!(f, "[{}] [{}] {}", self.status.as_u16(), code, self.message),
            None => write!(f, "[{}] {}", self.status.as_u16(), self.message),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({
            "success": false,
            "error": self.message,
            "code": self.code,
        }));

        (self.status, body).into_response()
    }
}

impl From<LeafError> for ApiError {
    fn from(err: LeafError) -> Self {
        let message = err.user_message();
        if err.is_client_error() {
            warn!("Rejected image: {}", err);
            return Self::with_code(StatusCode::BAD_REQUEST, message, "INVALID_IMAGE");
        }

        match &err {
            LeafError::Timeout(_) => {
                error!("{}", err);
                Self::with_code(StatusCode::GATEWAY_TIMEOUT, message, "INFERENCE_TIMEOUT")
            }
            LeafError::Inference(_) | LeafError::Preview(_) => {
                error!("{}", err);
                Self::with_code(StatusCode::INTERNAL_SERVER_ERROR, message, "INFERENCE_FAILED")
            }
            _ => {
                error!("Classifier configuration defect: {}", err);
                Self::internal(message)
            }
        }
    }
}

impl From<ShopError> for ApiError {
    fn from(err: ShopError) -> Self {
        let message = err.user_message();
        if !err.is_client_error() {
            error!("Shop lookup failed: {}", err);
            return Self::unavailable(message);
        }

        warn!("Rejected coordinates: {}", err);
        let code = match err {
            ShopError::MissingCoordinates => "MISSING_COORDINATES",
            _ => "INVALID_COORDINATES",
        };
        Self::with_code(StatusCode::BAD_REQUEST, message, code)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::with_code(rejection.status(), rejection.body_text(), "INVALID_REQUEST")
    }
}

/// Startup and serving failures
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Invalid server config: {0}")]
    Config(String),

    #[error("Failed to bind to {addr}: {source}")]
    Bind {
        addr: std::net::SocketAddr,
        source: std::io::Error,
    },

    #[error("Server error: {0}")]
    Serve(#[from] std::io::Error),
}
