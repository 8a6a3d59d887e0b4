use std::io::Error as IoError;

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use keepalive::{ConfigError, FetchError, RegistryError, StoreError};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Start-up failures of the binary
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0:#}")]
    Io(#[from] IoError),
    #[error("Address parsing error: {0}")]
    AddrParse(#[from] std::net::AddrParseError),
    #[error("Configuration error: {0}")]
    Config(#[from] keepalive::config::Error),
    #[error("Invalid schedule: {0}")]
    Schedule(#[from] ConfigError),
    #[error("HTTP client error: {0}")]
    Fetch(#[from] FetchError),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("No key-value store configured")]
    NoStore,
}

/// Errors answered by the HTTP API, always as `{"error": "..."}`
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("verification code is incorrect, check it and try again")]
    Unauthorized,
    #[error("domain does not exist")]
    NotFound,
    #[error("{0}")]
    Unavailable(String),
    #[error("{0}")]
    Internal(String),
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::Validation(message) => ApiError::Validation(message),
            RegistryError::Unauthorized => ApiError::Unauthorized,
            RegistryError::NotFound(_) => ApiError::NotFound,
            err @ (RegistryError::Storage(_) | RegistryError::Corrupt { .. }) => {
                error!("Registry operation failed: {}", err);
                ApiError::Internal("storage operation failed".to_string())
            }
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            // A missing domain is a plain bad request, only a code mismatch is 401
            ApiError::Validation(_) | ApiError::NotFound => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Unavailable(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}
