//! Domain-specific error types for waste-advisor

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::clients::ClassifierError;

/// Message shown to end users whenever the upstream classifier fails.
pub const CLASSIFICATION_UNAVAILABLE: &str =
    "Classification is unavailable right now. Please try again later.";

/// Main error type for the waste-advisor service
#[derive(Error, Debug)]
pub enum WasteAdvisorError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid image: {message}")]
    Validation { message: String },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Classifier unavailable: {source}")]
    ClassifierUnavailable {
        #[from]
        source: ClassifierError,
    },

    #[error("Advice table error: {message}")]
    AdviceTable { message: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl From<anyhow::Error> for WasteAdvisorError {
    fn from(err: anyhow::Error) -> Self {
        WasteAdvisorError::Internal {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for WasteAdvisorError {
    fn from(err: serde_json::Error) -> Self {
        WasteAdvisorError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for WasteAdvisorError {
    fn from(err: toml::de::Error) -> Self {
        WasteAdvisorError::Config {
            message: format!("Invalid TOML: {}", err),
        }
    }
}

impl WasteAdvisorError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            WasteAdvisorError::Validation { .. } | WasteAdvisorError::InvalidRequest { .. } => {
                StatusCode::BAD_REQUEST
            }
            WasteAdvisorError::ClassifierUnavailable { .. } => StatusCode::BAD_GATEWAY,
            WasteAdvisorError::Config { .. }
            | WasteAdvisorError::AdviceTable { .. }
            | WasteAdvisorError::Serialization { .. }
            | WasteAdvisorError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Text safe to show an end user. Upstream and internal details stay in the logs.
    pub fn user_message(&self) -> String {
        match self {
            WasteAdvisorError::Validation { message } => format!("Invalid image: {message}"),
            WasteAdvisorError::InvalidRequest { message } => message.clone(),
            WasteAdvisorError::ClassifierUnavailable { .. } => {
                CLASSIFICATION_UNAVAILABLE.to_string()
            }
            _ => "Something went wrong on our side. Please try again.".to_string(),
        }
    }

    pub fn hint(&self) -> Option<&'static str> {
        match self {
            WasteAdvisorError::ClassifierUnavailable { source } => source.hint(),
            _ => None,
        }
    }
}

impl IntoResponse for WasteAdvisorError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("{}", self);
        } else {
            tracing::debug!("{}", self);
        }

        let mut body = json!({
            "success": false,
            "error": self.user_message(),
        });
        if let Some(hint) = self.hint() {
            body["hint"] = json!(hint);
        }
        (status, Json(body)).into_response()
    }
}

/// Result type alias for waste-advisor operations
pub type Result<T> = std::result::Result<T, WasteAdvisorError>;
