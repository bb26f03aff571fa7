//! Errors raised by record store backends

use serde::Deserialize;
use std::fmt;
use thiserror::Error;

/// Error body returned by PostgREST
#[derive(Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct ApiErrorDetails {
    pub code: Option<String>,
    pub message: Option<String>,
    pub details: Option<String>,
    pub hint: Option<String>,
}

impl fmt::Display for ApiErrorDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(code) = &self.code {
            parts.push(format!("Code: {}", code));
        }
        if let Some(message) = &self.message {
            parts.push(format!("Message: {}", message));
        }
        if let Some(details) = &self.details {
            parts.push(format!("Details: {}", details));
        }
        if let Some(hint) = &self.hint {
            parts.push(format!("Hint: {}", hint));
        }
        write!(f, "{}", parts.join(", "))
    }
}

/// Any failing record store call
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("API error: {details} (Status: {status})")]
    Api {
        details: ApiErrorDetails,
        status: reqwest::StatusCode,
    },

    #[error("API error (unparsed): {message} (Status: {status})")]
    UnparsedApi {
        message: String,
        status: reqwest::StatusCode,
    },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// The backend refused a write because of a store-side rule
    #[error("Constraint violated: {0}")]
    Constraint(String),

    /// The backend could not be reached or refused to serve the call
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Build an error from a non-success response body
    pub(crate) fn from_response(status: reqwest::StatusCode, body: String) -> Self {
        match serde_json::from_str::<ApiErrorDetails>(&body) {
            Ok(details) => StoreError::Api { details, status },
            Err(_) => StoreError::UnparsedApi {
                message: body,
                status,
            },
        }
    }
}
