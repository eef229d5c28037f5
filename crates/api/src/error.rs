use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Message carried by [`ConnectorError::Unauthorized`].
pub const UNAUTHORIZED_MESSAGE: &str = "Invalid or expired credentials";

/// Structured error body returned by Jira and Confluence.
///
/// Only bodies carrying `errorMessages` count as structured; `errors` is the
/// optional per-field map Jira adds on validation failures.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(rename = "errorMessages")]
    pub error_messages: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub errors: BTreeMap<String, String>,
}

impl ErrorResponse {
    /// Single-message response used when the server gave nothing decodable.
    pub fn from_message(message: impl Into<String>) -> Self {
        Self {
            error_messages: vec![message.into()],
            errors: BTreeMap::new(),
        }
    }

    /// Decode a structured error body, `None` when the body does not match.
    pub fn decode(body: &[u8]) -> Option<Self> {
        serde_json::from_slice(body).ok()
    }

    pub fn messages(&self) -> &[String] {
        &self.error_messages
    }
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = self.error_messages.clone();
        parts.extend(
            self.errors
                .iter()
                .map(|(field, message)| format!("{field}: {message}")),
        );

        if parts.is_empty() {
            f.write_str("no error details returned")
        } else {
            f.write_str(&parts.join("; "))
        }
    }
}

#[derive(Error, Debug)]
pub enum ConnectorError {
    #[error("{message}")]
    Unauthorized { message: String },

    #[error("API error: {0}")]
    Api(ErrorResponse),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid signing key: {0}")]
    InvalidKey(String),

    #[error("Request signing failed: {0}")]
    Signing(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("OAuth handshake error: {0}")]
    Handshake(String),
}

impl ConnectorError {
    pub fn unauthorized() -> Self {
        ConnectorError::Unauthorized {
            message: UNAUTHORIZED_MESSAGE.to_string(),
        }
    }

    /// Only transport failures are worth retrying; everything else was a
    /// definite answer from the server or a local mistake.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ConnectorError::Transport(_))
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ConnectorError::Unauthorized { .. })
    }

    pub fn error_response(&self) -> Option<&ErrorResponse> {
        match self {
            ConnectorError::Api(response) => Some(response),
            _ => None,
        }
    }

    pub fn suggestion(&self) -> Option<&str> {
        match self {
            ConnectorError::Unauthorized { .. } => {
                Some("Re-authenticate using: atlassian-connector auth login")
            }
            ConnectorError::Transport(_) => {
                Some("Check your network connection or try again later")
            }
            ConnectorError::Api(_) => Some("Review the request parameters"),
            ConnectorError::InvalidKey(_) => {
                Some("Check that private_key_path points to a PEM encoded RSA key")
            }
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ConnectorError>;
