use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::{ConnectorError, ErrorResponse, Result};

/// Successful outcome of an exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Body(Vec<u8>),
    /// 2xx without content, typical for PUT and DELETE.
    Empty,
}

impl Payload {
    pub fn is_empty(&self) -> bool {
        matches!(self, Payload::Empty)
    }

    pub fn bytes(&self) -> &[u8] {
        match self {
            Payload::Body(bytes) => bytes,
            Payload::Empty => &[],
        }
    }

    /// Deserialize into the caller's shape. An empty payload reads as JSON
    /// `null`, which `()` and `Option<T>` accept.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        let bytes: &[u8] = match self {
            Payload::Body(bytes) => bytes,
            Payload::Empty => b"null",
        };
        serde_json::from_slice(bytes).map_err(|err| {
            warn!("Failed to parse JSON response: {}", err);
            ConnectorError::InvalidResponse(err.to_string())
        })
    }
}

/// Turn status and body into a payload or a typed failure.
///
/// `status_error` is the transport's own text for a failing status; it becomes
/// the single message when the body carries no structured error.
pub fn classify(status: StatusCode, status_error: Option<String>, body: Vec<u8>) -> Result<Payload> {
    if status == StatusCode::UNAUTHORIZED {
        return Err(ConnectorError::unauthorized());
    }

    if status.is_success() {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Payload::Empty);
        }
        return Ok(Payload::Body(body));
    }

    let response = ErrorResponse::decode(&body).unwrap_or_else(|| {
        ErrorResponse::from_message(
            status_error.unwrap_or_else(|| format!("Unexpected status: {status}")),
        )
    });
    Err(ConnectorError::Api(response))
}

pub async fn map_response(response: Response) -> Result<Payload> {
    let status = response.status();
    let status_error = response.error_for_status_ref().err().map(|err| err.to_string());
    debug!(status = status.as_u16(), url = %response.url(), "Received response");

    let body = response.bytes().await.map_err(map_transport_error)?;
    classify(status, status_error, body.to_vec())
}

/// Failures before any status line arrived.
pub fn map_transport_error(err: reqwest::Error) -> ConnectorError {
    if err.is_timeout() {
        warn!(error = %err, "Request timed out");
    } else {
        warn!(error = %err, "Request failed before a response was received");
    }
    ConnectorError::Transport(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Issue {
        key: String,
    }

    #[test]
    fn test_success_with_body() {
        let payload = classify(StatusCode::OK, None, br#"{"key":"ABC-1"}"#.to_vec()).unwrap();
        let issue: Issue = payload.json().unwrap();
        assert_eq!(issue, Issue { key: "ABC-1".into() });
    }

    #[test]
    fn test_success_without_body() {
        let payload = classify(StatusCode::NO_CONTENT, None, Vec::new()).unwrap();
        assert!(payload.is_empty());
        payload.json::<()>().unwrap();
        assert_eq!(payload.json::<Option<Issue>>().unwrap(), None);
        assert!(matches!(
            payload.json::<Issue>(),
            Err(ConnectorError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_unauthorized_ignores_body() {
        let body = br#"{"errorMessages":["token_rejected"]}"#.to_vec();
        let err = classify(StatusCode::UNAUTHORIZED, Some("401".into()), body).unwrap_err();
        assert!(err.is_unauthorized());
    }

    #[test]
    fn test_structured_error_body() {
        let body = br#"{"errorMessages":["Issue does not exist","or you lack permission"]}"#.to_vec();
        let err = classify(StatusCode::NOT_FOUND, Some("HTTP 404".into()), body).unwrap_err();
        let response = err.error_response().unwrap();
        assert_eq!(
            response.messages(),
            ["Issue does not exist", "or you lack permission"]
        );
    }

    #[test]
    fn test_unstructured_error_body_uses_status_text() {
        let text = "HTTP status server error (502 Bad Gateway) for url (https://example.com/)";
        let err = classify(
            StatusCode::BAD_GATEWAY,
            Some(text.to_string()),
            b"<html>proxy</html>".to_vec(),
        )
        .unwrap_err();
        assert_eq!(err.error_response().unwrap().messages(), [text]);

        let err = classify(StatusCode::FORBIDDEN, Some("forbidden".into()), Vec::new()).unwrap_err();
        assert_eq!(err.error_response().unwrap().messages(), ["forbidden"]);
    }

    #[test]
    fn test_malformed_success_body() {
        let payload = classify(StatusCode::OK, None, b"not json".to_vec()).unwrap();
        assert!(matches!(
            payload.json::<Issue>(),
            Err(ConnectorError::InvalidResponse(_))
        ));
    }
}
