//! Hand-built `multipart/form-data` bodies for attachment uploads.
//!
//! OAuth 1.0a signs a request whose body is already fixed, so the upload body
//! is encoded in full before the request is signed. The file is buffered in
//! memory; attachments are expected to be small.

use std::path::Path;

use tracing::debug;

use crate::error::{ConnectorError, Result};
use crate::oauth::signature::random_token;

/// Header both products require on multipart uploads.
pub const XSRF_HEADER: &str = "x-atlassian-token";
pub const XSRF_VALUE: &str = "no-check";
/// Form field name Jira and Confluence read attachments from.
pub const FILE_FIELD: &str = "file";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartBody {
    pub boundary: String,
    pub body: Vec<u8>,
}

impl MultipartBody {
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    pub fn content_length(&self) -> usize {
        self.body.len()
    }
}

/// Read `path` and wrap it as the single `file` part of a form body.
pub async fn encode(path: impl AsRef<Path>) -> Result<MultipartBody> {
    let path = path.as_ref();
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| {
            ConnectorError::Transport(format!("{} does not name a file", path.display()))
        })?;

    let data = tokio::fs::read(path).await.map_err(|err| {
        ConnectorError::Transport(format!("unable to read {}: {err}", path.display()))
    })?;

    let encoded = encode_bytes(file_name, &data, new_boundary());
    debug!(
        file = file_name,
        file_bytes = data.len(),
        body_bytes = encoded.body.len(),
        "Encoded multipart body"
    );
    Ok(encoded)
}

pub fn new_boundary() -> String {
    format!("----------{}", random_token())
}

pub fn encode_bytes(file_name: &str, data: &[u8], boundary: String) -> MultipartBody {
    let mut body = Vec::with_capacity(data.len() + boundary.len() * 2 + 160);
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{FILE_FIELD}\"; filename=\"{}\"\r\n",
            escape_quotes(file_name)
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    MultipartBody { boundary, body }
}

fn escape_quotes(name: &str) -> String {
    name.replace('"', "%22")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
        haystack
            .windows(needle.len())
            .position(|window| window == needle)
    }

    #[test]
    fn test_single_part_layout() {
        let content = b"%PDF-1.4\x00\x01binary";
        let encoded = encode_bytes("report.pdf", content, "----------abc".to_string());

        let expected_head = "------------abc\r\n\
            Content-Disposition: form-data; name=\"file\"; filename=\"report.pdf\"\r\n\
            Content-Type: application/octet-stream\r\n\r\n";
        assert!(encoded.body.starts_with(expected_head.as_bytes()));
        assert!(encoded.body.ends_with(b"\r\n------------abc--\r\n"));

        let start = expected_head.len();
        let end = encoded.body.len() - b"\r\n------------abc--\r\n".len();
        assert_eq!(&encoded.body[start..end], content);
        assert_eq!(encoded.content_length(), encoded.body.len());
        assert_eq!(
            encoded.content_type(),
            "multipart/form-data; boundary=----------abc"
        );
    }

    #[test]
    fn test_boundaries_are_unique() {
        let a = new_boundary();
        let b = new_boundary();
        assert_ne!(a, b);
        assert!(a.starts_with("----------"));
        assert_eq!(a.len(), 10 + 32);
    }

    #[test]
    fn test_quotes_in_file_name_are_escaped() {
        let encoded = encode_bytes("a\"b.txt", b"x", "b".to_string());
        assert!(find(&encoded.body, b"filename=\"a%22b.txt\"").is_some());
    }

    #[tokio::test]
    async fn test_encode_reads_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"hello attachment").unwrap();

        let encoded = encode(file.path()).await.unwrap();
        let name = file.path().file_name().unwrap().to_str().unwrap();

        assert!(find(&encoded.body, format!("filename=\"{name}\"").as_bytes()).is_some());
        assert!(find(&encoded.body, b"hello attachment").is_some());
        assert!(find(&encoded.body, encoded.boundary.as_bytes()).is_some());
    }

    #[tokio::test]
    async fn test_unreadable_file_is_transport_error() {
        let err = encode("/nonexistent/report.pdf").await.unwrap_err();
        assert!(matches!(err, ConnectorError::Transport(_)));
        assert!(err.to_string().contains("/nonexistent/report.pdf"));
    }
}
