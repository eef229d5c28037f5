//! RSA-SHA1 signatures for OAuth 1.0a (RFC 5849 §3.4).

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::Utc;
use reqwest::Method;
use rsa::{Pkcs1v15Sign, RsaPrivateKey};
use sha1::{Digest, Sha1};
use url::Url;

use crate::error::{ConnectorError, Result};

pub const SIGNATURE_METHOD: &str = "RSA-SHA1";
pub const OAUTH_VERSION: &str = "1.0";

/// RFC 3986 percent-encoding: everything but `ALPHA / DIGIT / - . _ ~`.
pub fn percent_encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// Random 128-bit value as 32 lowercase hex digits.
pub(crate) fn random_token() -> String {
    format!("{:032x}", rand::random::<u128>())
}

/// The `oauth_*` protocol parameters of a single signed request.
///
/// Every instance gets its own nonce and timestamp; tests pin them with
/// [`OAuthParameters::with_nonce`] and [`OAuthParameters::with_timestamp`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthParameters {
    consumer_key: String,
    token: Option<String>,
    nonce: String,
    timestamp: String,
    extra: Vec<(String, String)>,
}

impl OAuthParameters {
    pub fn new(consumer_key: impl Into<String>) -> Self {
        Self {
            consumer_key: consumer_key.into(),
            token: None,
            nonce: random_token(),
            timestamp: Utc::now().timestamp().to_string(),
            extra: Vec::new(),
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_nonce(mut self, nonce: impl Into<String>) -> Self {
        self.nonce = nonce.into();
        self
    }

    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = timestamp.into();
        self
    }

    /// Additional protocol parameter such as `oauth_callback` or `oauth_verifier`.
    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.push((name.into(), value.into()));
        self
    }

    pub fn nonce(&self) -> &str {
        &self.nonce
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    fn protocol_parameters(&self) -> Vec<(String, String)> {
        let mut params = vec![
            ("oauth_consumer_key".to_string(), self.consumer_key.clone()),
            ("oauth_nonce".to_string(), self.nonce.clone()),
            (
                "oauth_signature_method".to_string(),
                SIGNATURE_METHOD.to_string(),
            ),
            ("oauth_timestamp".to_string(), self.timestamp.clone()),
            ("oauth_version".to_string(), OAUTH_VERSION.to_string()),
        ];
        if let Some(token) = &self.token {
            params.push(("oauth_token".to_string(), token.clone()));
        }
        params.extend(self.extra.iter().cloned());
        params
    }
}

/// Base string URI: scheme and host as parsed, default port dropped, no query.
pub fn base_string_uri(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{}://{}:{}{}", url.scheme(), host, port, url.path()),
        None => format!("{}://{}{}", url.scheme(), host, url.path()),
    }
}

/// Query parameters of `url` merged with `parameters`, encoded then sorted
/// by name and value.
pub fn normalized_parameters(url: &Url, parameters: &[(String, String)]) -> String {
    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(name, value)| (percent_encode(&name), percent_encode(&value)))
        .chain(
            parameters
                .iter()
                .map(|(name, value)| (percent_encode(name), percent_encode(value))),
        )
        .collect();
    pairs.sort();

    pairs
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join("&")
}

pub fn signature_base_string(
    method: &Method,
    url: &Url,
    parameters: &[(String, String)],
) -> String {
    format!(
        "{}&{}&{}",
        method.as_str().to_ascii_uppercase(),
        percent_encode(&base_string_uri(url)),
        percent_encode(&normalized_parameters(url, parameters))
    )
}

/// PKCS#1 v1.5 signature over the SHA-1 digest of `base_string`, base64 encoded.
pub fn sign_rsa_sha1(key: &RsaPrivateKey, base_string: &str) -> Result<String> {
    let digest = Sha1::digest(base_string.as_bytes());
    let signature = key
        .sign(Pkcs1v15Sign::new::<Sha1>(), &digest)
        .map_err(|err| ConnectorError::Signing(err.to_string()))?;
    Ok(STANDARD.encode(signature))
}

/// Full `Authorization` header value for a request.
pub fn authorization_header(
    key: &RsaPrivateKey,
    method: &Method,
    url: &Url,
    parameters: &OAuthParameters,
) -> Result<String> {
    let protocol = parameters.protocol_parameters();
    let base_string = signature_base_string(method, url, &protocol);
    let signature = sign_rsa_sha1(key, &base_string)?;

    let mut fields: Vec<String> = protocol
        .iter()
        .map(|(name, value)| format!("{}=\"{}\"", percent_encode(name), percent_encode(value)))
        .collect();
    fields.push(format!("oauth_signature=\"{}\"", percent_encode(&signature)));

    Ok(format!("OAuth {}", fields.join(", ")))
}
