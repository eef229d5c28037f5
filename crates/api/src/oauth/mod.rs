//! OAuth 1.0a with RSA-SHA1 signatures, as Jira and Confluence Server expect.
//!
//! [`OAuth1Signer`] signs a single request; [`OAuthHandshake`] runs the
//! three-legged dance that produces the access token.

pub mod handshake;
pub mod key;
pub mod signature;

pub use handshake::{HandshakeState, OAuthEndpoints, OAuthHandshake, RequestToken};
pub use key::{parse_private_key, read_private_key};
pub use signature::OAuthParameters;

use reqwest::header::HeaderValue;
use reqwest::Method;
use url::Url;

use crate::context::OAuthCredentials;
use crate::error::{ConnectorError, Result};
use crate::signer::Signer;
use signature::authorization_header;

/// Signs with the consumer key and, when given, a token.
///
/// Regular calls use the session's access token; the handshake signs with
/// no token (request token leg) or with the request token plus verifier.
pub struct OAuth1Signer<'a> {
    credentials: &'a OAuthCredentials,
    token: Option<&'a str>,
    extra: Vec<(String, String)>,
}

impl<'a> OAuth1Signer<'a> {
    pub fn new(credentials: &'a OAuthCredentials) -> Self {
        Self {
            credentials,
            token: credentials
                .access_token
                .as_ref()
                .map(|token| token.token.as_str()),
            extra: Vec::new(),
        }
    }

    pub fn consumer_only(credentials: &'a OAuthCredentials) -> Self {
        Self {
            credentials,
            token: None,
            extra: Vec::new(),
        }
    }

    pub fn with_token(mut self, token: &'a str) -> Self {
        self.token = Some(token);
        self
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.push((name.into(), value.into()));
        self
    }

    fn parameters(&self) -> OAuthParameters {
        let mut params = OAuthParameters::new(self.credentials.consumer_key.as_str());
        if let Some(token) = self.token {
            params = params.with_token(token);
        }
        for (name, value) in &self.extra {
            params = params.with_parameter(name.as_str(), value.as_str());
        }
        params
    }
}

impl Signer for OAuth1Signer<'_> {
    fn authorize(&self, method: &Method, url: &Url) -> Result<HeaderValue> {
        let header = authorization_header(
            self.credentials.signing_key(),
            method,
            url,
            &self.parameters(),
        )?;
        let mut value =
            HeaderValue::from_str(&header).map_err(|err| ConnectorError::Signing(err.to_string()))?;
        value.set_sensitive(true);
        Ok(value)
    }
}

impl Signer for OAuthCredentials {
    fn authorize(&self, method: &Method, url: &Url) -> Result<HeaderValue> {
        OAuth1Signer::new(self).authorize(method, url)
    }
}
