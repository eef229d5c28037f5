use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use rsa::RsaPrivateKey;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{ConnectorError, Result};

/// Default timeout for JSON calls.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(5_000);
/// Default timeout for multipart uploads.
pub const DEFAULT_UPLOAD_TIMEOUT: Duration = Duration::from_millis(50_000);

/// Long-lived OAuth access token obtained from the handshake.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    pub token: String,
    pub token_secret: String,
}

impl AccessToken {
    pub fn new(token: impl Into<String>, token_secret: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            token_secret: token_secret.into(),
        }
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &self.token)
            .field("token_secret", &"<redacted>")
            .finish()
    }
}

/// Consumer credentials for OAuth 1.0a with RSA-SHA1 signatures.
#[derive(Clone)]
pub struct OAuthCredentials {
    pub consumer_key: String,
    /// Not used by RSA-SHA1 but kept so the consumer record is complete.
    pub consumer_secret: Option<String>,
    signing_key: Arc<RsaPrivateKey>,
    pub access_token: Option<AccessToken>,
}

impl OAuthCredentials {
    pub fn new(consumer_key: impl Into<String>, signing_key: RsaPrivateKey) -> Self {
        Self {
            consumer_key: consumer_key.into(),
            consumer_secret: None,
            signing_key: Arc::new(signing_key),
            access_token: None,
        }
    }

    pub fn with_consumer_secret(mut self, secret: impl Into<String>) -> Self {
        self.consumer_secret = Some(secret.into());
        self
    }

    pub fn with_access_token(mut self, token: AccessToken) -> Self {
        self.access_token = Some(token);
        self
    }

    pub fn signing_key(&self) -> &RsaPrivateKey {
        &self.signing_key
    }
}

impl fmt::Debug for OAuthCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthCredentials")
            .field("consumer_key", &self.consumer_key)
            .field("signing_key", &"<redacted>")
            .field("access_token", &self.access_token)
            .finish()
    }
}

#[derive(Clone)]
pub struct BasicCredentials {
    pub username: String,
    password: String,
}

impl BasicCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for BasicCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Clone, Debug)]
pub enum Credentials {
    OAuth1(OAuthCredentials),
    Basic(BasicCredentials),
}

impl Credentials {
    pub fn mode(&self) -> &'static str {
        match self {
            Credentials::OAuth1(_) => "oauth1",
            Credentials::Basic(_) => "basic",
        }
    }
}

/// Signing material plus the server it is valid for. A session holds exactly
/// one context and swaps it wholesale on re-initialization.
#[derive(Clone, Debug)]
pub struct CredentialContext {
    base_url: Url,
    credentials: Credentials,
}

impl CredentialContext {
    pub fn new(base_url: impl AsRef<str>, credentials: Credentials) -> Result<Self> {
        let base_url = Url::parse(base_url.as_ref())?;
        if base_url.cannot_be_a_base() {
            return Err(ConnectorError::InvalidRequest(format!(
                "{base_url} cannot be used as a base URL"
            )));
        }

        Ok(Self {
            base_url,
            credentials,
        })
    }

    pub fn oauth(base_url: impl AsRef<str>, credentials: OAuthCredentials) -> Result<Self> {
        Self::new(base_url, Credentials::OAuth1(credentials))
    }

    pub fn basic(
        base_url: impl AsRef<str>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self> {
        Self::new(
            base_url,
            Credentials::Basic(BasicCredentials::new(username, password)),
        )
    }

    /// Re-point the same credentials at another server instance. Any access
    /// token is kept; the server decides whether it still accepts it.
    pub fn with_base_url(self, base_url: impl AsRef<str>) -> Result<Self> {
        Self::new(base_url, self.credentials)
    }

    /// Attach a previously issued access token ("remember me").
    pub fn with_access_token(mut self, token: AccessToken) -> Result<Self> {
        match &mut self.credentials {
            Credentials::OAuth1(oauth) => {
                oauth.access_token = Some(token);
                Ok(self)
            }
            Credentials::Basic(_) => Err(ConnectorError::InvalidRequest(
                "access tokens only apply to OAuth sessions".to_string(),
            )),
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn oauth_credentials(&self) -> Option<&OAuthCredentials> {
        match &self.credentials {
            Credentials::OAuth1(oauth) => Some(oauth),
            Credentials::Basic(_) => None,
        }
    }

    pub fn access_token(&self) -> Option<&AccessToken> {
        self.oauth_credentials()
            .and_then(|oauth| oauth.access_token.as_ref())
    }

    /// Join a path onto the base URL by concatenation, so a base with its own
    /// context path (`https://host/jira`) keeps it.
    pub fn resolve(&self, path: &str) -> Result<Url> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        Ok(Url::parse(&format!("{base}/{path}"))?)
    }
}

/// Per-call timeouts. Uploads get their own, longer budget.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timeouts {
    pub request: Duration,
    pub upload: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            request: DEFAULT_REQUEST_TIMEOUT,
            upload: DEFAULT_UPLOAD_TIMEOUT,
        }
    }
}
