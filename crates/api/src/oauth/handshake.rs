//! Three-legged OAuth 1.0a: request token, user authorization, access token.

use std::fmt;
use std::sync::Arc;

use reqwest::header::HeaderMap;
use reqwest::Method;
use tracing::{debug, info};
use url::Url;

use super::OAuth1Signer;
use crate::context::{AccessToken, CredentialContext, OAuthCredentials};
use crate::error::{ConnectorError, Result};
use crate::request;
use crate::response::Payload;
use crate::session::Session;

/// Callback value for clients that show the verifier to the user.
pub const OUT_OF_BAND_CALLBACK: &str = "oob";

/// Per-product OAuth endpoint paths, relative to the base URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OAuthEndpoints {
    pub request_token: &'static str,
    pub authorize: &'static str,
    pub access_token: &'static str,
}

impl OAuthEndpoints {
    pub const JIRA: OAuthEndpoints = OAuthEndpoints {
        request_token: "/plugins/servlet/oauth/request-token",
        authorize: "/plugins/servlet/oauth/authorize",
        access_token: "/plugins/servlet/oauth/access-token",
    };

    pub const CONFLUENCE: OAuthEndpoints = OAuthEndpoints {
        request_token: "/wiki/plugins/servlet/oauth/request-token",
        authorize: "/wiki/plugins/servlet/oauth/authorize",
        access_token: "/wiki/plugins/servlet/oauth/access-token",
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    Unauthenticated,
    RequestTokenObtained,
    AccessTokenObtained,
}

/// Temporary credentials from the first leg. Only a handshake can mint one.
#[derive(Clone, PartialEq, Eq)]
pub struct RequestToken {
    token: String,
    token_secret: String,
}

impl RequestToken {
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn token_secret(&self) -> &str {
        &self.token_secret
    }
}

impl fmt::Debug for RequestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestToken")
            .field("token", &self.token)
            .field("token_secret", &"<redacted>")
            .finish()
    }
}

/// Drives the handshake for one session.
///
/// `exchange` only accepts the request token this handshake issued last;
/// anything else is rejected with [`ConnectorError::Handshake`]. A session
/// that already carries an access token starts in
/// [`HandshakeState::AccessTokenObtained`] and never touches the network
/// unless `request_token` is called to start over.
pub struct OAuthHandshake {
    session: Arc<Session>,
    endpoints: OAuthEndpoints,
    callback: String,
    state: HandshakeState,
    pending: Option<RequestToken>,
}

impl OAuthHandshake {
    pub async fn new(session: Arc<Session>, endpoints: OAuthEndpoints) -> Self {
        let state = if session.access_token().await.is_some() {
            HandshakeState::AccessTokenObtained
        } else {
            HandshakeState::Unauthenticated
        };

        Self {
            session,
            endpoints,
            callback: OUT_OF_BAND_CALLBACK.to_string(),
            state,
            pending: None,
        }
    }

    pub fn with_callback(mut self, callback: impl Into<String>) -> Self {
        self.callback = callback.into();
        self
    }

    pub fn state(&self) -> HandshakeState {
        self.state
    }

    /// First leg: obtain temporary credentials with the consumer key alone.
    pub async fn request_token(&mut self) -> Result<RequestToken> {
        let context = self.session.context().await;
        let oauth = oauth_credentials(&context)?;
        let url = context.resolve(self.endpoints.request_token)?;

        let signer =
            OAuth1Signer::consumer_only(oauth).with_parameter("oauth_callback", self.callback.as_str());
        let payload = self.post_signed(url, &signer).await?;
        let (token, token_secret) = parse_token_reply(&payload)?;

        let request_token = RequestToken {
            token,
            token_secret,
        };
        debug!(token = request_token.token(), "Obtained request token");

        self.pending = Some(request_token.clone());
        self.state = HandshakeState::RequestTokenObtained;
        Ok(request_token)
    }

    /// URL the user opens to approve the request token. No I/O, no state change.
    pub async fn authorization_url(&self, request_token: &RequestToken) -> Result<Url> {
        let context = self.session.context().await;
        let mut url = context.resolve(self.endpoints.authorize)?;
        url.query_pairs_mut()
            .append_pair("oauth_token", request_token.token());
        Ok(url)
    }

    /// Last leg: trade the approved request token and verifier for an access
    /// token, and install it in the session.
    pub async fn exchange(&mut self, request_token: &RequestToken, verifier: &str) -> Result<AccessToken> {
        match &self.pending {
            Some(pending) if pending == request_token => {}
            Some(_) => {
                return Err(ConnectorError::Handshake(
                    "request token was not issued by the latest request_token call".to_string(),
                ))
            }
            None => {
                return Err(ConnectorError::Handshake(
                    "request_token must succeed before exchange".to_string(),
                ))
            }
        }

        let context = self.session.context().await;
        let oauth = oauth_credentials(&context)?;
        let url = context.resolve(self.endpoints.access_token)?;

        let signer = OAuth1Signer::consumer_only(oauth)
            .with_token(request_token.token())
            .with_parameter("oauth_verifier", verifier);
        let payload = self.post_signed(url, &signer).await?;
        let (token, token_secret) = parse_token_reply(&payload)?;
        let access_token = AccessToken::new(token, token_secret);

        self.session.install_access_token(access_token.clone()).await?;
        self.pending = None;
        self.state = HandshakeState::AccessTokenObtained;
        info!("OAuth access token obtained");

        Ok(access_token)
    }

    async fn post_signed(&self, url: Url, signer: &OAuth1Signer<'_>) -> Result<Payload> {
        let prepared = request::build(
            Method::POST,
            url,
            HeaderMap::new(),
            None,
            self.session.timeouts().request,
            signer,
        )?;
        self.session.execute(prepared).await
    }
}

fn oauth_credentials(context: &CredentialContext) -> Result<&OAuthCredentials> {
    context.oauth_credentials().ok_or_else(|| {
        ConnectorError::InvalidRequest("OAuth handshake requires OAuth credentials".to_string())
    })
}

/// Parse `oauth_token=..&oauth_token_secret=..` from a token endpoint reply.
fn parse_token_reply(payload: &Payload) -> Result<(String, String)> {
    let mut token = None;
    let mut token_secret = None;

    for (name, value) in url::form_urlencoded::parse(payload.bytes()) {
        match name.as_ref() {
            "oauth_token" => token = Some(value.into_owned()),
            "oauth_token_secret" => token_secret = Some(value.into_owned()),
            _ => {}
        }
    }

    match (token, token_secret) {
        (Some(token), Some(token_secret)) if !token.is_empty() => Ok((token, token_secret)),
        _ => Err(ConnectorError::InvalidResponse(
            "token endpoint reply is missing oauth_token or oauth_token_secret".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oauth::parse_private_key;

    const TEST_KEY: &str = include_str!("../../tests/fixtures/consumer_key.pem");

    fn oauth_session(token: Option<AccessToken>) -> Arc<Session> {
        let mut creds = OAuthCredentials::new("atlassian-connector", parse_private_key(TEST_KEY).unwrap());
        if let Some(token) = token {
            creds = creds.with_access_token(token);
        }
        let context = CredentialContext::oauth("https://jira.example.com", creds).unwrap();
        Arc::new(Session::new(context).unwrap())
    }

    #[test]
    fn test_parse_token_reply() {
        let payload = Payload::Body(
            b"oauth_token=abc%2B1&oauth_token_secret=s3cr3t&oauth_callback_confirmed=true".to_vec(),
        );
        assert_eq!(
            parse_token_reply(&payload).unwrap(),
            ("abc+1".to_string(), "s3cr3t".to_string())
        );
    }

    #[test]
    fn test_parse_token_reply_missing_fields() {
        let payload = Payload::Body(b"oauth_problem=token_rejected".to_vec());
        assert!(matches!(
            parse_token_reply(&payload),
            Err(ConnectorError::InvalidResponse(_))
        ));
        assert!(parse_token_reply(&Payload::Empty).is_err());
    }

    #[tokio::test]
    async fn test_remembered_token_skips_handshake() {
        let session = oauth_session(Some(AccessToken::new("tok", "sec")));
        let handshake = OAuthHandshake::new(session, OAuthEndpoints::JIRA).await;
        assert_eq!(handshake.state(), HandshakeState::AccessTokenObtained);
    }

    #[tokio::test]
    async fn test_exchange_before_request_token_is_rejected() {
        let session = oauth_session(None);
        let mut handshake = OAuthHandshake::new(session, OAuthEndpoints::JIRA).await;
        assert_eq!(handshake.state(), HandshakeState::Unauthenticated);

        let forged = RequestToken {
            token: "t".into(),
            token_secret: "s".into(),
        };
        let err = handshake.exchange(&forged, "verifier").await.unwrap_err();
        assert!(matches!(err, ConnectorError::Handshake(_)));
        assert_eq!(handshake.state(), HandshakeState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_authorization_url_carries_token() {
        let session = oauth_session(None);
        let handshake = OAuthHandshake::new(session, OAuthEndpoints::CONFLUENCE).await;
        let token = RequestToken {
            token: "T+/=1".into(),
            token_secret: "s".into(),
        };

        let url = handshake.authorization_url(&token).await.unwrap();
        assert_eq!(url.path(), "/wiki/plugins/servlet/oauth/authorize");
        let value = url
            .query_pairs()
            .find(|(name, _)| name == "oauth_token")
            .map(|(_, value)| value.into_owned());
        assert_eq!(value.as_deref(), Some("T+/=1"));
        assert_eq!(handshake.state(), HandshakeState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_basic_session_cannot_handshake() {
        let context = CredentialContext::basic("https://jira.example.com", "u", "p").unwrap();
        let session = Arc::new(Session::new(context).unwrap());
        let mut handshake = OAuthHandshake::new(session, OAuthEndpoints::JIRA).await;
        let err = handshake.request_token().await.unwrap_err();
        assert!(matches!(err, ConnectorError::InvalidRequest(_)));
    }
}
