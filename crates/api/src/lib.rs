//! Authenticated access to the Jira and Confluence REST APIs.
//!
//! A [`Session`] owns the credential context (OAuth 1.0a RSA-SHA1 or Basic)
//! and turns routed resource requests into signed HTTP exchanges. Every call
//! returns either a payload or a typed [`ConnectorError`]; nothing is retried
//! internally. [`JiraClient`] and [`ConfluenceClient`] add the per-product
//! path prefixes, and [`OAuthHandshake`] obtains the access token.
//!
//! ```no_run
//! use std::sync::Arc;
//! use atlassian_connector_api::{CredentialContext, JiraClient, Session};
//!
//! # async fn run() -> atlassian_connector_api::error::Result<()> {
//! let context = CredentialContext::basic("https://jira.example.com", "jane", "secret")?;
//! let jira = JiraClient::new(Arc::new(Session::new(context)?));
//! let issue: serde_json::Value = jira.get("issue/ABC-1").await?;
//! # Ok(())
//! # }
//! ```

pub mod confluence;
pub mod context;
pub mod error;
pub mod jira;
pub mod multipart;
pub mod oauth;
pub mod request;
pub mod response;
pub mod retry;
pub mod router;
pub mod session;
pub mod signer;

pub use confluence::ConfluenceClient;
pub use context::{AccessToken, BasicCredentials, CredentialContext, Credentials, OAuthCredentials, Timeouts};
pub use error::{ConnectorError, ErrorResponse};
pub use jira::JiraClient;
pub use oauth::{HandshakeState, OAuthEndpoints, OAuthHandshake, RequestToken};
pub use request::{PreparedRequest, RequestBody, ResourceRequest};
pub use response::Payload;
pub use router::{ApiFamily, Product};
pub use session::Session;
pub use signer::Signer;
