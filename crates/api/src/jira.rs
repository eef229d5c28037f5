use std::path::Path;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;
use crate::oauth::OAuthHandshake;
use crate::router::{ApiFamily, Product};
use crate::session::Session;

/// Jira resources over the latest, 1.0 and agile REST APIs.
#[derive(Clone)]
pub struct JiraClient {
    session: Arc<Session>,
}

impl JiraClient {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub async fn handshake(&self) -> OAuthHandshake {
        OAuthHandshake::new(self.session.clone(), Product::Jira.oauth_endpoints()).await
    }

    pub async fn get<T: DeserializeOwned>(&self, resource: &str) -> Result<T> {
        self.session.get(ApiFamily::Rest, resource).await
    }

    pub async fn get_legacy<T: DeserializeOwned>(&self, resource: &str) -> Result<T> {
        self.session.get(ApiFamily::Legacy, resource).await
    }

    pub async fn get_agile<T: DeserializeOwned>(&self, resource: &str) -> Result<T> {
        self.session.get(ApiFamily::Agile, resource).await
    }

    pub async fn put<B: Serialize + ?Sized>(&self, resource: &str, body: &B) -> Result<()> {
        self.session.put(ApiFamily::Rest, resource, body).await
    }

    pub async fn post<B: Serialize + ?Sized>(&self, resource: &str, body: &B) -> Result<()> {
        self.session.post(ApiFamily::Rest, resource, body).await
    }

    pub async fn post_agile<B: Serialize + ?Sized>(&self, resource: &str, body: &B) -> Result<()> {
        self.session.post(ApiFamily::Agile, resource, body).await
    }

    pub async fn post_with_response<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        resource: &str,
        body: &B,
    ) -> Result<T> {
        self.session
            .post_with_response(ApiFamily::Rest, resource, body)
            .await
    }

    /// Upload an attachment, e.g. to `issue/ABC-1/attachments`.
    pub async fn post_file(&self, resource: &str, path: impl AsRef<Path>) -> Result<()> {
        self.session.post_file(ApiFamily::Rest, resource, path).await
    }

    pub async fn delete(&self, resource: &str) -> Result<()> {
        self.session.delete(ApiFamily::Rest, resource).await
    }
}
