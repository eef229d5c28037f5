use std::path::Path;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;
use crate::oauth::OAuthHandshake;
use crate::router::{ApiFamily, Product};
use crate::session::Session;

/// Confluence resources under `/wiki/rest/api/latest/`.
#[derive(Clone)]
pub struct ConfluenceClient {
    session: Arc<Session>,
}

impl ConfluenceClient {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub async fn handshake(&self) -> OAuthHandshake {
        OAuthHandshake::new(self.session.clone(), Product::Confluence.oauth_endpoints()).await
    }

    pub async fn get<T: DeserializeOwned>(&self, resource: &str) -> Result<T> {
        self.session.get(ApiFamily::Wiki, resource).await
    }

    pub async fn put<B: Serialize + ?Sized>(&self, resource: &str, body: &B) -> Result<()> {
        self.session.put(ApiFamily::Wiki, resource, body).await
    }

    pub async fn post<B: Serialize + ?Sized>(&self, resource: &str, body: &B) -> Result<()> {
        self.session.post(ApiFamily::Wiki, resource, body).await
    }

    pub async fn post_with_response<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        resource: &str,
        body: &B,
    ) -> Result<T> {
        self.session
            .post_with_response(ApiFamily::Wiki, resource, body)
            .await
    }

    /// Attach a file to content, e.g. `content/12345/child/attachment`.
    pub async fn post_file(&self, resource: &str, path: impl AsRef<Path>) -> Result<()> {
        self.session.post_file(ApiFamily::Wiki, resource, path).await
    }

    pub async fn delete(&self, resource: &str) -> Result<()> {
        self.session.delete(ApiFamily::Wiki, resource).await
    }
}
