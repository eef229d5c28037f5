use std::path::Path;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::context::{AccessToken, CredentialContext, Timeouts};
use crate::error::{ConnectorError, Result};
use crate::multipart::{self, XSRF_HEADER, XSRF_VALUE};
use crate::request::{self, header_value, PreparedRequest, RequestBody, ResourceRequest, JSON_CONTENT_TYPE};
use crate::response::{map_response, map_transport_error, Payload};
use crate::router::ApiFamily;

/// Authenticated request façade for one product.
///
/// The credential context sits behind a read/write lock: calls hold the read
/// side only while signing, [`Session::reinitialize`] and token installation
/// take the write side. A call is therefore never signed with a half-updated
/// context, and network I/O never blocks re-initialization.
pub struct Session {
    client: Client,
    context: RwLock<CredentialContext>,
    timeouts: Timeouts,
}

impl Session {
    pub fn new(context: CredentialContext) -> Result<Self> {
        Self::with_timeouts(context, Timeouts::default())
    }

    pub fn with_timeouts(context: CredentialContext, timeouts: Timeouts) -> Result<Self> {
        let client = Client::builder()
            .user_agent(format!("atlassian-connector/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| ConnectorError::Transport(err.to_string()))?;

        debug!(
            base_url = %context.base_url(),
            mode = context.credentials().mode(),
            "Session initialized"
        );

        Ok(Self {
            client,
            context: RwLock::new(context),
            timeouts,
        })
    }

    pub fn timeouts(&self) -> Timeouts {
        self.timeouts
    }

    /// Snapshot of the current credential context.
    pub async fn context(&self) -> CredentialContext {
        self.context.read().await.clone()
    }

    pub async fn access_token(&self) -> Option<AccessToken> {
        self.context.read().await.access_token().cloned()
    }

    /// Replace the whole credential context. Waits for in-progress signing to
    /// finish; calls issued meanwhile queue behind it.
    pub async fn reinitialize(&self, context: CredentialContext) {
        let mut guard = self.context.write().await;
        info!(
            base_url = %context.base_url(),
            mode = context.credentials().mode(),
            "Session re-initialized"
        );
        *guard = context;
    }

    pub(crate) async fn install_access_token(&self, token: AccessToken) -> Result<()> {
        let mut guard = self.context.write().await;
        let updated = guard.clone().with_access_token(token)?;
        *guard = updated;
        Ok(())
    }

    /// Encode, route and sign a request without sending it.
    pub async fn prepare(&self, request: ResourceRequest) -> Result<PreparedRequest> {
        let mut headers = HeaderMap::new();
        let mut timeout = self.timeouts.request;

        let body = match request.body {
            RequestBody::Empty => None,
            RequestBody::Json(bytes) => {
                headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
                Some(bytes)
            }
            RequestBody::File(path) => {
                // The body must be final before signing.
                let encoded = multipart::encode(&path).await?;
                headers.insert(CONTENT_TYPE, header_value(&encoded.content_type())?);
                headers.insert(CONTENT_LENGTH, HeaderValue::from(encoded.content_length()));
                headers.insert(
                    HeaderName::from_static(XSRF_HEADER),
                    HeaderValue::from_static(XSRF_VALUE),
                );
                timeout = self.timeouts.upload;
                Some(encoded.body)
            }
        };
        let timeout = request.timeout.unwrap_or(timeout);
        let path = request.family.route(&request.resource);

        let context = self.context.read().await;
        let url = context.resolve(&path)?;
        request::build(
            request.method,
            url,
            headers,
            body,
            timeout,
            context.credentials(),
        )
    }

    /// Send a prepared request once and classify the outcome.
    pub async fn execute(&self, prepared: PreparedRequest) -> Result<Payload> {
        debug!(
            method = %prepared.method,
            url = %prepared.url,
            timeout_ms = prepared.timeout.as_millis() as u64,
            "Sending request"
        );

        let response = prepared
            .into_reqwest(&self.client)
            .send()
            .await
            .map_err(map_transport_error)?;
        map_response(response).await
    }

    pub async fn send(&self, request: ResourceRequest) -> Result<Payload> {
        let prepared = self.prepare(request).await?;
        self.execute(prepared).await
    }

    pub async fn get<T: DeserializeOwned>(&self, family: ApiFamily, resource: &str) -> Result<T> {
        self.send(ResourceRequest::get(family, resource))
            .await?
            .json()
    }

    pub async fn put<B: Serialize + ?Sized>(
        &self,
        family: ApiFamily,
        resource: &str,
        body: &B,
    ) -> Result<()> {
        self.send(ResourceRequest::put(family, resource).json(body)?)
            .await
            .map(drop)
    }

    pub async fn post<B: Serialize + ?Sized>(
        &self,
        family: ApiFamily,
        resource: &str,
        body: &B,
    ) -> Result<()> {
        self.send(ResourceRequest::post(family, resource).json(body)?)
            .await
            .map(drop)
    }

    pub async fn post_with_response<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        family: ApiFamily,
        resource: &str,
        body: &B,
    ) -> Result<T> {
        self.send(ResourceRequest::post(family, resource).json(body)?)
            .await?
            .json()
    }

    pub async fn post_file(
        &self,
        family: ApiFamily,
        resource: &str,
        path: impl AsRef<Path>,
    ) -> Result<()> {
        self.send(ResourceRequest::post(family, resource).file(path.as_ref()))
            .await
            .map(drop)
    }

    pub async fn delete(&self, family: ApiFamily, resource: &str) -> Result<()> {
        self.send(ResourceRequest::delete(family, resource))
            .await
            .map(drop)
    }

    /// Issue an arbitrary verb; used by callers that pick the method at runtime.
    pub async fn request(
        &self,
        method: Method,
        family: ApiFamily,
        resource: &str,
        body: RequestBody,
    ) -> Result<Payload> {
        let mut request = ResourceRequest::new(method, family, resource);
        request.body = body;
        self.send(request).await
    }
}
