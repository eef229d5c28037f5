use std::path::PathBuf;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Method;
use serde::Serialize;
use url::Url;

use crate::error::{ConnectorError, Result};
use crate::router::ApiFamily;
use crate::signer::Signer;

pub const JSON_CONTENT_TYPE: &str = "application/json";

/// What travels in the request body. Exactly one kind per request; the
/// variant decides between the JSON and the multipart path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBody {
    Empty,
    Json(Vec<u8>),
    File(PathBuf),
}

/// One logical call against a product API, consumed by `Session::send`.
#[derive(Debug, Clone)]
pub struct ResourceRequest {
    pub method: Method,
    pub family: ApiFamily,
    pub resource: String,
    pub body: RequestBody,
    /// Overrides the session default for this call.
    pub timeout: Option<Duration>,
}

impl ResourceRequest {
    pub fn new(method: Method, family: ApiFamily, resource: impl Into<String>) -> Self {
        Self {
            method,
            family,
            resource: resource.into(),
            body: RequestBody::Empty,
            timeout: None,
        }
    }

    pub fn get(family: ApiFamily, resource: impl Into<String>) -> Self {
        Self::new(Method::GET, family, resource)
    }

    pub fn put(family: ApiFamily, resource: impl Into<String>) -> Self {
        Self::new(Method::PUT, family, resource)
    }

    pub fn post(family: ApiFamily, resource: impl Into<String>) -> Self {
        Self::new(Method::POST, family, resource)
    }

    pub fn delete(family: ApiFamily, resource: impl Into<String>) -> Self {
        Self::new(Method::DELETE, family, resource)
    }

    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self> {
        self.body = RequestBody::Json(serde_json::to_vec(body)?);
        Ok(self)
    }

    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.body = RequestBody::File(path.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn path(&self) -> String {
        self.family.route(&self.resource)
    }
}

/// A fully authenticated request, ready to hand to the transport.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
    pub timeout: Duration,
}

impl PreparedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    pub(crate) fn into_reqwest(self, client: &reqwest::Client) -> reqwest::RequestBuilder {
        let mut builder = client
            .request(self.method, self.url)
            .headers(self.headers)
            .timeout(self.timeout);
        if let Some(body) = self.body {
            builder = builder.body(body);
        }
        builder
    }
}

/// Attach authentication to a request whose method, URL and body are final.
pub fn build(
    method: Method,
    url: Url,
    mut headers: HeaderMap,
    body: Option<Vec<u8>>,
    timeout: Duration,
    signer: &dyn Signer,
) -> Result<PreparedRequest> {
    let authorization = signer.authorize(&method, &url)?;
    headers.insert(AUTHORIZATION, authorization);

    Ok(PreparedRequest {
        method,
        url,
        headers,
        body,
        timeout,
    })
}

pub(crate) fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|err| ConnectorError::InvalidRequest(err.to_string()))
}
