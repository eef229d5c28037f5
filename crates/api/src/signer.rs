use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::header::HeaderValue;
use reqwest::Method;
use url::Url;

use crate::context::{BasicCredentials, Credentials};
use crate::error::{ConnectorError, Result};

/// Authentication strategy applied to every outbound request.
///
/// Implementations compute the `Authorization` header for a request whose
/// method and URL are already final.
pub trait Signer: Send + Sync {
    fn authorize(&self, method: &Method, url: &Url) -> Result<HeaderValue>;
}

impl Signer for BasicCredentials {
    fn authorize(&self, _method: &Method, _url: &Url) -> Result<HeaderValue> {
        let encoded = STANDARD.encode(format!("{}:{}", self.username, self.password()));
        let mut value = HeaderValue::from_str(&format!("Basic {encoded}"))
            .map_err(|err| ConnectorError::Signing(err.to_string()))?;
        value.set_sensitive(true);
        Ok(value)
    }
}

impl Signer for Credentials {
    fn authorize(&self, method: &Method, url: &Url) -> Result<HeaderValue> {
        match self {
            Credentials::OAuth1(oauth) => oauth.authorize(method, url),
            Credentials::Basic(basic) => basic.authorize(method, url),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_header() {
        let creds = BasicCredentials::new("user", "pass");
        let url = Url::parse("https://example.com/rest/api/latest/myself").unwrap();
        let value = creds.authorize(&Method::GET, &url).unwrap();
        assert_eq!(value.to_str().unwrap(), "Basic dXNlcjpwYXNz");
        assert!(value.is_sensitive());
    }

    #[test]
    fn test_basic_header_ignores_method_and_url() {
        let creds = Credentials::Basic(BasicCredentials::new("jane@example.com", "token"));
        let a = creds
            .authorize(&Method::GET, &Url::parse("https://a.example.com/").unwrap())
            .unwrap();
        let b = creds
            .authorize(&Method::DELETE, &Url::parse("https://b.example.com/x").unwrap())
            .unwrap();
        assert_eq!(a, b);
    }
}
