use std::fs;
use std::path::Path;

use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::RsaPrivateKey;

use crate::error::{ConnectorError, Result};

/// Parse a PEM encoded RSA private key, PKCS#8 or PKCS#1.
pub fn parse_private_key(pem: &str) -> Result<RsaPrivateKey> {
    let pem = pem.trim();
    if pem.contains("BEGIN RSA PRIVATE KEY") {
        RsaPrivateKey::from_pkcs1_pem(pem).map_err(|err| ConnectorError::InvalidKey(err.to_string()))
    } else {
        RsaPrivateKey::from_pkcs8_pem(pem).map_err(|err| ConnectorError::InvalidKey(err.to_string()))
    }
}

pub fn read_private_key(path: impl AsRef<Path>) -> Result<RsaPrivateKey> {
    let path = path.as_ref();
    let pem = fs::read_to_string(path).map_err(|err| {
        ConnectorError::InvalidKey(format!("unable to read {}: {err}", path.display()))
    })?;
    parse_private_key(&pem)
}
