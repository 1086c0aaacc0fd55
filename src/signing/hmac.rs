use hmac::{Hmac, Mac};
use reqwest::header::{HeaderMap, HeaderValue};
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::error::{PrinterError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the venue API key
pub const API_KEY_HEADER: &str = "X-MBX-APIKEY";

/// API key/secret pair for signed venue endpoints
#[derive(Clone)]
pub struct ApiCredentials {
    pub api_key: String,
    secret: Zeroizing<String>,
}

impl ApiCredentials {
    pub fn new(api_key: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            secret: Zeroizing::new(secret.into()),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty() && !self.secret.is_empty()
    }
}

impl std::fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiCredentials")
            .field("api_key", &self.api_key)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// HMAC-SHA256 query signer
#[derive(Clone, Debug)]
pub struct HmacAuth {
    credentials: ApiCredentials,
}

impl HmacAuth {
    pub fn new(credentials: ApiCredentials) -> Self {
        Self { credentials }
    }

    /// Hex-encoded HMAC-SHA256 of the query string
    pub fn sign(&self, query: &str) -> Result<String> {
        let mut mac = HmacSha256::new_from_slice(self.credentials.secret.as_bytes())
            .map_err(|e| PrinterError::Signature(format!("HMAC init failed: {}", e)))?;

        mac.update(query.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Append `signature=<hex>` to an already encoded query string
    pub fn signed_query(&self, query: &str) -> Result<String> {
        let signature = self.sign(query)?;
        if query.is_empty() {
            Ok(format!("signature={}", signature))
        } else {
            Ok(format!("{}&signature={}", query, signature))
        }
    }

    pub fn build_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            API_KEY_HEADER,
            HeaderValue::from_str(&self.credentials.api_key)
                .map_err(|e| PrinterError::Internal(format!("Invalid API key header: {}", e)))?,
        );
        Ok(headers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Example key pair and expected signature from the venue's public API docs.
    const DOC_KEY: &str = "vmPUZE6mv9SD5VNHk4HlWFsOr6aKE2zvsw0MuIgwCIPy6utIco14y7Ju91duEh8A";
    const DOC_SECRET: &str = "NhqPtmdSJYdKjVHjA7PZj4Mge3R5YNiP1e3UZjInClVN65XAbvqqM6A7H5fATj0j";
    const DOC_QUERY: &str = "symbol=LTCBTC&side=BUY&type=LIMIT&timeInForce=GTC&quantity=1&price=0.1&recvWindow=5000&timestamp=1499827319559";

    #[test]
    fn test_sign_matches_reference_vector() {
        let auth = HmacAuth::new(ApiCredentials::new(DOC_KEY, DOC_SECRET));
        let sig = auth.sign(DOC_QUERY).unwrap();
        assert_eq!(
            sig,
            "c8db56825ae71d6d79447849e617115f4a920fa2acdcab2b053c4b2838bd6b71"
        );
    }

    #[test]
    fn test_signed_query_appends_signature() {
        let auth = HmacAuth::new(ApiCredentials::new("key", "secret"));
        let signed = auth.signed_query("a=1").unwrap();
        assert!(signed.starts_with("a=1&signature="));
        assert_eq!(signed.len(), "a=1&signature=".len() + 64);
    }

    #[test]
    fn test_debug_redacts_secret() {
        let creds = ApiCredentials::new("key", "super-secret");
        assert!(!format!("{:?}", creds).contains("super-secret"));
    }
}
