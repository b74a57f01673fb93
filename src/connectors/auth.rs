//! Authentication utilities for the Binance API.
//!
//! Binance signs requests with a hex-encoded HMAC-SHA256 of the full query
//! string, keyed by the account secret.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the API key on every authenticated request.
pub const API_KEY_HEADER: &str = "X-MBX-APIKEY";

/// Binance keys and secrets are 64 character alphanumeric strings.
const CREDENTIAL_LEN: usize = 64;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid API key format")]
    InvalidApiKey,
    #[error("Invalid API secret format")]
    InvalidApiSecret,
    #[error("HMAC computation failed: {0}")]
    HmacError(String),
}

/// API credentials for Binance authentication.
#[derive(Clone)]
pub struct ApiCredentials {
    pub api_key: String,
    pub api_secret: String,
}

impl ApiCredentials {
    /// Creates new credentials from environment variables.
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("BINANCE_API_KEY").ok()?;
        let api_secret = std::env::var("BINANCE_API_SECRET").ok()?;

        Some(Self::new(api_key, api_secret))
    }

    /// Creates new credentials from explicit values.
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }

    /// Checks both halves of the credentials against the Binance format.
    ///
    /// This never touches the network.
    pub fn validate(&self) -> Result<(), AuthError> {
        if !validate_api_key(&self.api_key) {
            return Err(AuthError::InvalidApiKey);
        }
        if !validate_api_secret(&self.api_secret) {
            return Err(AuthError::InvalidApiSecret);
        }
        Ok(())
    }

    /// Generates the hex HMAC-SHA256 signature of a query string.
    pub fn sign(&self, query: &str) -> Result<String, AuthError> {
        let mut mac = HmacSha256::new_from_slice(self.api_secret.as_bytes())
            .map_err(|e| AuthError::HmacError(e.to_string()))?;

        mac.update(query.as_bytes());

        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Returns the authentication headers for a request.
    pub fn auth_headers(&self) -> Vec<(String, String)> {
        vec![(API_KEY_HEADER.to_string(), self.api_key.clone())]
    }
}

impl std::fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiCredentials")
            .field("api_key", &"[REDACTED]")
            .field("api_secret", &"[REDACTED]")
            .finish()
    }
}

fn is_credential_shaped(value: &str) -> bool {
    value.len() == CREDENTIAL_LEN && value.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Returns true if `api_key` looks like a Binance API key.
pub fn validate_api_key(api_key: &str) -> bool {
    is_credential_shaped(api_key)
}

/// Returns true if `api_secret` looks like a Binance API secret.
pub fn validate_api_secret(api_secret: &str) -> bool {
    is_credential_shaped(api_secret)
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "vmPUZE6mv9SD5VNHk4HlWFsOr6aKE2zvsw0MuIgwCIPy6utIco14y7Ju91duEh8A";
    const SECRET: &str = "NhqPtmdSJYdKjVHjA7PZj4Mge3R5YNiP1e3UZjInClVN65XAbvqqM6A7H5fATj0j";

    #[test]
    fn test_signature_matches_binance_docs() {
        let creds = ApiCredentials::new(KEY, SECRET);
        let query = "symbol=LTCBTC&side=BUY&type=LIMIT&timeInForce=GTC&quantity=1&price=0.1&recvWindow=5000&timestamp=1499827319559";

        assert_eq!(
            creds.sign(query).unwrap(),
            "c8db56825ae71d6d79447849e617115f4a920fa2acdcab2b053c4b2838bd6b71"
        );
    }

    #[test]
    fn test_validate_accepts_binance_shaped_credentials() {
        assert!(ApiCredentials::new(KEY, SECRET).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_malformed_credentials() {
        let short = ApiCredentials::new("abc", SECRET);
        assert!(matches!(short.validate(), Err(AuthError::InvalidApiKey)));

        let punctuated = format!("{}-", &SECRET[..63]);
        let bad_secret = ApiCredentials::new(KEY, punctuated);
        assert!(matches!(bad_secret.validate(), Err(AuthError::InvalidApiSecret)));

        let too_long = format!("{}A", KEY);
        assert!(!validate_api_key(&too_long));
        assert!(!validate_api_key(""));
        // Multi-byte characters must not sneak past the length check.
        let unicode = format!("{}é", &KEY[..62]);
        assert!(!validate_api_key(&unicode));
    }

    #[test]
    fn test_credentials_debug_redacts() {
        let creds = ApiCredentials::new(KEY, SECRET);
        let debug_str = format!("{:?}", creds);
        assert!(!debug_str.contains(KEY));
        assert!(!debug_str.contains(SECRET));
        assert!(debug_str.contains("[REDACTED]"));
    }

    #[test]
    fn test_auth_headers_carry_api_key() {
        let creds = ApiCredentials::new(KEY, SECRET);
        assert_eq!(
            creds.auth_headers(),
            vec![("X-MBX-APIKEY".to_string(), KEY.to_string())]
        );
    }
}
