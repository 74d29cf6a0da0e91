//! Request signing for authenticated exchange endpoints
//!
//! Binance-style HMAC-SHA256: the full query string is signed with the API
//! secret and the hex digest is appended as `signature`.

use crate::error::{BotError, Result};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// API key + secret pair used to sign private requests
#[derive(Clone)]
pub struct RequestSigner {
    api_key: String,
    api_secret: String,
    recv_window_ms: u64,
}

impl std::fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSigner")
            .field("api_key", &mask(&self.api_key))
            .field("recv_window_ms", &self.recv_window_ms)
            .finish()
    }
}

impl RequestSigner {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>, recv_window_ms: u64) -> Result<Self> {
        let api_key = api_key.into();
        let api_secret = api_secret.into();
        if api_key.is_empty() || api_secret.is_empty() {
            return Err(BotError::Auth("API key and secret are required".into()));
        }
        Ok(Self {
            api_key,
            api_secret,
            recv_window_ms,
        })
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Hex HMAC-SHA256 of `payload`
    pub fn sign(&self, payload: &str) -> Result<String> {
        let mut mac = HmacSha256::new_from_slice(self.api_secret.as_bytes())
            .map_err(|e| BotError::Auth(format!("Invalid secret: {}", e)))?;
        mac.update(payload.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Build `params&recvWindow=..&timestamp=..&signature=..`
    pub fn signed_query(&self, params: &[(&str, String)], timestamp_ms: i64) -> Result<String> {
        let mut parts: Vec<String> = params.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        parts.push(format!("recvWindow={}", self.recv_window_ms));
        parts.push(format!("timestamp={}", timestamp_ms));

        let query = parts.join("&");
        let signature = self.sign(&query)?;
        Ok(format!("{}&signature={}", query, signature))
    }
}

fn mask(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "***".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}***{}", head, tail)
}
