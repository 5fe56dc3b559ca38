//! Authentication utilities for the Bitstamp API
//!
//! Private endpoints expect `key`, `nonce` and `signature` form fields, where
//! the signature is the upper-case hex HMAC-SHA256 of `nonce + client_id + key`
//! keyed with the API secret.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Generate the request signature for a nonce
pub fn sign(nonce: &str, client_id: &str, api_key: &str, secret: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(nonce.as_bytes());
    mac.update(client_id.as_bytes());
    mac.update(api_key.as_bytes());
    hex::encode_upper(mac.finalize().into_bytes())
}

/// API credentials container
#[derive(Clone)]
pub struct Credentials {
    client_id: String,
    api_key: String,
    api_secret: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("api_key", &self.api_key)
            .finish_non_exhaustive()
    }
}

impl Credentials {
    pub fn new(
        client_id: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }

    /// Authentication form fields for a request made with `nonce`
    pub fn auth_fields(&self, nonce: &str) -> Vec<(&'static str, String)> {
        vec![
            ("key", self.api_key.clone()),
            ("nonce", nonce.to_string()),
            (
                "signature",
                sign(nonce, &self.client_id, &self.api_key, &self.api_secret),
            ),
        ]
    }
}
