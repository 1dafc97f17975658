//! L2 request signing for the Polymarket CLOB API.
//!
//! Authenticated endpoints expect an HMAC-SHA256 signature over
//! `timestamp + method + path + body`, keyed with the base64url-encoded API
//! secret, together with the key, passphrase and wallet address in `POLY_*`
//! headers.

use base64::engine::general_purpose::{STANDARD, URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::config::Config;
use crate::error::GatewayError;

type HmacSha256 = Hmac<Sha256>;

/// API credentials for authenticated CLOB calls.
#[derive(Clone)]
pub struct ApiCredentials {
    /// API key.
    pub api_key: String,
    /// Base64url-encoded API secret.
    pub secret: String,
    /// API passphrase.
    pub passphrase: String,
    /// Wallet address sent as `POLY_ADDRESS`.
    pub address: String,
    /// Wallet signature type.
    pub signature_type: u8,
}

impl std::fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiCredentials")
            .field("api_key", &redact(&self.api_key))
            .field("secret", &"<redacted>")
            .field("passphrase", &"<redacted>")
            .field("address", &self.address)
            .field("signature_type", &signature_type_name(self.signature_type))
            .finish()
    }
}

fn redact(value: &str) -> String {
    match value.get(..4) {
        Some(prefix) if value.len() > 8 => format!("{prefix}..."),
        _ => "<redacted>".to_string(),
    }
}

impl ApiCredentials {
    /// Build credentials from config. Returns `None` unless key and secret are set.
    pub fn from_config(config: &Config) -> Option<Self> {
        if !config.has_credentials() {
            return None;
        }
        Some(Self {
            api_key: config.polymarket_api_key.clone()?,
            secret: config.polymarket_api_secret.clone()?,
            passphrase: config.polymarket_passphrase.clone().unwrap_or_default(),
            address: config.polymarket_address.clone().unwrap_or_default(),
            signature_type: config.polymarket_signature_type,
        })
    }

    /// Build the `POLY_*` headers for one request.
    pub fn l2_headers(
        &self,
        method: &str,
        path: &str,
        body: &str,
        timestamp: i64,
    ) -> Result<Vec<(&'static str, String)>, GatewayError> {
        let signature = sign_request(&self.secret, timestamp, method, path, body)?;

        Ok(vec![
            ("POLY_ADDRESS", self.address.clone()),
            ("POLY_API_KEY", self.api_key.clone()),
            ("POLY_SIGNATURE", signature),
            ("POLY_TIMESTAMP", timestamp.to_string()),
            ("POLY_PASSPHRASE", self.passphrase.clone()),
        ])
    }
}

/// Human readable wallet signature type.
///
/// - 0: EOA (Externally Owned Account) - standard wallet
/// - 1: Magic.link - proxy wallet
/// - 2: Gnosis Safe - multi-sig
pub fn signature_type_name(sig_type: u8) -> &'static str {
    match sig_type {
        1 => "Magic.link proxy",
        2 => "Gnosis Safe",
        _ => "EOA",
    }
}

/// Decode the API secret. The venue issues base64url, older keys use standard base64.
fn decode_secret(secret: &str) -> Result<Vec<u8>, GatewayError> {
    URL_SAFE
        .decode(secret)
        .or_else(|_| URL_SAFE_NO_PAD.decode(secret))
        .or_else(|_| STANDARD.decode(secret))
        .map_err(|e| GatewayError::Signing(format!("invalid API secret encoding: {}", e)))
}

/// Compute the L2 signature for a request.
pub fn sign_request(
    secret: &str,
    timestamp: i64,
    method: &str,
    path: &str,
    body: &str,
) -> Result<String, GatewayError> {
    let key = decode_secret(secret)?;
    let mut mac = HmacSha256::new_from_slice(&key)
        .map_err(|e| GatewayError::Signing(format!("invalid HMAC key: {}", e)))?;

    let message = format!("{}{}{}{}", timestamp, method, path, body);
    mac.update(message.as_bytes());

    Ok(URL_SAFE.encode(mac.finalize().into_bytes()))
}
