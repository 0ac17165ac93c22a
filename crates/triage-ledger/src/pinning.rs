//! # Pinning Service Client
//!
//! Ledger backend that hands payloads to an HTTP pinning service and
//! returns the CID it assigns.
//!
//! - `POST {base}/pinning/pinJSONToIPFS` with the JSON document as body.
//! - `POST {base}/pinning/pinFileToIPFS` with a multipart `file` part.
//!
//! Both authenticate with `Authorization: Bearer {jwt}` and answer
//! `{ "IpfsHash": "<cid>" }`.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;
use zeroize::Zeroizing;

use crate::address::ContentAddress;
use crate::client::LedgerClient;
use crate::error::LedgerError;

const DEFAULT_BASE_URL: &str = "https://api.pinata.cloud";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Pinning service connection settings.
///
/// `Debug` redacts the JWT; the token is zeroized on drop.
#[derive(Clone)]
pub struct PinningConfig {
    /// Service base URL.
    pub base_url: Url,
    /// Bearer token.
    pub jwt: Zeroizing<String>,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl std::fmt::Debug for PinningConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PinningConfig")
            .field("base_url", &self.base_url)
            .field("jwt", &"[REDACTED]")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl PinningConfig {
    /// Settings for `base_url` with the given token.
    pub fn new(base_url: Url, jwt: impl Into<String>) -> Self {
        Self {
            base_url,
            jwt: Zeroizing::new(jwt.into()),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Load from the environment.
    ///
    /// - `TRIAGE_LEDGER_URL` (default: `https://api.pinata.cloud`)
    /// - `TRIAGE_LEDGER_JWT` (required)
    /// - `TRIAGE_LEDGER_TIMEOUT_SECS` (default: 30)
    pub fn from_env() -> Result<Self, PinningConfigError> {
        let jwt = std::env::var("TRIAGE_LEDGER_JWT").map_err(|_| PinningConfigError::MissingToken)?;
        Ok(Self {
            base_url: env_url("TRIAGE_LEDGER_URL", DEFAULT_BASE_URL)?,
            jwt: Zeroizing::new(jwt),
            timeout_secs: std::env::var("TRIAGE_LEDGER_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
        })
    }
}

fn env_url(var: &str, default: &str) -> Result<Url, PinningConfigError> {
    let raw = std::env::var(var).unwrap_or_else(|_| default.to_string());
    Url::parse(&raw).map_err(|e| PinningConfigError::InvalidUrl(var.to_string(), e.to_string()))
}

/// Pinning configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum PinningConfigError {
    #[error("TRIAGE_LEDGER_JWT environment variable is required")]
    MissingToken,
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
}

#[derive(Deserialize)]
struct PinResponse {
    #[serde(rename = "IpfsHash")]
    ipfs_hash: String,
}

/// HTTP pinning service backend.
#[derive(Debug, Clone)]
pub struct PinningClient {
    http: reqwest::Client,
    base_url: Url,
}

impl PinningClient {
    /// Build a client; fails only if the token is not a valid header value.
    pub fn new(config: PinningConfig) -> Result<Self, PinningConfigError> {
        let mut auth = reqwest::header::HeaderValue::from_str(&format!("Bearer {}", config.jwt.as_str()))
            .map_err(|_| PinningConfigError::MissingToken)?;
        auth.set_sensitive(true);
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(reqwest::header::AUTHORIZATION, auth);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| PinningConfigError::InvalidUrl(config.base_url.to_string(), e.to_string()))?;

        let mut base_url = config.base_url;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self { http, base_url })
    }

    fn endpoint(&self, path: &str) -> Result<Url, LedgerError> {
        self.base_url
            .join(path)
            .map_err(|e| LedgerError::Network(format!("bad endpoint {path}: {e}")))
    }

    async fn pinned(resp: reqwest::Response, endpoint: &str) -> Result<ContentAddress, LedgerError> {
        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(LedgerError::Auth(format!("{endpoint} returned {status}")));
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(LedgerError::Network(format!("{endpoint} returned {status}: {body}")));
        }
        let parsed: PinResponse = resp
            .json()
            .await
            .map_err(|e| LedgerError::Network(format!("{endpoint} malformed response: {e}")))?;
        tracing::debug!(endpoint, cid = %parsed.ipfs_hash, "payload pinned");
        Ok(ContentAddress::new(parsed.ipfs_hash))
    }
}

#[async_trait]
impl LedgerClient for PinningClient {
    fn backend(&self) -> &'static str {
        "pinning"
    }

    async fn put(&self, bytes: Vec<u8>) -> Result<ContentAddress, LedgerError> {
        let endpoint = "pinning/pinFileToIPFS";
        let part = reqwest::multipart::Part::bytes(bytes).file_name("evidence.bin");
        let form = reqwest::multipart::Form::new().part("file", part);
        let resp = self
            .http
            .post(self.endpoint(endpoint)?)
            .multipart(form)
            .send()
            .await
            .map_err(|e| LedgerError::Network(format!("{endpoint}: {e}")))?;
        Self::pinned(resp, endpoint).await
    }

    async fn put_json(&self, value: &serde_json::Value) -> Result<ContentAddress, LedgerError> {
        let endpoint = "pinning/pinJSONToIPFS";
        let resp = self
            .http
            .post(self.endpoint(endpoint)?)
            .json(value)
            .send()
            .await
            .map_err(|e| LedgerError::Network(format!("{endpoint}: {e}")))?;
        Self::pinned(resp, endpoint).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_jwt() {
        let cfg = PinningConfig::new("https://pin.example".parse().unwrap(), "super-secret-jwt");
        let rendered = format!("{cfg:?}");
        assert!(rendered.contains("[REDACTED]"));
        assert!(!rendered.contains("super-secret-jwt"));
    }

    #[test]
    fn env_url_uses_default_when_var_absent() {
        let url = env_url("TRIAGE_NONEXISTENT_VAR_7781", DEFAULT_BASE_URL).unwrap();
        assert_eq!(url.as_str(), "https://api.pinata.cloud/");
    }

    #[test]
    fn env_url_rejects_invalid_url() {
        std::env::set_var("TRIAGE_TEST_BAD_URL_PIN", "not a url");
        let result = env_url("TRIAGE_TEST_BAD_URL_PIN", DEFAULT_BASE_URL);
        std::env::remove_var("TRIAGE_TEST_BAD_URL_PIN");
        assert!(matches!(result, Err(PinningConfigError::InvalidUrl(..))));
    }

    #[test]
    fn endpoints_keep_base_path() {
        let cfg = PinningConfig::new("http://127.0.0.1:9/proxy".parse().unwrap(), "t");
        let client = PinningClient::new(cfg).unwrap();
        assert_eq!(
            client.endpoint("pinning/pinJSONToIPFS").unwrap().as_str(),
            "http://127.0.0.1:9/proxy/pinning/pinJSONToIPFS"
        );
    }
}
