//! Vault client for the transit secrets engine.
//!
//! The platform encrypts temperature payloads with transit keys; the
//! security suite verifies the engine round-trips and that key rotation is
//! in place.

use std::time::Duration;

use anyhow::{Context, Result};
use base64::{engine::general_purpose, Engine as _};
use serde::Deserialize;
use tracing::warn;

#[derive(Debug, Deserialize)]
struct VaultResponse<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct EncryptData {
    ciphertext: String,
}

#[derive(Debug, Deserialize)]
struct DecryptData {
    plaintext: String,
}

#[derive(Debug, Deserialize)]
struct KeyData {
    latest_version: u64,
    #[serde(default)]
    auto_rotate_period: u64,
}

/// Rotation-relevant facts about a transit key.
#[derive(Debug, Clone, Copy)]
pub struct TransitKeyInfo {
    pub latest_version: u64,
    /// Seconds between automatic rotations; 0 means disabled.
    pub auto_rotate_period_secs: u64,
}

/// Authenticated client for one Vault server.
#[derive(Debug, Clone)]
pub struct VaultClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl VaultClient {
    /// # Errors
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(
        addr: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build Vault HTTP client")?;
        let addr: String = addr.into();
        Ok(Self {
            http,
            base_url: addr.trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    /// Build a client from VAULT_ADDR and VAULT_TOKEN, or `None` when either
    /// is unset so Vault checks can record themselves as skipped.
    ///
    /// # Errors
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn from_env(timeout: Duration) -> Result<Option<Self>> {
        let addr = std::env::var("VAULT_ADDR").unwrap_or_default();
        let token = std::env::var("VAULT_TOKEN").unwrap_or_default();
        if addr.is_empty() || token.is_empty() {
            return Ok(None);
        }
        Ok(Some(Self::new(addr, token, timeout)?))
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1{path}", self.base_url)
    }

    /// Whether the server is initialized and answering. Standby (429) counts
    /// as healthy.
    pub async fn health(&self) -> Result<bool> {
        let url = format!("{}/v1/sys/health", self.base_url);
        match self.http.get(&url).send().await {
            Ok(response) => {
                let code = response.status().as_u16();
                Ok(code == 200 || code == 429)
            }
            Err(e) => {
                warn!(error = %e, "Vault health check failed");
                Ok(false)
            }
        }
    }

    /// Encrypt a payload with a transit key, returning the ciphertext.
    ///
    /// # Errors
    /// Returns an error on transport failure or a non-success Vault response.
    pub async fn transit_encrypt(&self, key: &str, plaintext: &[u8]) -> Result<String> {
        let url = self.url(&format!("/transit/encrypt/{key}"));
        let body = serde_json::json!({
            "plaintext": general_purpose::STANDARD.encode(plaintext),
        });

        let response = self
            .http
            .post(&url)
            .header("X-Vault-Token", &self.token)
            .json(&body)
            .send()
            .await
            .context("Failed to send transit encrypt request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("transit encrypt failed with status {status}: {body}");
        }

        let parsed: VaultResponse<EncryptData> = response
            .json()
            .await
            .context("Failed to parse transit encrypt response")?;
        Ok(parsed.data.ciphertext)
    }

    /// Decrypt a transit ciphertext, returning the original payload.
    ///
    /// # Errors
    /// Returns an error on transport failure, a non-success Vault response,
    /// or an undecodable plaintext.
    pub async fn transit_decrypt(&self, key: &str, ciphertext: &str) -> Result<Vec<u8>> {
        let url = self.url(&format!("/transit/decrypt/{key}"));
        let body = serde_json::json!({ "ciphertext": ciphertext });

        let response = self
            .http
            .post(&url)
            .header("X-Vault-Token", &self.token)
            .json(&body)
            .send()
            .await
            .context("Failed to send transit decrypt request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("transit decrypt failed with status {status}: {body}");
        }

        let parsed: VaultResponse<DecryptData> = response
            .json()
            .await
            .context("Failed to parse transit decrypt response")?;
        general_purpose::STANDARD
            .decode(&parsed.data.plaintext)
            .context("Transit plaintext is not valid base64")
    }

    /// Rotate a transit key to a new version. Old ciphertexts stay
    /// decryptable after a rotation, so this is safe against a live
    /// platform.
    ///
    /// Returns the new key version when the server reports one; older Vault
    /// servers answer the rotate with an empty body.
    ///
    /// # Errors
    /// Returns an error on transport failure or a non-success Vault response.
    pub async fn transit_rotate(&self, key: &str) -> Result<Option<u64>> {
        let url = self.url(&format!("/transit/keys/{key}/rotate"));

        let response = self
            .http
            .post(&url)
            .header("X-Vault-Token", &self.token)
            .send()
            .await
            .context("Failed to send transit rotate request")?;

        if !response.status().is_success() {
            let status = response.status();
            anyhow::bail!("rotating transit key '{key}' failed with status {status}");
        }

        let parsed: Option<VaultResponse<KeyData>> = response.json().await.ok();
        Ok(parsed.map(|p| p.data.latest_version))
    }

    /// Read a transit key's rotation facts.
    ///
    /// # Errors
    /// Returns an error on transport failure or a non-success Vault response.
    pub async fn transit_key_info(&self, key: &str) -> Result<TransitKeyInfo> {
        let url = self.url(&format!("/transit/keys/{key}"));

        let response = self
            .http
            .get(&url)
            .header("X-Vault-Token", &self.token)
            .send()
            .await
            .context("Failed to read transit key")?;

        if !response.status().is_success() {
            let status = response.status();
            anyhow::bail!("reading transit key '{key}' failed with status {status}");
        }

        let parsed: VaultResponse<KeyData> = response
            .json()
            .await
            .context("Failed to parse transit key response")?;
        Ok(TransitKeyInfo {
            latest_version: parsed.data.latest_version,
            auto_rotate_period_secs: parsed.data.auto_rotate_period,
        })
    }
}
