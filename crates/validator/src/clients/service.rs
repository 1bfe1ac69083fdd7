//! HTTP client for the platform services.
//!
//! Thin wrapper over reqwest that keeps a base URL per service and
//! distinguishes transport failures (worth retrying) from HTTP responses
//! (the check's business to judge).

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::Value;

/// Client bound to one service's base URL.
#[derive(Debug, Clone)]
pub struct ServiceClient {
    http: reqwest::Client,
    base_url: String,
}

impl ServiceClient {
    /// # Errors
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        let base: String = base_url.into();
        Ok(Self {
            http,
            base_url: base.trim_end_matches('/').to_string(),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// GET returning the status and how long the round trip took.
    ///
    /// # Errors
    /// Returns an error only on transport failure.
    pub async fn get_status(&self, path: &str) -> Result<(StatusCode, Duration)> {
        let url = self.url(path);
        let started = Instant::now();
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("GET {url} failed"))?;
        Ok((response.status(), started.elapsed()))
    }

    /// GET returning the status and the JSON body (Null when the body is not
    /// JSON).
    ///
    /// # Errors
    /// Returns an error only on transport failure.
    pub async fn get_json(&self, path: &str) -> Result<(StatusCode, Value)> {
        let url = self.url(path);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("GET {url} failed"))?;
        let status = response.status();
        let body = response.json().await.unwrap_or(Value::Null);
        Ok((status, body))
    }

    /// GET with a bearer token.
    ///
    /// # Errors
    /// Returns an error only on transport failure.
    pub async fn get_json_bearer(&self, path: &str, token: &str) -> Result<(StatusCode, Value)> {
        let url = self.url(path);
        let response = self
            .http
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .with_context(|| format!("GET {url} failed"))?;
        let status = response.status();
        let body = response.json().await.unwrap_or(Value::Null);
        Ok((status, body))
    }

    /// POST a JSON body, returning the status and the JSON response.
    ///
    /// # Errors
    /// Returns an error only on transport failure.
    pub async fn post_json(&self, path: &str, body: &Value) -> Result<(StatusCode, Value)> {
        let url = self.url(path);
        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .with_context(|| format!("POST {url} failed"))?;
        let status = response.status();
        let body = response.json().await.unwrap_or(Value::Null);
        Ok((status, body))
    }

    /// DELETE, returning the status.
    ///
    /// # Errors
    /// Returns an error only on transport failure.
    pub async fn delete(&self, path: &str) -> Result<StatusCode> {
        let url = self.url(path);
        let response = self
            .http
            .delete(&url)
            .send()
            .await
            .with_context(|| format!("DELETE {url} failed"))?;
        Ok(response.status())
    }
}
