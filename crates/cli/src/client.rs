//! HTTP client for a running dashboard server

use anyhow::{Context, Result};
use std::time::Duration;

use streamlens_common::{DashboardStats, RawPlay};

/// Client for communicating with the StreamLens web server
pub struct DashboardClient {
    base_url: String,
    http: reqwest::Client,
}

impl DashboardClient {
    /// Create a new dashboard client
    pub fn new(base_url: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    /// Check if the server is healthy
    pub async fn health_check(&self) -> bool {
        let url = format!("{}/health", self.base_url);
        match self.http.get(&url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    /// Run analysis on the server instead of locally
    pub async fn analyze(&self, records: &[RawPlay]) -> Result<DashboardStats> {
        let url = format!("{}/api/analyze", self.base_url);
        let resp = self
            .http
            .post(&url)
            .json(records)
            .send()
            .await
            .with_context(|| format!("POST {}", url))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Server rejected analysis ({}): {}", status, body);
        }

        resp.json().await.context("Decoding analysis response")
    }
}
