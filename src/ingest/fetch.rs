// src/ingest/fetch.rs
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

use crate::config::FetchConfig;
use crate::ingest::types::Fetcher;

/// Blocking-per-source HTTP fetcher with a fixed timeout per request.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(cfg: &FetchConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(cfg.user_agent.as_str())
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .context("building http client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("GET {url}"))?;
        let resp = resp
            .error_for_status()
            .with_context(|| format!("GET {url} returned non-success status"))?;
        resp.text()
            .await
            .with_context(|| format!("reading body of {url}"))
    }
}

/// In-memory fetcher keyed by URL. Unknown URLs and registered failures error out.
#[derive(Default)]
pub struct StaticFetcher {
    bodies: HashMap<String, std::result::Result<String, String>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_body(mut self, url: &str, body: &str) -> Self {
        self.bodies.insert(url.to_string(), Ok(body.to_string()));
        self
    }

    pub fn with_error(mut self, url: &str, message: &str) -> Self {
        self.bodies.insert(url.to_string(), Err(message.to_string()));
        self
    }
}

#[async_trait]
impl Fetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        match self.bodies.get(url) {
            Some(Ok(body)) => Ok(body.clone()),
            Some(Err(msg)) => Err(anyhow!("{msg}")).with_context(|| format!("GET {url}")),
            None => Err(anyhow!("no body registered for {url}")),
        }
    }
}
