//! GIF search against a Tenor-compatible v2 endpoint.
//!
//! One search is exactly one blocking GET with `q`, `key` and `limit`. There
//! is no retry and no cache. An upstream that answers with a non-success
//! status yields an empty result list rather than an error; transport
//! failures (DNS, refused connection, timeout) are errors.

use crate::config::GifSearchConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Largest `limit` the upstream accepts.
pub const MAX_RESULTS: u32 = 50;

#[derive(Error, Debug)]
pub enum GifSearchError {
    #[error("no API key configured for GIF search (set {0})")]
    MissingApiKey(String),
    #[error("result count must be between 1 and {MAX_RESULTS}, got {0}")]
    InvalidCount(u32),
    #[error("GIF search request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// One rendition of a result, e.g. `gif` or `tinygif`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaFormat {
    pub url: String,
    #[serde(default)]
    pub dims: Vec<u32>,
    #[serde(default)]
    pub size: u64,
}

/// One search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gif {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content_description: String,
    #[serde(default)]
    pub itemurl: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub media_formats: BTreeMap<String, MediaFormat>,
}

impl Gif {
    /// URL of the smallest animated rendition available.
    pub fn preview_url(&self) -> Option<&str> {
        ["tinygif", "gif", "mediumgif", "nanogif"]
            .iter()
            .find_map(|key| self.media_formats.get(*key))
            .or_else(|| self.media_formats.values().next())
            .map(|m| m.url.as_str())
            .or_else(|| (!self.url.is_empty()).then_some(self.url.as_str()))
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<Gif>,
}

pub struct GifSearchClient {
    http: reqwest::blocking::Client,
    endpoint: String,
    api_key: Option<String>,
    api_key_env: String,
}

impl GifSearchClient {
    pub fn new(config: &GifSearchConfig) -> Result<Self, GifSearchError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("filterbox/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            api_key_env: config.api_key_env.clone(),
        })
    }

    /// Search for up to `count` GIFs matching `query`.
    pub fn search(&self, query: &str, count: u32) -> Result<Vec<Gif>, GifSearchError> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| GifSearchError::MissingApiKey(self.api_key_env.clone()))?;
        if !(1..=MAX_RESULTS).contains(&count) {
            return Err(GifSearchError::InvalidCount(count));
        }

        debug!(endpoint = %self.endpoint, query, count, "searching GIFs");
        let limit = count.to_string();
        let response = self
            .http
            .get(&self.endpoint)
            .query(&[("q", query), ("key", key), ("limit", limit.as_str())])
            .send()?;

        let status = response.status();
        if !status.is_success() {
            warn!(%status, "GIF search upstream refused the request");
            return Ok(Vec::new());
        }

        let body: SearchResponse = response.json()?;
        debug!(results = body.results.len(), "GIF search finished");
        Ok(body.results)
    }
}
