// src/ingest/providers/json_feed.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;

use crate::ingest::types::{CandidateSource, RawCandidate, Region};

/// Pulls candidates from an extractor service that exposes them as JSON:
/// `GET {endpoint}?region=<name>&base_url=<url>&keyword=<kw>` -> `[RawCandidate]`.
pub struct JsonFeedSource {
    endpoint: String,
    client: reqwest::Client,
}

impl JsonFeedSource {
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("building feed http client")?;
        Ok(Self {
            endpoint: endpoint.into(),
            client,
        })
    }
}

#[async_trait]
impl CandidateSource for JsonFeedSource {
    async fn fetch_candidates(&self, region: &Region, keyword: &str) -> Result<Vec<RawCandidate>> {
        let resp = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("region", region.name.as_str()),
                ("base_url", region.base_url.as_str()),
                ("keyword", keyword),
            ])
            .send()
            .await
            .with_context(|| format!("feed request for {}/{}", region.name, keyword))?
            .error_for_status()
            .with_context(|| format!("feed status for {}/{}", region.name, keyword))?;

        resp.json::<Vec<RawCandidate>>()
            .await
            .with_context(|| format!("decoding feed json for {}/{}", region.name, keyword))
    }

    fn name(&self) -> &'static str {
        "json-feed"
    }
}
