// src/ingest/providers/fixture.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::Path;

use crate::ingest::types::{CandidateSource, RawCandidate, Region};

/// Candidates read from a JSON array, e.g. an extractor's saved output.
///
/// A candidate is returned for a partition when its `region` and `keyword`
/// match case-insensitively; a blank field matches any partition.
pub struct FixtureSource {
    candidates: Vec<RawCandidate>,
}

impl FixtureSource {
    pub fn from_candidates(candidates: Vec<RawCandidate>) -> Self {
        Self { candidates }
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        let candidates: Vec<RawCandidate> =
            serde_json::from_str(s).context("parsing candidate fixture json")?;
        Ok(Self { candidates })
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading candidate fixture {}", path.display()))?;
        Self::from_json_str(&content)
    }
}

fn field_matches(field: &str, wanted: &str) -> bool {
    let f = field.trim();
    f.is_empty() || f.eq_ignore_ascii_case(wanted.trim())
}

#[async_trait]
impl CandidateSource for FixtureSource {
    async fn fetch_candidates(&self, region: &Region, keyword: &str) -> Result<Vec<RawCandidate>> {
        Ok(self
            .candidates
            .iter()
            .filter(|c| field_matches(&c.region, &region.name) && field_matches(&c.keyword, keyword))
            .cloned()
            .collect())
    }

    fn name(&self) -> &'static str {
        "fixture"
    }
}
