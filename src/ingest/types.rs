// src/ingest/types.rs
use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static RE_POST_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/(\d+)\.html").expect("post id regex"));

/// One marketplace region to search, e.g. `Miami` at `https://miami.craigslist.org`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub name: String,
    pub base_url: String,
}

/// Raw observation handed over by an extractor, before any scoring.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCandidate {
    #[serde(default, alias = "id", alias = "identity_key")]
    pub identity_key: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, alias = "price", alias = "raw_price")]
    pub raw_price: Option<String>,
    #[serde(default, alias = "raw_date_text")]
    pub raw_date_text: Option<String>,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub keyword: String,
    #[serde(default)]
    pub link: String,
    #[serde(default, alias = "image", alias = "image_url")]
    pub image_url: Option<String>,
}

impl RawCandidate {
    /// Fill a blank identity key with the numeric post id in the listing link
    /// (`/<digits>.html`). Any other link leaves the key blank and the
    /// candidate is skipped at merge.
    pub fn with_derived_identity(mut self) -> Self {
        if !self.identity_key.trim().is_empty() {
            return self;
        }
        if let Some(m) = RE_POST_ID.captures(self.link.trim()).and_then(|c| c.get(1)) {
            self.identity_key = m.as_str().to_string();
        }
        self
    }

    /// Fill blank provenance with the partition that produced the candidate.
    pub fn with_partition(mut self, region: &Region, keyword: &str) -> Self {
        if self.region.trim().is_empty() {
            self.region = region.name.clone();
        }
        if self.keyword.trim().is_empty() {
            self.keyword = keyword.to_string();
        }
        self
    }
}

/// The one extraction capability the engine depends on. Swapping selectors or
/// fetch technique means a new implementation of this trait, nothing else.
#[async_trait::async_trait]
pub trait CandidateSource: Send + Sync {
    async fn fetch_candidates(&self, region: &Region, keyword: &str) -> Result<Vec<RawCandidate>>;
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_post_id_from_link() {
        let c = RawCandidate {
            link: "https://tampa.craigslist.org/atq/d/edison/7914644328.html".into(),
            ..Default::default()
        }
        .with_derived_identity();
        assert_eq!(c.identity_key, "7914644328");
    }

    #[test]
    fn link_without_post_id_stays_blank() {
        for link in [
            "https://example.org/listing/abc",
            "https://reddit.com/r/antiques/test1",
            "https://tampa.craigslist.org/atq/d/edison/draft.html",
        ] {
            let c = RawCandidate {
                link: link.into(),
                ..Default::default()
            }
            .with_derived_identity();
            assert!(c.identity_key.is_empty(), "{link} -> {}", c.identity_key);
        }
    }

    #[test]
    fn keeps_existing_key_and_blank_without_link() {
        let c = RawCandidate {
            identity_key: "42".into(),
            link: "https://x.test/7.html".into(),
            ..Default::default()
        }
        .with_derived_identity();
        assert_eq!(c.identity_key, "42");

        let blank = RawCandidate::default().with_derived_identity();
        assert!(blank.identity_key.is_empty());
    }

    #[test]
    fn accepts_camel_and_legacy_field_names() {
        let c: RawCandidate = serde_json::from_str(
            r#"{"identityKey":"1","title":"t","rawPrice":"$5","rawDateText":"2/1","imageUrl":"https://i"}"#,
        )
        .unwrap();
        assert_eq!(c.raw_price.as_deref(), Some("$5"));
        let legacy: RawCandidate =
            serde_json::from_str(r#"{"id":"1","title":"t","price":"$5","image":"https://i"}"#)
                .unwrap();
        assert_eq!(legacy.identity_key, "1");
        assert_eq!(legacy.image_url.as_deref(), Some("https://i"));
    }
}
