// src/lead.rs
//! Persisted lead records and their wire format.
//!
//! Field names follow the JSON the viewer already reads (`id`, `keyword`,
//! `posted_date`, `scraped_at`, `is_new`), so old `leads-v2.json` files load
//! without migration. Legacy values are canonicalized while deserializing.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::normalize::normalize_date;

/// Text written for the sentinel date; sorts before every real date as a string too.
pub const SENTINEL_DATE_TEXT: &str = "1970-01-01";

/// Price stored when a listing never showed one.
pub const UNKNOWN_PRICE: &str = "unknown";

pub const MIN_SCORE: f32 = 0.0;
pub const MAX_SCORE: f32 = 5.0;

/// Relevance label assigned by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Classification {
    #[serde(alias = "HIGH-VALUE ANTIQUE")]
    HighValue,
    #[serde(alias = "BRAND NAME SIGHTING")]
    BrandSighting,
    #[serde(alias = "POTENTIAL FIND", alias = "UNKNOWN")]
    Potential,
    #[serde(alias = "LOW INTEREST / MODERN")]
    LowInterest,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::HighValue => "high-value",
            Classification::BrandSighting => "brand-sighting",
            Classification::Potential => "potential",
            Classification::LowInterest => "low-interest",
        }
    }
}

impl Default for Classification {
    fn default() -> Self {
        Classification::Potential
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical posting date, or the "unknown-old" sentinel.
///
/// Variant order matters: the derived `Ord` puts `UnknownOld` before every
/// `Known` date, which is what the ranker relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum PostedDate {
    #[default]
    UnknownOld,
    Known(NaiveDate),
}

impl PostedDate {
    pub fn is_known(&self) -> bool {
        matches!(self, PostedDate::Known(_))
    }
}

impl fmt::Display for PostedDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PostedDate::Known(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            PostedDate::UnknownOld => f.write_str(SENTINEL_DATE_TEXT),
        }
    }
}

impl Serialize for PostedDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PostedDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Anything stored, however old or malformed, goes through the normalizer.
        let raw: Option<String> = Option::deserialize(deserializer)?;
        Ok(raw.as_deref().map(normalize_date).unwrap_or_default())
    }
}

/// One observed listing, as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    #[serde(rename = "id", alias = "identity_key")]
    pub identity_key: String,
    pub title: String,
    #[serde(default)]
    pub link: String,
    #[serde(default = "unknown_price")]
    pub price: String,
    #[serde(default)]
    pub region: String,
    #[serde(rename = "keyword", alias = "matched_keyword", default)]
    pub matched_keyword: String,
    #[serde(default, deserialize_with = "de_score")]
    pub score: f32,
    #[serde(default)]
    pub classification: Classification,
    /// Classifier explanation for the current score.
    #[serde(default)]
    pub analysis: String,
    #[serde(
        default,
        deserialize_with = "de_non_empty",
        skip_serializing_if = "Option::is_none"
    )]
    pub image: Option<String>,
    #[serde(default)]
    pub posted_date: PostedDate,
    #[serde(alias = "timestamp", default = "epoch", deserialize_with = "de_timestamp")]
    pub scraped_at: DateTime<Utc>,
    #[serde(default)]
    pub is_new: bool,
}

/// Summary written next to the store after every successful run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub last_updated: DateTime<Utc>,
    #[serde(alias = "total_leads")]
    pub total_count: usize,
    #[serde(alias = "new_leads_this_run")]
    pub new_count: usize,
    #[serde(default)]
    pub skipped_count: usize,
    #[serde(default)]
    pub trimmed_count: usize,
}

/// Clamp into `[0, 5]`; NaN and negative zero become `0.0`.
pub fn clamp_score(x: f32) -> f32 {
    if x.is_nan() || x <= MIN_SCORE {
        MIN_SCORE
    } else if x >= MAX_SCORE {
        MAX_SCORE
    } else {
        x
    }
}

fn unknown_price() -> String {
    UNKNOWN_PRICE.to_string()
}

fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

fn de_score<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f32, D::Error> {
    let raw: Option<f32> = Option::deserialize(deserializer)?;
    Ok(clamp_score(raw.unwrap_or(MIN_SCORE)))
}

fn de_non_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.filter(|s| !s.trim().is_empty()))
}

/// Accepts RFC 3339 and the naive ISO stamps older runs wrote (read as UTC).
fn de_timestamp<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_timestamp).unwrap_or_else(epoch))
}

pub(crate) fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}
