// src/reconcile.rs
//! Reconciler: merges annotated observations into the identity-keyed store.
//!
//! Policy (refresh on resighting):
//! - unknown identity  -> insert, `is_new = true`
//! - known identity    -> refresh price/score/classification/scraped_at in place;
//!   a sentinel posting date may be upgraded to a concrete one, a concrete date
//!   is never replaced
//! - blank identity or title -> skipped with a reason; the batch continues
//!
//! `is_new` is run-scoped: [`Store::begin_run`] clears it, [`merge`] is
//! `begin_run` followed by [`Store::apply_batch`].

use chrono::{DateTime, NaiveDate, Utc};
use metrics::counter;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::classify::{score_text, Analysis};
use crate::ingest::types::RawCandidate;
use crate::lead::{Lead, PostedDate, UNKNOWN_PRICE};
use crate::normalize::{clean_text, normalize_opt_date_at};

/// A candidate after the classifier and normalizer have run.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub identity_key: String,
    pub title: String,
    pub link: String,
    pub price: Option<String>,
    pub region: String,
    pub keyword: String,
    pub image: Option<String>,
    pub posted_date: PostedDate,
    pub analysis: Analysis,
    pub observed_at: DateTime<Utc>,
}

impl Observation {
    /// Annotate a raw candidate. `today` anchors month/day dates, `observed_at`
    /// becomes the record's `scraped_at`.
    pub fn annotate(raw: RawCandidate, today: NaiveDate, observed_at: DateTime<Utc>) -> Self {
        let title = clean_text(&raw.title);
        let analysis = score_text(&title);
        Self {
            identity_key: raw.identity_key.trim().to_string(),
            posted_date: normalize_opt_date_at(raw.raw_date_text.as_deref(), today),
            title,
            link: raw.link.trim().to_string(),
            price: non_blank(raw.raw_price),
            region: raw.region.trim().to_string(),
            keyword: raw.keyword.trim().to_string(),
            image: non_blank(raw.image_url),
            analysis,
            observed_at,
        }
    }
}

fn non_blank(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, thiserror::Error)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    #[error("missing identity key")]
    MissingIdentity,
    #[error("missing title")]
    MissingTitle,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::MissingIdentity => "missing_identity",
            SkipReason::MissingTitle => "missing_title",
        }
    }
}

/// What happened to one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeOutcome {
    Inserted,
    Updated,
    Skipped(SkipReason),
}

/// Counts for one or more applied batches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    pub inserted: usize,
    pub updated: usize,
    pub skipped: BTreeMap<SkipReason, usize>,
}

impl MergeReport {
    pub fn record(&mut self, outcome: MergeOutcome) {
        match outcome {
            MergeOutcome::Inserted => self.inserted += 1,
            MergeOutcome::Updated => self.updated += 1,
            MergeOutcome::Skipped(reason) => *self.skipped.entry(reason).or_default() += 1,
        }
    }

    pub fn absorb(&mut self, other: MergeReport) {
        self.inserted += other.inserted;
        self.updated += other.updated;
        for (reason, n) in other.skipped {
            *self.skipped.entry(reason).or_default() += n;
        }
    }

    pub fn skipped_total(&self) -> usize {
        self.skipped.values().sum()
    }

    pub fn skipped_for(&self, reason: SkipReason) -> usize {
        self.skipped.get(&reason).copied().unwrap_or(0)
    }

    pub fn accepted(&self) -> usize {
        self.inserted + self.updated
    }
}

/// The persisted identity-keyed collection. No two leads share a key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Store {
    leads: BTreeMap<String, Lead>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from loaded records. Records with a blank key or title are
    /// dropped. On duplicate keys the first record wins (files are written
    /// ranked, so that is the best-ranked copy).
    pub fn from_leads(leads: impl IntoIterator<Item = Lead>) -> Self {
        let mut map = BTreeMap::new();
        let mut dropped = 0usize;
        for lead in leads {
            let key = lead.identity_key.trim().to_string();
            if key.is_empty() || lead.title.trim().is_empty() || map.contains_key(&key) {
                dropped += 1;
                continue;
            }
            map.insert(key, lead);
        }
        if dropped > 0 {
            tracing::warn!(
                target: "reconcile",
                dropped,
                "dropped blank or duplicate records on load"
            );
        }
        Self { leads: map }
    }

    pub fn len(&self) -> usize {
        self.leads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leads.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Lead> {
        self.leads.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.leads.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Lead> {
        self.leads.values()
    }

    /// Snapshot of every identity currently stored.
    pub fn seen_ids(&self) -> BTreeSet<String> {
        self.leads.keys().cloned().collect()
    }

    pub fn new_count(&self) -> usize {
        self.leads.values().filter(|l| l.is_new).count()
    }

    pub(crate) fn remove(&mut self, key: &str) -> Option<Lead> {
        self.leads.remove(key)
    }

    /// Clear the previous run's `is_new` flags.
    pub fn begin_run(&mut self) {
        for lead in self.leads.values_mut() {
            lead.is_new = false;
        }
    }

    /// Apply one observation. Never clears `is_new` on its own.
    pub fn apply(&mut self, obs: Observation) -> MergeOutcome {
        if obs.identity_key.trim().is_empty() {
            return MergeOutcome::Skipped(SkipReason::MissingIdentity);
        }
        if obs.title.trim().is_empty() {
            return MergeOutcome::Skipped(SkipReason::MissingTitle);
        }

        match self.leads.get_mut(obs.identity_key.trim()) {
            Some(existing) => {
                refresh(existing, obs);
                MergeOutcome::Updated
            }
            None => {
                let lead = insert_record(obs);
                self.leads.insert(lead.identity_key.clone(), lead);
                MergeOutcome::Inserted
            }
        }
    }

    pub fn apply_batch(&mut self, batch: impl IntoIterator<Item = Observation>) -> MergeReport {
        let mut report = MergeReport::default();
        for obs in batch {
            let outcome = self.apply(obs);
            match outcome {
                MergeOutcome::Inserted => counter!("reconcile_inserted_total").increment(1),
                MergeOutcome::Updated => counter!("reconcile_updated_total").increment(1),
                MergeOutcome::Skipped(reason) => {
                    tracing::debug!(target: "reconcile", reason = reason.as_str(), "candidate skipped");
                    counter!("reconcile_skipped_total", "reason" => reason.as_str()).increment(1);
                }
            }
            report.record(outcome);
        }
        report
    }
}

/// One complete merge: clear run flags, then apply the batch.
pub fn merge(store: &mut Store, batch: impl IntoIterator<Item = Observation>) -> MergeReport {
    store.begin_run();
    store.apply_batch(batch)
}

fn insert_record(obs: Observation) -> Lead {
    Lead {
        identity_key: obs.identity_key.trim().to_string(),
        title: obs.title,
        link: obs.link,
        price: obs.price.unwrap_or_else(|| UNKNOWN_PRICE.to_string()),
        region: obs.region,
        matched_keyword: obs.keyword,
        score: obs.analysis.score,
        classification: obs.analysis.classification,
        analysis: obs.analysis.explanation,
        image: obs.image,
        posted_date: obs.posted_date,
        scraped_at: obs.observed_at,
        is_new: true,
    }
}

/// Partial update: absent candidate fields never blank stored data.
fn refresh(lead: &mut Lead, obs: Observation) {
    if let Some(price) = obs.price {
        lead.price = price;
    }
    lead.score = obs.analysis.score;
    lead.classification = obs.analysis.classification;
    lead.analysis = obs.analysis.explanation;
    lead.scraped_at = obs.observed_at;

    // The earliest concrete posting date is authoritative.
    if !lead.posted_date.is_known() && obs.posted_date.is_known() {
        lead.posted_date = obs.posted_date;
    }
    if lead.image.is_none() {
        lead.image = obs.image;
    }
}
