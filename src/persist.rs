// src/persist.rs
//! Durable output of a run.
//!
//! Every artifact is staged in a temp file inside the data dir and then renamed
//! over its destination, so readers only ever see a complete old or complete
//! new file. Staged files are removed on every error path (tempfile's drop).
//! When a mirror rename fails after the primary landed, the caller puts the
//! previous run's output back with [`Persister::restore`].
//!
//! Artifacts:
//! - `leads-v2.json`   ranked leads (primary store, read back on startup)
//! - `leads.csv`       the same rows for spreadsheet analysis
//! - `metadata.json`   `RunMetadata`
//! - `seen_posts.json` sorted identity keys, for cheap membership checks

use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs;
use std::io::Write as _;
use std::path::PathBuf;
use tempfile::NamedTempFile;

use crate::lead::{Lead, RunMetadata};
use crate::reconcile::Store;

pub const LEADS_FILE: &str = "leads-v2.json";
pub const CSV_FILE: &str = "leads.csv";
pub const METADATA_FILE: &str = "metadata.json";
pub const SEEN_FILE: &str = "seen_posts.json";

#[derive(Debug, Clone)]
pub struct Persister {
    dir: PathBuf,
}

#[derive(Serialize)]
struct CsvRow<'a> {
    id: &'a str,
    title: &'a str,
    price: &'a str,
    region: &'a str,
    keyword: &'a str,
    score: f32,
    classification: &'a str,
    posted_date: String,
    scraped_at: String,
    is_new: bool,
    link: &'a str,
    image: &'a str,
}

impl Persister {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn leads_path(&self) -> PathBuf {
        self.dir.join(LEADS_FILE)
    }

    /// Load the store written by the last run. A missing file is an empty store;
    /// an unreadable one is an error (overwriting it would lose history).
    pub fn load_store(&self) -> Result<Store> {
        let path = self.leads_path();
        if !path.exists() {
            tracing::info!(target: "persist", path = %path.display(), "no previous store; starting empty");
            return Ok(Store::new());
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("reading store from {}", path.display()))?;
        let leads: Vec<Lead> = serde_json::from_str(&content)
            .with_context(|| format!("parsing store {}", path.display()))?;
        let store = Store::from_leads(leads);
        tracing::info!(target: "persist", records = store.len(), "store loaded");
        Ok(store)
    }

    pub fn load_metadata(&self) -> Result<Option<RunMetadata>> {
        let path = self.dir.join(METADATA_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("reading metadata from {}", path.display()))?;
        let meta = serde_json::from_str(&content)
            .with_context(|| format!("parsing metadata {}", path.display()))?;
        Ok(Some(meta))
    }

    /// Write all artifacts. The caller treats any error as a failed run.
    ///
    /// The primary store is renamed first; mirrors follow only once it landed,
    /// so a failed primary write leaves every file as it was.
    pub fn persist(
        &self,
        ranked: &[Lead],
        seen: &BTreeSet<String>,
        meta: &RunMetadata,
    ) -> Result<()> {
        self.write(ranked, seen, Some(meta))?;
        tracing::info!(
            target: "persist",
            dir = %self.dir.display(),
            total = meta.total_count,
            new = meta.new_count,
            "store persisted"
        );
        Ok(())
    }

    /// Rewrite the output of the last good run after a failed one.
    /// `meta == None` means no run ever completed: a stray metadata file is removed.
    pub fn restore(
        &self,
        ranked: &[Lead],
        seen: &BTreeSet<String>,
        meta: Option<&RunMetadata>,
    ) -> Result<()> {
        self.write(ranked, seen, meta)?;
        if meta.is_none() {
            let path = self.dir.join(METADATA_FILE);
            if path.exists() {
                fs::remove_file(&path)
                    .with_context(|| format!("removing {}", path.display()))?;
            }
        }
        tracing::info!(
            target: "persist",
            dir = %self.dir.display(),
            records = ranked.len(),
            "previous output restored"
        );
        Ok(())
    }

    fn write(
        &self,
        ranked: &[Lead],
        seen: &BTreeSet<String>,
        meta: Option<&RunMetadata>,
    ) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating data dir {}", self.dir.display()))?;

        // Stage everything first; nothing is renamed until all writes succeeded.
        let mut staged = vec![
            (LEADS_FILE, self.stage(&serde_json::to_vec_pretty(ranked)?)?),
            (SEEN_FILE, self.stage(&serde_json::to_vec(seen)?)?),
        ];
        if let Some(meta) = meta {
            staged.push((METADATA_FILE, self.stage(&serde_json::to_vec_pretty(meta)?)?));
        }
        staged.push((CSV_FILE, self.stage(&csv_bytes(ranked)?)?));

        for (name, tmp) in staged {
            let dest = self.dir.join(name);
            tmp.persist(&dest)
                .map_err(|e| e.error)
                .with_context(|| format!("replacing {}", dest.display()))?;
        }
        Ok(())
    }

    fn stage(&self, bytes: &[u8]) -> Result<NamedTempFile> {
        let mut tmp = NamedTempFile::new_in(&self.dir)
            .with_context(|| format!("creating temp file in {}", self.dir.display()))?;
        tmp.write_all(bytes).context("writing temp file")?;
        tmp.as_file().sync_all().context("syncing temp file")?;
        Ok(tmp)
    }
}

fn csv_bytes(ranked: &[Lead]) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    for l in ranked {
        writer.serialize(CsvRow {
            id: &l.identity_key,
            title: &l.title,
            price: &l.price,
            region: &l.region,
            keyword: &l.matched_keyword,
            score: l.score,
            classification: l.classification.as_str(),
            posted_date: l.posted_date.to_string(),
            scraped_at: l.scraped_at.to_rfc3339(),
            is_new: l.is_new,
            link: &l.link,
            image: l.image.as_deref().unwrap_or_default(),
        })?;
    }
    if ranked.is_empty() {
        writer.write_record([
            "id",
            "title",
            "price",
            "region",
            "keyword",
            "score",
            "classification",
            "posted_date",
            "scraped_at",
            "is_new",
            "link",
            "image",
        ])?;
    }
    writer
        .into_inner()
        .map_err(|e| anyhow!("flushing csv buffer: {}", e.error()))
}
