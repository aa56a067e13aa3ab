//! # Lead Engine
//! Owns the store for the lifetime of the process and runs the
//! extract -> annotate -> merge -> rank -> persist sequence.
//!
//! The store is loaded once in [`LeadEngine::open`]. Each run holds the store
//! lock from its first merge to its persist, so merges never interleave. A
//! run that fails to persist restores the pre-run store, in memory and on
//! disk; the caller retries the whole run.
//!
//! Readers never touch the store: they get the ranked [`Snapshot`] published
//! by the last successful run.

use anyhow::{Context, Result};
use chrono::{DateTime, Local, Utc};
use futures::StreamExt;
use metrics::{counter, gauge};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;

use crate::config::EngineConfig;
use crate::history::History;
use crate::ingest::{self, config::SearchPlan, types::CandidateSource, types::RawCandidate};
use crate::lead::{Lead, RunMetadata};
use crate::persist::Persister;
use crate::rank::{rank, trim_to_capacity};
use crate::reconcile::{MergeReport, Observation, Store};

const HISTORY_CAP: usize = 200;

/// Ranked view published after each successful run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Snapshot {
    pub leads: Vec<Lead>,
    pub seen: BTreeSet<String>,
    pub metadata: Option<RunMetadata>,
}

/// What one run did.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub tasks: usize,
    pub failed_tasks: usize,
    pub candidates: usize,
    pub merge: MergeReport,
    pub trimmed: usize,
    pub total: usize,
    pub new: usize,
}

pub struct LeadEngine {
    config: EngineConfig,
    persister: Persister,
    store: Mutex<Store>,
    snapshot: RwLock<Arc<Snapshot>>,
    history: History,
}

impl LeadEngine {
    /// Load the persisted store and metadata from `config.data_dir`.
    pub fn open(config: EngineConfig) -> Result<Self> {
        ingest::ensure_metrics_described();
        let persister = Persister::new(&config.data_dir);
        let store = persister.load_store().context("loading lead store")?;
        let metadata = persister.load_metadata().unwrap_or_else(|e| {
            tracing::warn!(target: "persist", error = ?e, "ignoring unreadable metadata");
            None
        });
        let snapshot = Snapshot {
            leads: rank(&store),
            seen: store.seen_ids(),
            metadata,
        };
        gauge!("store_size").set(store.len() as f64);

        Ok(Self {
            config,
            persister,
            store: Mutex::new(store),
            snapshot: RwLock::new(Arc::new(snapshot)),
            history: History::with_capacity(HISTORY_CAP),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Full run: fan the plan out over `source`, merging each task's batch as
    /// it completes.
    pub async fn run(&self, source: &dyn CandidateSource, plan: &SearchPlan) -> Result<RunReport> {
        let started_at = Utc::now();
        let mut store = self.store.lock().await;
        let before = store.clone();
        store.begin_run();

        let mut merge = MergeReport::default();
        let (mut tasks, mut failed_tasks, mut candidates) = (0usize, 0usize, 0usize);

        let mut results =
            std::pin::pin!(ingest::fetch_partitions(source, plan, self.config.concurrency));
        while let Some(task) = results.next().await {
            tasks += 1;
            match task.result {
                Ok(found) => {
                    candidates += found.len();
                    merge.absorb(store.apply_batch(annotate_all(found)));
                }
                Err(_) => failed_tasks += 1,
            }
        }

        self.finish_run(&mut store, before, started_at, tasks, failed_tasks, candidates, merge)
    }

    /// Merge an already collected batch as one run.
    pub async fn ingest_batch(&self, batch: Vec<RawCandidate>) -> Result<RunReport> {
        let started_at = Utc::now();
        let mut store = self.store.lock().await;
        let before = store.clone();
        store.begin_run();

        let candidates = batch.len();
        let merge = store.apply_batch(annotate_all(
            batch.into_iter().map(RawCandidate::with_derived_identity).collect(),
        ));

        self.finish_run(&mut store, before, started_at, 1, 0, candidates, merge)
    }

    #[allow(clippy::too_many_arguments)]
    fn finish_run(
        &self,
        store: &mut Store,
        before: Store,
        started_at: DateTime<Utc>,
        tasks: usize,
        failed_tasks: usize,
        candidates: usize,
        merge: MergeReport,
    ) -> Result<RunReport> {
        let trimmed = match self.config.max_store_size {
            Some(max) => trim_to_capacity(store, max).len(),
            None => 0,
        };

        let ranked = rank(store);
        let seen = store.seen_ids();
        let metadata = RunMetadata {
            last_updated: Utc::now(),
            total_count: ranked.len(),
            new_count: ranked.iter().filter(|l| l.is_new).count(),
            skipped_count: merge.skipped_total(),
            trimmed_count: trimmed,
        };

        if let Err(e) = self.persister.persist(&ranked, &seen, &metadata) {
            *store = before;
            counter!("runs_total", "status" => "failed").increment(1);
            tracing::error!(target: "persist", error = ?e, "run failed; store rolled back");
            self.restore_output(store);
            return Err(e.context("persisting run output"));
        }

        let report = RunReport {
            started_at,
            finished_at: Utc::now(),
            tasks,
            failed_tasks,
            candidates,
            merge,
            trimmed,
            total: metadata.total_count,
            new: metadata.new_count,
        };

        counter!("runs_total", "status" => "ok").increment(1);
        gauge!("store_size").set(metadata.total_count as f64);
        gauge!("run_last_ts").set(metadata.last_updated.timestamp() as f64);

        *self.snapshot.write().unwrap_or_else(|e| e.into_inner()) = Arc::new(Snapshot {
            leads: ranked,
            seen,
            metadata: Some(metadata),
        });
        self.history.push(report.clone());

        tracing::info!(
            target: "reconcile",
            tasks = report.tasks,
            failed_tasks = report.failed_tasks,
            candidates = report.candidates,
            inserted = report.merge.inserted,
            updated = report.merge.updated,
            skipped = report.merge.skipped_total(),
            trimmed = report.trimmed,
            total = report.total,
            "run complete"
        );
        Ok(report)
    }

    /// Put the last good run's files back so mirrors agree with the primary store.
    fn restore_output(&self, store: &Store) {
        let last = self.snapshot();
        let restored = self
            .persister
            .restore(&rank(store), &store.seen_ids(), last.metadata.as_ref());
        if let Err(e) = restored {
            tracing::error!(target: "persist", error = ?e, "could not restore previous output");
        }
    }
}

fn annotate_all(batch: Vec<RawCandidate>) -> Vec<Observation> {
    let today = Local::now().date_naive();
    let observed_at = Utc::now();
    batch
        .into_iter()
        .map(|raw| Observation::annotate(raw, today, observed_at))
        .collect()
}
