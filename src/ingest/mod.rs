// src/ingest/mod.rs
//! Extraction boundary: fan a search plan out over a [`CandidateSource`].
//!
//! One task per region x keyword, at most `concurrency` in flight. Results
//! are yielded in plan order, so a listing found by several partitions keeps
//! the provenance of the first one. A failed task is logged and counted; it
//! never cancels its siblings.
pub mod config;
pub mod providers;
pub mod scheduler;
pub mod types;

use futures::stream::{self, Stream, StreamExt};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, histogram};
use once_cell::sync::OnceCell;

use crate::ingest::config::SearchPlan;
use crate::ingest::types::{CandidateSource, RawCandidate, Region};

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "ingest_candidates_total",
            "Raw candidates returned by extraction tasks."
        );
        describe_counter!(
            "ingest_source_errors_total",
            "Extraction tasks that failed."
        );
        describe_histogram!("ingest_fetch_ms", "Extraction task time in milliseconds.");
        describe_counter!("reconcile_inserted_total", "Leads inserted by merges.");
        describe_counter!("reconcile_updated_total", "Leads refreshed on resighting.");
        describe_counter!(
            "reconcile_skipped_total",
            "Candidates skipped at merge, by reason."
        );
        describe_counter!("runs_total", "Completed runs, by status.");
        describe_gauge!("store_size", "Leads in the store after the last run.");
        describe_gauge!("run_last_ts", "Unix ts when the last run was persisted.");
    });
}

/// Result of one region x keyword extraction task.
#[derive(Debug)]
pub struct TaskResult {
    pub region: Region,
    pub keyword: String,
    pub result: anyhow::Result<Vec<RawCandidate>>,
}

/// Totals from [`collect_candidates`].
#[derive(Debug, Default)]
pub struct Collected {
    pub candidates: Vec<RawCandidate>,
    pub tasks: usize,
    pub failed: usize,
}

/// Stream task results in plan order. Returned candidates carry their
/// partition as provenance and a derived identity key where one was missing.
pub fn fetch_partitions<'a>(
    source: &'a dyn CandidateSource,
    plan: &SearchPlan,
    concurrency: usize,
) -> impl Stream<Item = TaskResult> + Send + 'a {
    ensure_metrics_described();

    stream::iter(plan.partitions())
        .map(move |(region, keyword)| async move {
            let t0 = std::time::Instant::now();
            let result = source
                .fetch_candidates(&region, &keyword)
                .await
                .map(|found| {
                    found
                        .into_iter()
                        .map(|c| c.with_partition(&region, &keyword).with_derived_identity())
                        .collect::<Vec<_>>()
                });
            histogram!("ingest_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

            match &result {
                Ok(found) => {
                    counter!("ingest_candidates_total").increment(found.len() as u64);
                    tracing::debug!(
                        target: "ingest",
                        source = source.name(),
                        region = %region.name,
                        keyword = %keyword,
                        found = found.len(),
                        "task done"
                    );
                }
                Err(e) => {
                    counter!("ingest_source_errors_total").increment(1);
                    tracing::warn!(
                        target: "ingest",
                        source = source.name(),
                        region = %region.name,
                        keyword = %keyword,
                        error = ?e,
                        "extraction task failed"
                    );
                }
            }

            TaskResult {
                region,
                keyword,
                result,
            }
        })
        .buffered(concurrency.max(1))
}

/// Run every task of the plan to completion and gather the candidates.
pub async fn collect_candidates(
    source: &dyn CandidateSource,
    plan: &SearchPlan,
    concurrency: usize,
) -> Collected {
    let mut out = Collected::default();
    let mut tasks = std::pin::pin!(fetch_partitions(source, plan, concurrency));
    while let Some(task) = tasks.next().await {
        out.tasks += 1;
        match task.result {
            Ok(mut found) => out.candidates.append(&mut found),
            Err(_) => out.failed += 1,
        }
    }
    out
}
