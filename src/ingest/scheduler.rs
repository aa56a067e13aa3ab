// src/ingest/scheduler.rs
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::engine::LeadEngine;
use crate::ingest::config::SearchPlan;
use crate::ingest::types::CandidateSource;

#[derive(Clone, Copy, Debug)]
pub struct RunSchedulerCfg {
    pub interval_secs: u64,
}

/// Spawn a loop that runs the engine on a fixed interval (first run immediately).
/// A failed run is logged and retried in full at the next tick.
pub fn spawn_run_scheduler(
    engine: Arc<LeadEngine>,
    source: Arc<dyn CandidateSource>,
    plan: SearchPlan,
    cfg: RunSchedulerCfg,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(cfg.interval_secs.max(1)));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            match engine.run(source.as_ref(), &plan).await {
                Ok(report) => tracing::info!(
                    target: "ingest",
                    source = source.name(),
                    inserted = report.merge.inserted,
                    total = report.total,
                    "scheduled run tick"
                ),
                Err(e) => tracing::warn!(
                    target: "ingest",
                    source = source.name(),
                    "scheduled run failed: {e:#}"
                ),
            }
        }
    })
}
