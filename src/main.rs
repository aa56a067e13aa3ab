//! Lead service binary entrypoint.
//! Loads the store, starts the run scheduler when a source is configured,
//! and serves the read API plus `/metrics`.

use std::sync::Arc;

use anyhow::Context;
use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use oldtimecrank::api::{self, AppState};
use oldtimecrank::config::EngineConfig;
use oldtimecrank::engine::LeadEngine;
use oldtimecrank::ingest::config::load_plan_default;
use oldtimecrank::ingest::providers::{fixture::FixtureSource, json_feed::JsonFeedSource};
use oldtimecrank::ingest::scheduler::{spawn_run_scheduler, RunSchedulerCfg};
use oldtimecrank::ingest::types::CandidateSource;
use oldtimecrank::metrics::Metrics;

const ENV_FEED_URL: &str = "LEADS_FEED_URL";
const ENV_FIXTURE_PATH: &str = "LEADS_FIXTURE_PATH";

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("ingest=info,reconcile=info,persist=info,warn"));

    // LOG_FORMAT=json for log shippers; compact text otherwise.
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    // Shuttle may already have installed a subscriber.
    let registry = tracing_subscriber::registry().with(filter);
    let _ = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
}

/// Pick the candidate source from the environment. `None` means serve-only.
fn source_from_env() -> anyhow::Result<Option<Arc<dyn CandidateSource>>> {
    if let Ok(url) = std::env::var(ENV_FEED_URL) {
        let src = JsonFeedSource::new(url).context("building feed source")?;
        return Ok(Some(Arc::new(src)));
    }
    if let Ok(path) = std::env::var(ENV_FIXTURE_PATH) {
        let src = FixtureSource::from_path(std::path::Path::new(&path))
            .with_context(|| format!("loading fixture source {path}"))?;
        return Ok(Some(Arc::new(src)));
    }
    Ok(None)
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let config = EngineConfig::load_default()?;
    let metrics = Metrics::init(config.max_store_size)?;
    let engine = Arc::new(LeadEngine::open(config)?);

    match source_from_env()? {
        Some(source) => {
            let plan = load_plan_default()?;
            let cfg = RunSchedulerCfg {
                interval_secs: engine.config().run_interval_secs,
            };
            tracing::info!(
                target: "ingest",
                source = source.name(),
                partitions = plan.partitions().len(),
                interval_secs = cfg.interval_secs,
                "run scheduler started"
            );
            spawn_run_scheduler(engine.clone(), source, plan, cfg);
        }
        None => tracing::info!(target: "ingest", "no source configured; serving stored leads only"),
    }

    let router = api::router(AppState { engine }).merge(metrics.router());
    Ok(router.into())
}
