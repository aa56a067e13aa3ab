//! One-shot run against a fixture file: load the store, merge, rank, persist,
//! print a summary. Handy for inspecting output files without the server.

use anyhow::Context;
use oldtimecrank::config::EngineConfig;
use oldtimecrank::engine::LeadEngine;
use oldtimecrank::ingest::config::load_plan_default;
use oldtimecrank::ingest::providers::fixture::FixtureSource;

const DEFAULT_FIXTURE: &str = "fixtures/candidates.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().with_target(false).init();

    let fixture = std::env::var("LEADS_FIXTURE_PATH").unwrap_or_else(|_| DEFAULT_FIXTURE.into());
    let source = FixtureSource::from_path(std::path::Path::new(&fixture))
        .with_context(|| format!("loading fixture {fixture}"))?;
    let plan = load_plan_default()?;
    let engine = LeadEngine::open(EngineConfig::load_default()?)?;

    let report = engine.run(&source, &plan).await?;

    println!(
        "run done: tasks={} failed={} candidates={} inserted={} updated={} skipped={} trimmed={} total={} new={}",
        report.tasks,
        report.failed_tasks,
        report.candidates,
        report.merge.inserted,
        report.merge.updated,
        report.merge.skipped_total(),
        report.trimmed,
        report.total,
        report.new,
    );
    for lead in engine.snapshot().leads.iter().take(10) {
        println!(
            "{}  {:>3.1}  {:<16}  {}",
            lead.posted_date,
            lead.score,
            lead.classification.as_str(),
            lead.title
        );
    }
    Ok(())
}
