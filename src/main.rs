//! Edgewarden service entrypoint
//!
//! Wires the core together: case/event store, aggregation engine, ingest
//! pipeline, admission gate and its idle sweeper. The HTTP/transport layer
//! is an external collaborator; it evaluates requests against the gate and
//! forwards verdicts through the event sink.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use edgewarden::logic::admission::{spawn_idle_sweeper, AdmissionGate};
use edgewarden::logic::case::CaseStore;
use edgewarden::logic::forensics::{AggregationEngine, TextReportGenerator};
use edgewarden::logic::ingest::IngestPipeline;
use edgewarden::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "edgewarden=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env();

    tracing::info!("Edgewarden starting...");
    tracing::info!("Database: {}", config.database_path);

    let store = Arc::new(CaseStore::open(&config.database_path)?);
    let counts = store.counts()?;
    tracing::info!(
        "Store ready: {} cases, {} events on record",
        counts.cases,
        counts.events
    );

    let engine = Arc::new(AggregationEngine::new(
        store.clone(),
        Box::new(TextReportGenerator),
        &config,
    ));
    let (sink, pipeline) = IngestPipeline::new(&config, store.clone(), engine);
    let dead_letters = pipeline.dead_letter_queue();
    let pipeline_task = tokio::spawn(pipeline.run());

    let gate = Arc::new(AdmissionGate::new(&config));
    let sweeper = spawn_idle_sweeper(gate.clone(), config.actor_sweep_interval_ms);

    tracing::info!(
        "Admission core ready (capacity {} rps, {} ms window); transport layer attaches via gate and sink",
        config.system_capacity_rps,
        config.aggregation_window_ms
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received; draining pipeline");

    sweeper.abort();
    drop(sink);
    pipeline_task.await?;

    let parked = dead_letters.len();
    if parked > 0 {
        tracing::warn!("{} dead-lettered events await operator review", parked);
    }
    tracing::info!("Edgewarden stopped");
    Ok(())
}
