//! Event ingestion pipeline
//!
//! Consumes the verdict event stream in batches. Each message is processed
//! independently: validate, persist (case upsert + event append), then
//! trigger a windowed recompute for the owning case. Transient failures
//! are retried with a linear backoff and exhausted messages are
//! dead-lettered with their reason.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::dead_letter::DeadLetterQueue;
use super::event::VerdictEvent;
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::logic::case::CaseStore;
use crate::logic::forensics::{AggregationEngine, CaseMetrics};

/// Pause between retry attempts, multiplied by the attempt number.
const RETRY_BACKOFF: Duration = Duration::from_millis(50);

/// Clone-able handle the admission side uses to emit verdict events.
#[derive(Clone)]
pub struct EventSink {
    tx: mpsc::Sender<VerdictEvent>,
}

impl EventSink {
    /// Submit one event, waiting for channel capacity rather than dropping.
    pub async fn submit(&self, event: VerdictEvent) -> AppResult<()> {
        self.tx
            .send(event)
            .await
            .map_err(|_| AppError::ChannelClosed)
    }
}

pub struct IngestPipeline {
    rx: mpsc::Receiver<VerdictEvent>,
    store: Arc<CaseStore>,
    engine: Arc<AggregationEngine>,
    dead_letters: Arc<DeadLetterQueue>,
    batch_size: usize,
    retry_attempts: u32,
}

impl IngestPipeline {
    pub fn new(
        config: &Config,
        store: Arc<CaseStore>,
        engine: Arc<AggregationEngine>,
    ) -> (EventSink, Self) {
        let (tx, rx) = mpsc::channel(config.ingest_channel_capacity.max(1));
        let pipeline = Self {
            rx,
            store,
            engine,
            dead_letters: Arc::new(DeadLetterQueue::new(config.dead_letter_capacity)),
            batch_size: config.ingest_batch_size.max(1),
            retry_attempts: config.ingest_retry_attempts.max(1),
        };
        (EventSink { tx }, pipeline)
    }

    /// The dead-letter queue, for operators and tests.
    pub fn dead_letter_queue(&self) -> Arc<DeadLetterQueue> {
        self.dead_letters.clone()
    }

    /// Run until every sink is dropped and the channel drains.
    pub async fn run(mut self) {
        let mut batch = Vec::with_capacity(self.batch_size);
        loop {
            let received = self.rx.recv_many(&mut batch, self.batch_size).await;
            if received == 0 {
                break;
            }
            for event in batch.drain(..) {
                self.process(event).await;
            }
        }
        info!("verdict channel closed; ingest pipeline drained");
    }

    /// One message, one outcome. A poisoned event never suppresses the
    /// processing of its batch peers.
    async fn process(&self, event: VerdictEvent) {
        if let Err(err) = event.validate() {
            self.dead_letters.push(event, err.to_string());
            return;
        }

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.persist_and_recompute(&event).await {
                Ok(metrics) => {
                    debug!(
                        case = %event.case_key(),
                        action = %event.action,
                        window_events = metrics.window_events,
                        "verdict event ingested"
                    );
                    return;
                }
                Err(err) if err.is_transient() && attempt < self.retry_attempts => {
                    warn!(
                        case = %event.case_key(),
                        attempt,
                        %err,
                        "ingest attempt failed; retrying"
                    );
                    tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                }
                Err(err) => {
                    self.dead_letters.push(event, err.to_string());
                    return;
                }
            }
        }
    }

    // At-least-once: a retry after a mid-sequence failure may append the
    // event twice; the aggregation side recomputes from the log either way.
    async fn persist_and_recompute(&self, event: &VerdictEvent) -> AppResult<CaseMetrics> {
        let case_id = self.store.upsert_case(
            &event.zone,
            &event.ip,
            event.asn,
            &event.country,
            event.ts,
        )?;
        self.store.append_event(&case_id, &event.to_record())?;
        self.engine.recompute(&case_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::admission::Action;
    use crate::logic::forensics::TextReportGenerator;
    use crate::logic::now_ms;

    fn test_config() -> Config {
        Config {
            database_path: ":memory:".into(),
            system_capacity_rps: 500.0,
            aggregation_window_ms: 60_000,
            actor_idle_expiration_ms: 300_000,
            actor_sweep_interval_ms: 60_000,
            tarpit_duration_ms: 15_000,
            tarpit_interval_ms: 1_100,
            ingest_channel_capacity: 64,
            ingest_batch_size: 8,
            ingest_retry_attempts: 3,
            dead_letter_capacity: 16,
        }
    }

    fn harness() -> (EventSink, IngestPipeline, Arc<CaseStore>) {
        let config = test_config();
        let store = Arc::new(CaseStore::open_in_memory().unwrap());
        let engine = Arc::new(AggregationEngine::new(
            store.clone(),
            Box::new(TextReportGenerator),
            &config,
        ));
        let (sink, pipeline) = IngestPipeline::new(&config, store.clone(), engine);
        (sink, pipeline, store)
    }

    fn event(ip: &str, action: Action, score: f64) -> VerdictEvent {
        VerdictEvent {
            ts: now_ms(),
            ip: ip.into(),
            asn: 64496,
            country: "DE".into(),
            user_agent: "curl/8.0".into(),
            path: "/api/q".into(),
            method: "GET".into(),
            action,
            score,
            hits: 1,
            zone: "example.com".into(),
            colo: "fra01".into(),
        }
    }

    #[tokio::test]
    async fn test_events_flow_into_store() {
        let (sink, pipeline, store) = harness();
        let dead_letters = pipeline.dead_letter_queue();
        let worker = tokio::spawn(pipeline.run());

        for _ in 0..5 {
            sink.submit(event("203.0.113.7", Action::Block, 2.0)).await.unwrap();
        }
        drop(sink);
        worker.await.unwrap();

        let counts = store.counts().unwrap();
        assert_eq!(counts.cases, 1);
        assert_eq!(counts.events, 5);
        assert!(dead_letters.is_empty());

        let case = store
            .case_by_key("example.com:203.0.113.7:64496")
            .unwrap()
            .unwrap();
        assert_eq!(case.status, "OPEN");
    }

    #[tokio::test]
    async fn test_malformed_event_is_dead_lettered_not_inserted() {
        let (sink, pipeline, store) = harness();
        let dead_letters = pipeline.dead_letter_queue();
        let worker = tokio::spawn(pipeline.run());

        let mut bad = event("", Action::Allow, 0.0);
        bad.ip = String::new();
        sink.submit(bad).await.unwrap();
        sink.submit(event("203.0.113.7", Action::Allow, 0.0)).await.unwrap();
        drop(sink);
        worker.await.unwrap();

        // The good event landed; the malformed one never became a row.
        let counts = store.counts().unwrap();
        assert_eq!(counts.cases, 1);
        assert_eq!(counts.events, 1);

        let parked = dead_letters.drain();
        assert_eq!(parked.len(), 1);
        assert!(parked[0].reason.contains("empty ip"));
    }

    #[tokio::test]
    async fn test_one_bad_message_never_blocks_batch_peers() {
        let (sink, pipeline, store) = harness();
        let worker = tokio::spawn(pipeline.run());

        // Interleave malformed events between valid ones in one burst, so
        // they travel through the same recv_many batch.
        for i in 0..8 {
            let mut e = event("203.0.113.7", Action::Challenge, 6.0);
            if i % 2 == 1 {
                e.zone = String::new();
            }
            sink.submit(e).await.unwrap();
        }
        drop(sink);
        worker.await.unwrap();

        assert_eq!(store.counts().unwrap().events, 4);
    }

    #[tokio::test]
    async fn test_materialization_happens_through_pipeline() {
        let (sink, pipeline, store) = harness();
        let worker = tokio::spawn(pipeline.run());

        // Fifty high-score blocks: evidence far past the trigger.
        for _ in 0..50 {
            sink.submit(event("198.51.100.2", Action::Block, 10.0)).await.unwrap();
        }
        drop(sink);
        worker.await.unwrap();

        let case = store
            .case_by_key("example.com:198.51.100.2:64496")
            .unwrap()
            .unwrap();
        assert!(case.snapshot_version >= 1);
        assert!(case.evidence_count >= 50);
        assert!(case.abuse_report.is_some());
        assert!(case.section504_draft.is_some());
    }
}
