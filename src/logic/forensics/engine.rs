//! Aggregation engine
//!
//! Recomputes a case's windowed metrics after every ingested event and
//! materializes the snapshot plus report artifacts when the trigger policy
//! fires. Recompute-and-write is serialized per case: a per-case async
//! mutex is held across the whole read-window -> compute -> snapshot-write
//! sequence, so a later recompute always observes at least the events of
//! an earlier one and the last snapshot written reflects the most complete
//! window.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info};

use super::metrics::{compute_window_metrics, CaseMetrics};
use super::report::ReportGenerator;
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::logic::case::CaseStore;

pub struct AggregationEngine {
    store: Arc<CaseStore>,
    reporter: Box<dyn ReportGenerator>,
    capacity_rps: f64,
    window_ms: i64,
    // Cases are never deleted, so this map is bounded by the number of
    // distinct cases seen since startup.
    case_locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl AggregationEngine {
    pub fn new(store: Arc<CaseStore>, reporter: Box<dyn ReportGenerator>, config: &Config) -> Self {
        Self {
            store,
            reporter,
            capacity_rps: config.system_capacity_rps,
            window_ms: config.aggregation_window_ms,
            case_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Recompute the trailing window for a case and materialize if the
    /// trigger policy fires.
    pub async fn recompute(&self, case_id: &str) -> AppResult<CaseMetrics> {
        self.recompute_at(case_id, crate::logic::now_ms()).await
    }

    /// Deterministic core of `recompute`; `now` is injected for tests.
    pub async fn recompute_at(&self, case_id: &str, now: i64) -> AppResult<CaseMetrics> {
        let lock = self.lock_for(case_id);
        let _guard = lock.lock().await;

        let events = self
            .store
            .events_in_window(case_id, now - self.window_ms)?;
        let metrics = compute_window_metrics(&events, self.capacity_rps, self.window_ms);

        if metrics.should_materialize() {
            let case = self
                .store
                .case_by_id(case_id)?
                .ok_or_else(|| AppError::CaseNotFound(case_id.to_string()))?;
            let artifacts = self.reporter.generate(&case, &metrics);
            self.store
                .update_snapshot(case_id, &metrics, &artifacts, now)?;
            info!(
                case = %case.key,
                events = metrics.window_events,
                evidence = metrics.evidence_count,
                af = metrics.af,
                bof = metrics.bof,
                "case snapshot materialized"
            );
        } else {
            debug!(
                case_id,
                events = metrics.window_events,
                evidence = metrics.evidence_count,
                "recompute below materialization trigger"
            );
        }

        Ok(metrics)
    }

    fn lock_for(&self, case_id: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.case_locks.lock();
        locks.entry(case_id.to_string()).or_default().clone()
    }
}
