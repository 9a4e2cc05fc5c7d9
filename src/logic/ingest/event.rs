//! Verdict event wire schema

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::logic::admission::{Action, RequestFeatures, Verdict};
use crate::logic::case::{case_key, EventRecord};

/// One admission verdict, emitted asynchronously by the edge and consumed
/// by the ingestion pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerdictEvent {
    /// Decision time, milliseconds since epoch
    pub ts: i64,
    pub ip: String,
    pub asn: u32,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub user_agent: String,
    pub path: String,
    pub method: String,
    pub action: Action,
    pub score: f64,
    pub hits: u32,
    pub zone: String,
    /// Edge location tag
    #[serde(default)]
    pub colo: String,
}

impl VerdictEvent {
    /// Build the event for a verdict the gate just returned.
    pub fn from_verdict(
        features: &RequestFeatures,
        verdict: &Verdict,
        zone: &str,
        country: &str,
        colo: &str,
        ts: i64,
    ) -> Self {
        Self {
            ts,
            ip: features.ip.clone(),
            asn: features.asn,
            country: country.to_string(),
            user_agent: features.user_agent.clone(),
            path: features.path.clone(),
            method: features.method.clone(),
            action: verdict.action,
            score: verdict.score,
            hits: verdict.hits,
            zone: zone.to_string(),
            colo: colo.to_string(),
        }
    }

    /// The owning case's unique key.
    pub fn case_key(&self) -> String {
        case_key(&self.zone, &self.ip, self.asn)
    }

    /// Reject events that must never become rows: partial identity fields
    /// or out-of-range scores.
    pub fn validate(&self) -> AppResult<()> {
        if self.ts <= 0 {
            return Err(AppError::InvalidEvent("non-positive timestamp".into()));
        }
        if self.ip.is_empty() {
            return Err(AppError::InvalidEvent("empty ip".into()));
        }
        if self.zone.is_empty() {
            return Err(AppError::InvalidEvent("empty zone".into()));
        }
        if !self.score.is_finite() || self.score < 0.0 {
            return Err(AppError::InvalidEvent(format!(
                "score out of range: {}",
                self.score
            )));
        }
        Ok(())
    }

    /// The audit-trail row for this event.
    pub fn to_record(&self) -> EventRecord {
        EventRecord {
            ts: self.ts,
            path: self.path.clone(),
            method: self.method.clone(),
            user_agent: self.user_agent.clone(),
            action: self.action,
            score: self.score,
            hits: self.hits,
            colo: self.colo.clone(),
        }
    }
}
