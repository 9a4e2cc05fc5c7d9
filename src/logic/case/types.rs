//! Case and event row types

use serde::{Deserialize, Serialize};

use crate::logic::admission::Action;

/// The only case status this pipeline produces. Cases are never closed or
/// deleted by the core; downstream tooling owns lifecycle beyond OPEN.
pub const STATUS_OPEN: &str = "OPEN";

/// Aggregate record tracking one suspected attacker per zone.
///
/// Keyed by `zone:ip:asn`; metric fields are a snapshot of the most recent
/// materializing recompute, not a running total.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Case {
    pub id: String,
    pub key: String,
    pub zone: String,
    pub ip: String,
    pub asn: u32,
    pub country: String,
    pub first_seen: i64,
    pub last_seen: i64,
    pub status: String,
    pub attack_rps: f64,
    pub est_bandwidth_mbps: f64,
    pub system_capacity_rps: f64,
    pub af: f64,
    pub df: f64,
    pub bof: f64,
    pub evidence_count: i64,
    pub mercy: f64,
    pub justice: f64,
    /// Bumped on every snapshot write; audit signal for the per-case
    /// single-writer discipline.
    pub snapshot_version: i64,
    pub abuse_report: Option<String>,
    pub section504_draft: Option<String>,
}

/// Derive the unique case key for an identity within a zone.
pub fn case_key(zone: &str, ip: &str, asn: u32) -> String {
    format!("{zone}:{ip}:{asn}")
}

/// One immutable entry in a case's audit trail. Append-only; never
/// mutated after insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub ts: i64,
    pub path: String,
    pub method: String,
    pub user_agent: String,
    pub action: Action,
    pub score: f64,
    pub hits: u32,
    pub colo: String,
}

/// Row counts for health logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreCounts {
    pub cases: u64,
    pub events: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_key_format() {
        assert_eq!(case_key("example.com", "203.0.113.7", 64496), "example.com:203.0.113.7:64496");
    }
}
