//! Report artifacts
//!
//! Pure formatting over already-computed metrics. The generator sits
//! behind a trait so deployments can swap in their own templating without
//! touching the aggregation engine.

use chrono::{DateTime, Utc};

use super::metrics::CaseMetrics;
use crate::logic::case::Case;

/// Text artifacts attached to a case on materialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportArtifacts {
    pub abuse_report: String,
    pub section504_draft: String,
}

/// Renders report artifacts from a case and its current metrics.
pub trait ReportGenerator: Send + Sync {
    fn generate(&self, case: &Case, metrics: &CaseMetrics) -> ReportArtifacts;
}

/// Built-in plain-text generator.
///
/// Wording leans on the mercy/justice scores: high mercy reads as
/// possibly-misconfigured automation, high justice as sustained and
/// deliberate abuse.
#[derive(Debug, Default)]
pub struct TextReportGenerator;

impl ReportGenerator for TextReportGenerator {
    fn generate(&self, case: &Case, metrics: &CaseMetrics) -> ReportArtifacts {
        let characterization = characterize(metrics);

        let abuse_report = format!(
            "ABUSE REPORT - zone {zone}\n\
             Source: {ip} (AS{asn}{country})\n\
             Observed: {first_seen} through {last_seen}\n\
             \n\
             Traffic characterization: {characterization}.\n\
             Observed request rate: {rps:.3} req/s (estimated {mbps:.3} Mbit/s \
             against a serving capacity of {capacity:.0} req/s).\n\
             Attack force {af:.4}, defense force {df:.4}, balance of force {bof:.4}.\n\
             Events in the assessment window: {n} ({challenged} challenged, \
             {tarpitted} tarpitted, {blocked} blocked).\n\
             Evidence factor: {evidence}.\n\
             \n\
             We request that the operator of AS{asn} investigate the source \
             above and curtail the reported traffic.\n",
            zone = case.zone,
            ip = case.ip,
            asn = case.asn,
            country = country_suffix(&case.country),
            first_seen = format_ts(case.first_seen),
            last_seen = format_ts(case.last_seen),
            characterization = characterization,
            rps = metrics.attack_rps,
            mbps = metrics.est_bandwidth_mbps,
            capacity = metrics.system_capacity_rps,
            af = metrics.af,
            df = metrics.df,
            bof = metrics.bof,
            n = metrics.window_events,
            challenged = metrics.challenged,
            tarpitted = metrics.tarpitted,
            blocked = metrics.blocked,
            evidence = metrics.evidence_count,
        );

        let section504_draft = format!(
            "SECTION 504 NOTICE (DRAFT) - case {key}\n\
             \n\
             This draft documents ongoing denial-of-service activity against \
             {zone} originating from {ip} (AS{asn}).\n\
             The activity is assessed as {characterization}. Across the \
             assessment window the source issued {n} requests at {rps:.3} req/s; \
             {mitigated} were actively mitigated.\n\
             Evidence factor at time of writing: {evidence}. \
             Severity indices: mercy {mercy:.3}, justice {justice:.3}.\n\
             \n\
             This document was produced automatically from the case audit \
             trail and is pending operator review.\n",
            key = case.key,
            zone = case.zone,
            ip = case.ip,
            asn = case.asn,
            characterization = characterization,
            n = metrics.window_events,
            rps = metrics.attack_rps,
            mitigated = metrics.challenged + metrics.tarpitted + metrics.blocked,
            evidence = metrics.evidence_count,
            mercy = metrics.mercy,
            justice = metrics.justice,
        );

        ReportArtifacts {
            abuse_report,
            section504_draft,
        }
    }
}

fn characterize(metrics: &CaseMetrics) -> &'static str {
    if metrics.justice >= 0.7 {
        "sustained and deliberate abusive traffic"
    } else if metrics.mercy >= 0.5 {
        "high-volume traffic, possibly misconfigured automation"
    } else {
        "abusive traffic of moderate severity"
    }
}

fn country_suffix(country: &str) -> String {
    if country.is_empty() {
        String::new()
    } else {
        format!(", {country}")
    }
}

fn format_ts(ts_ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ts_ms)
        .unwrap_or_else(Utc::now)
        .format("%Y-%m-%d %H:%M:%S UTC")
        .to_string()
}
