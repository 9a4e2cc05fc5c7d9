//! Forensics Module
//!
//! Turns a case's trailing event window into attack/defense force metrics
//! and, when the evidence is strong enough, materializes report artifacts
//! onto the case record.
//!
//! ## Structure
//! - `metrics`: Pure windowed metric formulas and the trigger predicate
//! - `report`: Report generator seam and the plain-text implementation
//! - `engine`: Per-case serialized recompute and snapshot writes

pub mod engine;
pub mod metrics;
pub mod report;

// Re-export main types for convenience
pub use engine::AggregationEngine;
pub use metrics::{compute_window_metrics, CaseMetrics};
pub use report::{ReportArtifacts, ReportGenerator, TextReportGenerator};
