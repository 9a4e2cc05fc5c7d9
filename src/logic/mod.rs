//! Logic Module - Admission, Ingestion, Storage, Forensics
//!
//! ## Architecture
//! - `admission/` - Per-key admission decision actors and the tarpit responder
//! - `ingest/` - At-least-once verdict event pipeline with dead-lettering
//! - `case/` - Durable case/event store (SQLite)
//! - `forensics/` - Windowed threat metrics and report materialization

pub mod admission;
pub mod case;
pub mod forensics;
pub mod ingest;

/// Get current time in milliseconds
pub fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}
