//! Case Module
//!
//! Durable storage for per-attacker cases and their append-only event
//! audit trail. Pure persistence and queries; no policy lives here.
//!
//! ## Structure
//! - `types`: Case and event row types
//! - `storage`: SQLite-backed store with idempotent schema bootstrap

pub mod storage;
pub mod types;

// Re-export main types for convenience
pub use storage::CaseStore;
pub use types::{case_key, Case, EventRecord, StoreCounts, STATUS_OPEN};
