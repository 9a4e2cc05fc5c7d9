//! Ingest Module
//!
//! At-least-once verdict event pipeline: the admission side emits
//! [`VerdictEvent`]s through an [`EventSink`]; the pipeline consumes them
//! in batches, persists each one, and triggers a metric recompute for the
//! owning case. Every message is acknowledged on its own: a failed
//! persist is retried and then dead-lettered, never silently dropped and
//! never allowed to take its batch peers down with it.
//!
//! ## Structure
//! - `event`: Verdict event wire schema and validation
//! - `dead_letter`: Bounded parking area for rejected/exhausted events
//! - `pipeline`: Batch consumer with per-message retry

pub mod dead_letter;
pub mod event;
pub mod pipeline;

// Re-export main types for convenience
pub use dead_letter::{DeadLetter, DeadLetterQueue};
pub use event::VerdictEvent;
pub use pipeline::{EventSink, IngestPipeline};
