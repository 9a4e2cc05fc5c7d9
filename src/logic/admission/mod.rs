//! Admission Module
//!
//! Per-identity-key decision actors: each `(ip, asn)` pair owns a small
//! serialized state machine (windowed hit counter + decayed threat score)
//! that turns request features into an allow/challenge/tarpit/block verdict.
//!
//! ## Structure
//! - `types`: Core types (IdentityKey, RequestFeatures, Action, Verdict)
//! - `rules`: Heuristic deltas and threshold policy
//! - `gate`: The actor registry and evaluation state machine
//! - `tarpit`: Cancellable slow-drip responder

pub mod gate;
pub mod rules;
pub mod tarpit;
pub mod types;

// Re-export main types for convenience
pub use gate::{spawn_idle_sweeper, AdmissionGate};
pub use tarpit::{TarpitConfig, TarpitHandle};
pub use types::{Action, IdentityKey, RequestFeatures, Verdict};
