//! Edgewarden - Edge Admission Control & Evidence Pipeline
//!
//! Core library for scoring untrusted requests at the edge and turning the
//! resulting verdict stream into durable per-attacker case records.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        EDGEWARDEN                            │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌────────────┐   ┌─────────────┐   ┌─────────────────────┐  │
//! │  │ Admission  │   │  Ingestion  │   │  Forensics Engine   │  │
//! │  │ Gate       │──▶│  Pipeline   │──▶│  (windowed metrics  │  │
//! │  │ (per-key   │   │  (at-least- │   │   + report          │  │
//! │  │  actors)   │   │   once)     │   │   materialization)  │  │
//! │  └────────────┘   └──────┬──────┘   └──────────┬──────────┘  │
//! │                          ▼                     ▼             │
//! │                   ┌─────────────────────────────────┐        │
//! │                   │  Case/Event Store (SQLite)      │        │
//! │                   └─────────────────────────────────┘        │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The HTTP/transport layer that extracts request features and renders
//! challenge pages is an external collaborator; it calls
//! [`logic::admission::AdmissionGate::evaluate`] and forwards the returned
//! verdict to the pipeline via [`logic::ingest::EventSink`].

pub mod config;
pub mod error;
pub mod logic;

pub use config::Config;
pub use error::{AppError, AppResult};
