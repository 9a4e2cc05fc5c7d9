//! Heuristic deltas and verdict thresholds
//!
//! All policy numbers for the admission state machine live here. Deltas are
//! additive and independent; every matching heuristic contributes on the
//! same request. Thresholds are ordered most severe first and checked
//! against both the windowed hit counter and the decayed score.

use super::types::{Action, RequestFeatures};

/// Tumbling window length for the per-key hit counter (milliseconds).
pub const WINDOW_MS: i64 = 1_000;

/// Score drained on every evaluation; keeps honest bursts from sticking.
pub const SCORE_DECAY: f64 = 1.0;

// Heuristic trip points (hits within the current window).
pub const API_BURST_HITS: u32 = 15;
pub const GENERAL_BURST_HITS: u32 = 35;
pub const MUTATING_BURST_HITS: u32 = 5;

// Verdict thresholds, most severe first.
pub const BLOCK_HITS: u32 = 120;
pub const BLOCK_SCORE: f64 = 12.0;
pub const TARPIT_HITS: u32 = 70;
pub const TARPIT_SCORE: f64 = 8.0;
pub const CHALLENGE_HITS: u32 = 30;
pub const CHALLENGE_SCORE: f64 = 5.0;

/// Score added by this request before decay is applied.
pub fn heuristic_delta(features: &RequestFeatures, hits: u32, last_user_agent: &str) -> f64 {
    let mut delta = 0.0;

    let api_path = features.path.starts_with("/api/");
    if api_path && hits > API_BURST_HITS {
        delta += 2.0;
    }
    if !api_path && hits > GENERAL_BURST_HITS {
        delta += 1.0;
    }
    if features.has_blank_user_agent() {
        delta += 1.0;
    }
    if features.is_mutating_method() && hits > MUTATING_BURST_HITS {
        delta += 2.0;
    }
    // Flapping identity: same key, different user agent than last time.
    if !last_user_agent.is_empty() && features.user_agent != last_user_agent {
        delta += 1.0;
    }

    delta
}

/// Ordered threshold policy. Block dominates tarpit dominates challenge.
pub fn decide(hits: u32, score: f64) -> Action {
    if hits > BLOCK_HITS || score > BLOCK_SCORE {
        Action::Block
    } else if hits > TARPIT_HITS || score > TARPIT_SCORE {
        Action::Tarpit
    } else if hits > CHALLENGE_HITS || score > CHALLENGE_SCORE {
        Action::Challenge
    } else {
        Action::Allow
    }
}
