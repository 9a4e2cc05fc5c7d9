//! Windowed threat metrics
//!
//! Pure computation over a case's trailing event window. Always recomputed
//! from the persisted log so late or out-of-order events are picked up on
//! the next pass; nothing here keeps a running total.

use serde::Serialize;

use crate::logic::admission::Action;
use crate::logic::case::EventRecord;

/// Assumed mean request size for bandwidth estimation (bytes).
pub const AVG_REQUEST_BYTES: f64 = 2048.0;

const BITS_PER_BYTE: f64 = 8.0;
const BYTES_PER_MBIT: f64 = 1_048_576.0;

// Defense weight per mitigation action: a block fully occupies the
// defense, a challenge only partially.
const CHALLENGE_WEIGHT: f64 = 0.6;
const TARPIT_WEIGHT: f64 = 0.9;
const BLOCK_WEIGHT: f64 = 1.0;

// Materialization trigger levels.
const EVIDENCE_TRIGGER: i64 = 50;
const ATTACK_FORCE_TRIGGER: f64 = 1.0;

/// Derived metrics for one case over one window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseMetrics {
    /// Events in the window (`n`)
    pub window_events: u32,
    /// Mean event score over the window (0 when empty)
    pub avg_score: f64,
    pub allowed: u32,
    pub challenged: u32,
    pub tarpitted: u32,
    pub blocked: u32,
    /// Observed request rate: `n / window_secs`
    pub attack_rps: f64,
    /// `attack_rps * 2048 bytes * 8 / 1 Mibit`
    pub est_bandwidth_mbps: f64,
    /// Configured serving capacity used as the AF denominator
    pub system_capacity_rps: f64,
    /// Attack Force: `attack_rps / capacity` (0 when capacity is 0)
    pub af: f64,
    /// Defense Force: severity-weighted mitigations per second
    pub df: f64,
    /// Balance of Force: `df / af` (1 when af is 0)
    pub bof: f64,
    /// Evidence factor: `round(n + avg_score * 3)`
    pub evidence_count: i64,
    /// Leniency bias in [0, 1]; 0.5 exactly at avg_score 6
    pub mercy: f64,
    /// Escalation bias in [0, 1]
    pub justice: f64,
}

impl CaseMetrics {
    /// Materialization trigger: enough evidence, an attack at or beyond
    /// capacity, or a defense that is losing ground.
    pub fn should_materialize(&self) -> bool {
        self.evidence_count >= EVIDENCE_TRIGGER
            || self.af >= ATTACK_FORCE_TRIGGER
            || self.bof < 1.0
    }
}

/// Compute metrics for the events of one case window.
///
/// `window_ms` is the window the events were selected over; the rate
/// denominators derive from it. Division guards are mandatory: `af = 0`
/// when capacity is 0 and `bof = 1` when `af = 0`, never a NaN.
pub fn compute_window_metrics(
    events: &[EventRecord],
    capacity_rps: f64,
    window_ms: i64,
) -> CaseMetrics {
    let n = events.len() as u32;
    let window_secs = (window_ms as f64 / 1000.0).max(f64::MIN_POSITIVE);

    let avg_score = if n == 0 {
        0.0
    } else {
        events.iter().map(|e| e.score).sum::<f64>() / n as f64
    };

    let mut allowed = 0u32;
    let mut challenged = 0u32;
    let mut tarpitted = 0u32;
    let mut blocked = 0u32;
    for event in events {
        match event.action {
            Action::Allow => allowed += 1,
            Action::Challenge => challenged += 1,
            Action::Tarpit => tarpitted += 1,
            Action::Block => blocked += 1,
        }
    }

    let attack_rps = n as f64 / window_secs;
    let est_bandwidth_mbps = attack_rps * AVG_REQUEST_BYTES * BITS_PER_BYTE / BYTES_PER_MBIT;

    let af = if capacity_rps > 0.0 {
        attack_rps / capacity_rps
    } else {
        0.0
    };

    let weighted = challenged as f64 * CHALLENGE_WEIGHT
        + tarpitted as f64 * TARPIT_WEIGHT
        + blocked as f64 * BLOCK_WEIGHT;
    let df = weighted / window_secs;

    let bof = if af > 0.0 { df / af } else { 1.0 };

    let evidence_count = (n as f64 + avg_score * 3.0).round() as i64;

    let mercy = 1.0 / (1.0 + (avg_score - 6.0).exp());

    let non_allow_fraction = if n > 0 {
        (challenged + tarpitted + blocked) as f64 / n as f64
    } else {
        0.0
    };
    let justice = (non_allow_fraction + avg_score / 12.0).clamp(0.0, 1.0);

    CaseMetrics {
        window_events: n,
        avg_score,
        allowed,
        challenged,
        tarpitted,
        blocked,
        attack_rps,
        est_bandwidth_mbps,
        system_capacity_rps: capacity_rps,
        af,
        df,
        bof,
        evidence_count,
        mercy,
        justice,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW_MS: i64 = 60_000;

    fn event(ts: i64, action: Action, score: f64) -> EventRecord {
        EventRecord {
            ts,
            path: "/".into(),
            method: "GET".into(),
            user_agent: "curl/8.0".into(),
            action,
            score,
            hits: 1,
            colo: "fra01".into(),
        }
    }

    #[test]
    fn test_empty_window_is_all_guards() {
        let m = compute_window_metrics(&[], 500.0, WINDOW_MS);
        assert_eq!(m.window_events, 0);
        assert_eq!(m.avg_score, 0.0);
        assert_eq!(m.attack_rps, 0.0);
        assert_eq!(m.af, 0.0);
        assert_eq!(m.df, 0.0);
        assert_eq!(m.bof, 1.0);
        assert_eq!(m.evidence_count, 0);
        assert_eq!(m.justice, 0.0);
        assert!(!m.should_materialize());
    }

    #[test]
    fn test_sixty_quiet_allows() {
        // 60 events evenly spaced, all allowed, score 0.
        let events: Vec<_> = (0..60).map(|i| event(i * 1_000, Action::Allow, 0.0)).collect();
        let m = compute_window_metrics(&events, 500.0, WINDOW_MS);

        assert_eq!(m.attack_rps, 1.0);
        assert_eq!(m.af, 1.0 / 500.0);
        assert_eq!(m.df, 0.0);
        // AF is tiny but nonzero, so the guard branch is not taken.
        assert_eq!(m.bof, 0.0);
        assert_eq!(m.evidence_count, 60);
        assert_eq!(m.mercy, 1.0 / (1.0 + (-6.0f64).exp()));
        // Triggers on evidence alone.
        assert!(m.should_materialize());
    }

    #[test]
    fn test_fifty_events_thirty_blocked() {
        // n=50, avg_score=10, 30 blocked / 20 allowed.
        let mut events = Vec::new();
        for i in 0..30 {
            events.push(event(i * 1_000, Action::Block, 10.0));
        }
        for i in 30..50 {
            events.push(event(i * 1_000, Action::Allow, 10.0));
        }
        let m = compute_window_metrics(&events, 500.0, WINDOW_MS);

        assert_eq!(m.avg_score, 10.0);
        assert_eq!(m.df, 30.0 * 1.0 / 60.0);
        let attack_rps = 50.0 / 60.0;
        assert!((m.attack_rps - attack_rps).abs() < 1e-12);
        let af = attack_rps / 500.0;
        assert!((m.af - af).abs() < 1e-12);
        assert!((m.bof - 0.5 / af).abs() < 1e-9);
        assert!(m.bof > 299.0 && m.bof < 301.0);
        assert_eq!(m.evidence_count, 80);
        assert!(m.should_materialize());
    }

    #[test]
    fn test_bandwidth_estimate_folds_constants() {
        let events: Vec<_> = (0..60).map(|i| event(i * 1_000, Action::Allow, 0.0)).collect();
        let m = compute_window_metrics(&events, 500.0, WINDOW_MS);
        // 1 rps * 2 KB * 8 / 1024 = 0.015625 Mbit/s
        assert!((m.est_bandwidth_mbps - 0.015_625).abs() < 1e-12);
    }

    #[test]
    fn test_zero_capacity_forces_af_zero_and_bof_one() {
        let events: Vec<_> = (0..10).map(|i| event(i, Action::Block, 3.0)).collect();
        let m = compute_window_metrics(&events, 0.0, WINDOW_MS);
        assert_eq!(m.af, 0.0);
        assert_eq!(m.bof, 1.0);
        assert!(m.af.is_finite() && m.bof.is_finite());
    }

    #[test]
    fn test_mercy_is_half_at_score_six_and_decreasing() {
        let at = |score: f64| {
            let events = vec![event(0, Action::Allow, score)];
            compute_window_metrics(&events, 500.0, WINDOW_MS).mercy
        };
        assert!((at(6.0) - 0.5).abs() < 1e-12);
        let mut last = at(0.0);
        for score in [2.0, 4.0, 6.0, 8.0, 10.0, 14.0] {
            let mercy = at(score);
            assert!(mercy < last, "mercy not decreasing at score {score}");
            assert!((0.0..=1.0).contains(&mercy));
            last = mercy;
        }
    }

    #[test]
    fn test_justice_is_clamped() {
        // Everything mitigated at a high score: raw value well above 1.
        let events: Vec<_> = (0..20).map(|i| event(i, Action::Block, 24.0)).collect();
        let m = compute_window_metrics(&events, 500.0, WINDOW_MS);
        assert_eq!(m.justice, 1.0);

        // All allowed, score 0: floor stays at 0.
        let events: Vec<_> = (0..20).map(|i| event(i, Action::Allow, 0.0)).collect();
        let m = compute_window_metrics(&events, 500.0, WINDOW_MS);
        assert_eq!(m.justice, 0.0);
    }

    #[test]
    fn test_defense_weights() {
        let events = vec![
            event(0, Action::Challenge, 0.0),
            event(1, Action::Tarpit, 0.0),
            event(2, Action::Block, 0.0),
        ];
        let m = compute_window_metrics(&events, 500.0, WINDOW_MS);
        assert!((m.df - (0.6 + 0.9 + 1.0) / 60.0).abs() < 1e-12);
        assert_eq!(m.challenged, 1);
        assert_eq!(m.tarpitted, 1);
        assert_eq!(m.blocked, 1);
    }

    #[test]
    fn test_recompute_is_deterministic() {
        let events: Vec<_> = (0..37)
            .map(|i| {
                let action = match i % 4 {
                    0 => Action::Allow,
                    1 => Action::Challenge,
                    2 => Action::Tarpit,
                    _ => Action::Block,
                };
                event(i * 123, action, (i % 7) as f64 * 1.37)
            })
            .collect();
        let a = compute_window_metrics(&events, 500.0, WINDOW_MS);
        let b = compute_window_metrics(&events, 500.0, WINDOW_MS);
        // Bit-identical, not approximately equal.
        assert_eq!(a, b);
    }

    #[test]
    fn test_evidence_rounds_half_up() {
        // n=1, avg_score=0.5 -> 1 + 1.5 = 2.5 rounds away from zero.
        let events = vec![event(0, Action::Allow, 0.5)];
        let m = compute_window_metrics(&events, 500.0, WINDOW_MS);
        assert_eq!(m.evidence_count, 3);
    }
}
