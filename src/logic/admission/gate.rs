//! Admission gate: the per-key actor registry and evaluation state machine
//!
//! One logical actor per identity key. Actor state is owned exclusively by
//! its mutex; evaluations for the same key serialize on that mutex while
//! different keys proceed fully in parallel. State is created lazily on
//! first evaluation and garbage-collected after the idle expiration.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tracing::debug;

use super::rules;
use super::types::{Action, IdentityKey, RequestFeatures, Verdict};
use crate::config::Config;

/// Per-key actor state. Never shared outside its mutex.
#[derive(Debug)]
struct ActorState {
    hits: u32,
    window_start: i64,
    score: f64,
    last_user_agent: String,
    last_seen: i64,
}

impl ActorState {
    fn fresh(now: i64) -> Self {
        Self {
            hits: 0,
            window_start: now,
            score: 0.0,
            last_user_agent: String::new(),
            last_seen: now,
        }
    }
}

/// Registry of admission actors keyed by `(ip, asn)`.
pub struct AdmissionGate {
    actors: RwLock<HashMap<IdentityKey, Arc<Mutex<ActorState>>>>,
    idle_expiration_ms: i64,
}

impl AdmissionGate {
    pub fn new(config: &Config) -> Self {
        Self {
            actors: RwLock::new(HashMap::new()),
            idle_expiration_ms: config.actor_idle_expiration_ms as i64,
        }
    }

    /// Evaluate one request against its key's actor.
    pub fn evaluate(&self, features: &RequestFeatures) -> Verdict {
        self.evaluate_at(features, crate::logic::now_ms())
    }

    /// Deterministic core of `evaluate`; `now` is injected so sequences of
    /// evaluations can be replayed in tests.
    pub fn evaluate_at(&self, features: &RequestFeatures, now: i64) -> Verdict {
        let cell = self.actor_for(features.identity_key(), now);
        let mut state = cell.lock();

        // State past its idle expiration restarts as if never seen.
        if now - state.last_seen > self.idle_expiration_ms {
            *state = ActorState::fresh(now);
        }

        // Tumbling window: a gap longer than the window resets the counter.
        if now - state.window_start > rules::WINDOW_MS {
            state.hits = 0;
            state.window_start = now;
        }
        state.hits += 1;

        let delta = rules::heuristic_delta(features, state.hits, &state.last_user_agent);
        state.last_user_agent = features.user_agent.clone();
        state.score = (state.score + delta - rules::SCORE_DECAY).max(0.0);
        state.last_seen = now;

        let action = if features.trusted {
            // Proof of a passed challenge outranks every threshold.
            Action::Allow
        } else {
            rules::decide(state.hits, state.score)
        };

        Verdict {
            action,
            score: state.score,
            hits: state.hits,
        }
    }

    fn actor_for(&self, key: IdentityKey, now: i64) -> Arc<Mutex<ActorState>> {
        if let Some(cell) = self.actors.read().get(&key) {
            return cell.clone();
        }
        let mut map = self.actors.write();
        map.entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(ActorState::fresh(now))))
            .clone()
    }

    /// Drop actors idle past the expiration. Returns how many were removed.
    pub fn sweep_idle(&self, now: i64) -> usize {
        let mut map = self.actors.write();
        let before = map.len();
        map.retain(|_, cell| match cell.try_lock() {
            Some(state) => now - state.last_seen <= self.idle_expiration_ms,
            // Locked means an evaluation is in flight; not idle.
            None => true,
        });
        before - map.len()
    }

    pub fn active_actors(&self) -> usize {
        self.actors.read().len()
    }
}

/// Periodically sweep idle actors so the registry stays memory-bounded.
pub fn spawn_idle_sweeper(
    gate: Arc<AdmissionGate>,
    sweep_interval_ms: u64,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_millis(sweep_interval_ms.max(1)));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let swept = gate.sweep_idle(crate::logic::now_ms());
            if swept > 0 {
                debug!(swept, remaining = gate.active_actors(), "swept idle admission actors");
            }
        }
    })
}
