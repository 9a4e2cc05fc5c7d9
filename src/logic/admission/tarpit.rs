//! Tarpit responder
//!
//! A deliberately slow response: small chunks on a fixed interval for a
//! bounded duration, holding an attacker's connection open at near-zero
//! cost to us. The producer is cooperative; it selects on downstream
//! cancellation (the chunk receiver going away) against the next tick and
//! terminates promptly instead of running out the clock.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::debug;

use crate::config::Config;

/// Bytes sent per tick.
const CHUNK: &[u8] = b".\r\n";

/// Buffered chunks between producer and the connection writer.
const CHANNEL_DEPTH: usize = 4;

#[derive(Debug, Clone, Copy)]
pub struct TarpitConfig {
    pub duration: Duration,
    pub interval: Duration,
}

impl TarpitConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            duration: Duration::from_millis(config.tarpit_duration_ms),
            interval: Duration::from_millis(config.tarpit_interval_ms),
        }
    }
}

impl Default for TarpitConfig {
    fn default() -> Self {
        Self {
            duration: Duration::from_millis(15_000),
            interval: Duration::from_millis(1_100),
        }
    }
}

/// A running tarpit: the transport layer drains `chunks` into the
/// connection and simply drops it on client disconnect, which cancels the
/// producer task.
pub struct TarpitHandle {
    pub chunks: mpsc::Receiver<Vec<u8>>,
    task: tokio::task::JoinHandle<usize>,
}

impl TarpitHandle {
    /// Wait for the producer to finish; returns chunks delivered.
    pub async fn join(self) -> usize {
        self.task.await.unwrap_or(0)
    }
}

/// Start a tarpit task tied to the returned handle's lifetime.
pub fn start(config: TarpitConfig) -> TarpitHandle {
    let (tx, rx) = mpsc::channel(CHANNEL_DEPTH);
    let task = tokio::spawn(drip(tx, config));
    TarpitHandle { chunks: rx, task }
}

/// Emit chunks into `tx` until the duration elapses or the receiver goes
/// away. Returns the number of chunks delivered.
pub async fn drip(tx: mpsc::Sender<Vec<u8>>, config: TarpitConfig) -> usize {
    let deadline = Instant::now() + config.duration;
    let mut ticker = time::interval(config.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; the pacing starts after it.
    ticker.tick().await;

    let mut sent = 0usize;
    loop {
        tokio::select! {
            _ = tx.closed() => {
                debug!(sent, "tarpit cancelled by peer");
                break;
            }
            tick = ticker.tick() => {
                if tick >= deadline {
                    debug!(sent, "tarpit ran to completion");
                    break;
                }
                if tx.send(CHUNK.to_vec()).await.is_err() {
                    break;
                }
                sent += 1;
            }
        }
    }
    sent
}
