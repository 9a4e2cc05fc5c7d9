//! Configuration module

use std::env;

/// Application configuration
///
/// Loaded once at startup and passed by reference into constructors; no
/// component reads the environment after this point.
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite database path for the case/event store
    pub database_path: String,

    /// Serving capacity used as the attack-force denominator (requests/sec)
    pub system_capacity_rps: f64,

    /// Trailing event window for metric recomputes (milliseconds)
    pub aggregation_window_ms: i64,

    /// Idle expiration for per-key admission actor state (milliseconds)
    pub actor_idle_expiration_ms: u64,

    /// How often the idle-actor sweeper runs (milliseconds)
    pub actor_sweep_interval_ms: u64,

    /// Total duration of a tarpit response (milliseconds)
    pub tarpit_duration_ms: u64,

    /// Pause between tarpit chunks (milliseconds)
    pub tarpit_interval_ms: u64,

    /// Bounded capacity of the verdict event channel
    pub ingest_channel_capacity: usize,

    /// Maximum events drained from the channel per batch
    pub ingest_batch_size: usize,

    /// Attempts per event before it is dead-lettered
    pub ingest_retry_attempts: u32,

    /// Dead-letter queue capacity (oldest entries dropped beyond this)
    pub dead_letter_capacity: usize,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            database_path: env::var("EDGEWARDEN_DB")
                .unwrap_or_else(|_| "edgewarden.db".to_string()),

            system_capacity_rps: parse_var("SYSTEM_CAPACITY_RPS", 500.0),
            aggregation_window_ms: parse_var("AGGREGATION_WINDOW_MS", 60_000),
            actor_idle_expiration_ms: parse_var("ACTOR_IDLE_EXPIRATION_MS", 300_000),
            actor_sweep_interval_ms: parse_var("ACTOR_SWEEP_INTERVAL_MS", 60_000),
            tarpit_duration_ms: parse_var("TARPIT_DURATION_MS", 15_000),
            tarpit_interval_ms: parse_var("TARPIT_INTERVAL_MS", 1_100),
            ingest_channel_capacity: parse_var("INGEST_CHANNEL_CAPACITY", 4_096),
            ingest_batch_size: parse_var("INGEST_BATCH_SIZE", 64),
            ingest_retry_attempts: parse_var("INGEST_RETRY_ATTEMPTS", 3),
            dead_letter_capacity: parse_var("DEAD_LETTER_CAPACITY", 1_024),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_var_falls_back_to_default() {
        assert_eq!(parse_var("EDGEWARDEN_TEST_UNSET_VAR", 500.0), 500.0);
        assert_eq!(parse_var("EDGEWARDEN_TEST_UNSET_VAR", 42u32), 42);
    }

    #[test]
    fn test_parse_var_reads_environment() {
        env::set_var("EDGEWARDEN_TEST_CAPACITY", "750");
        assert_eq!(parse_var("EDGEWARDEN_TEST_CAPACITY", 500.0), 750.0);
        env::remove_var("EDGEWARDEN_TEST_CAPACITY");
    }

    #[test]
    fn test_parse_var_ignores_garbage() {
        env::set_var("EDGEWARDEN_TEST_GARBAGE", "not-a-number");
        assert_eq!(parse_var("EDGEWARDEN_TEST_GARBAGE", 64usize), 64);
        env::remove_var("EDGEWARDEN_TEST_GARBAGE");
    }
}
