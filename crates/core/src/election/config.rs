//! Election loop configuration.

use serde::{Deserialize, Serialize};

/// Timing and retry policy for the election loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElectionConfig {
    /// Pause between poll cycles (milliseconds).
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Pause before retrying a bootstrap that hit a network error, and
    /// before the cycle that follows a session expiry (milliseconds).
    #[serde(default = "default_reauth_backoff")]
    pub reauth_backoff_ms: u64,

    /// Challenge answers submitted per claim before giving up on it.
    #[serde(default = "default_max_challenge_attempts")]
    pub max_challenge_attempts: u32,

    /// Consecutive cycles a target may be absent from the listing before it
    /// is dropped. 1 drops it on the first miss.
    #[serde(default = "default_max_missing_cycles")]
    pub max_missing_cycles: u32,
}

fn default_poll_interval() -> u64 {
    10_000 // 10 seconds
}

fn default_reauth_backoff() -> u64 {
    3_000 // 3 seconds
}

fn default_max_challenge_attempts() -> u32 {
    20
}

fn default_max_missing_cycles() -> u32 {
    1
}

impl Default for ElectionConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
            reauth_backoff_ms: default_reauth_backoff(),
            max_challenge_attempts: default_max_challenge_attempts(),
            max_missing_cycles: default_max_missing_cycles(),
        }
    }
}
