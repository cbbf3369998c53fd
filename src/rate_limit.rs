//! Fixed-window request limiter shielding the heartbeat and device routes.
//!
//! Counters live behind an explicit shared store so handlers get a full
//! decision (allowed/remaining/reset) rather than a bare middleware refusal,
//! and tests reset state with [`RateLimiter::clear`] instead of a process
//! restart. Windows start lazily on first sight of a key and never carry
//! counts over.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub window_ms: u64,
    pub max_requests: u32,
}

/// Heartbeats are high frequency, keyed per license key (or fingerprint for
/// trial callers).
pub const HEARTBEAT: RateLimitConfig = RateLimitConfig {
    window_ms: 60_000,
    max_requests: 120,
};

/// Trial creation: 5/hour per fingerprint.
pub const TRIAL_START: RateLimitConfig = RateLimitConfig {
    window_ms: 3_600_000,
    max_requests: 5,
};

/// Portal device listing: 30/minute per identity.
pub const PORTAL_DEVICES: RateLimitConfig = RateLimitConfig {
    window_ms: 60_000,
    max_requests: 30,
};

#[derive(Debug, Clone, Copy)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub remaining: u32,
    pub reset_at_ms: u64,
}

impl RateLimitDecision {
    /// Seconds until the window resets, floored at 1 for Retry-After.
    pub fn retry_after_secs(&self, now_ms: u64) -> u64 {
        (self.reset_at_ms.saturating_sub(now_ms) / 1000).max(1)
    }
}

struct Window {
    count: u32,
    started_ms: u64,
}

#[derive(Clone, Default)]
pub struct RateLimiter {
    inner: Arc<Mutex<HashMap<String, Window>>>,
}

/// Current wall-clock time in milliseconds since the epoch.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one request against `key`. Never errors; callers decide the
    /// response for a denied request.
    pub async fn check(&self, key: &str, config: RateLimitConfig) -> RateLimitDecision {
        self.check_at(key, config, now_ms()).await
    }

    /// Time-injectable variant so window expiry is testable without sleeping.
    pub async fn check_at(
        &self,
        key: &str,
        config: RateLimitConfig,
        now_ms: u64,
    ) -> RateLimitDecision {
        let mut map = self.inner.lock().await;
        let window = map.entry(key.to_owned()).or_insert(Window {
            count: 0,
            started_ms: now_ms,
        });

        // The boundary millisecond still belongs to the old window.
        if now_ms > window.started_ms + config.window_ms {
            window.count = 0;
            window.started_ms = now_ms;
        }

        window.count += 1;
        let allowed = window.count <= config.max_requests;
        RateLimitDecision {
            allowed,
            remaining: config.max_requests.saturating_sub(window.count),
            reset_at_ms: window.started_ms + config.window_ms,
        }
    }

    /// Drop all counters. Test hook.
    pub async fn clear(&self) {
        self.inner.lock().await.clear();
    }

    /// Drop windows whose start is older than `max_age_ms`; run periodically
    /// so abandoned keys don't accumulate.
    pub async fn cleanup(&self, max_age_ms: u64) {
        let cutoff = now_ms().saturating_sub(max_age_ms);
        let mut map = self.inner.lock().await;
        map.retain(|_, window| window.started_ms >= cutoff);
    }
}
