use seatpulse::rate_limit::{RateLimitConfig, RateLimiter};

const CFG: RateLimitConfig = RateLimitConfig {
    window_ms: 60_000,
    max_requests: 3,
};

#[tokio::test]
async fn excess_requests_are_rejected_within_the_window() {
    let limiter = RateLimiter::new();
    let now = 1_000_000;

    for i in 0..3 {
        let d = limiter.check_at("hb:key1", CFG, now + i).await;
        assert!(d.allowed, "request {i} should pass");
        assert_eq!(d.remaining, 2 - i as u32);
    }
    let denied = limiter.check_at("hb:key1", CFG, now + 10).await;
    assert!(!denied.allowed);
    assert_eq!(denied.remaining, 0);
    assert_eq!(denied.reset_at_ms, now + 60_000);
}

#[tokio::test]
async fn independent_keys_do_not_interfere() {
    let limiter = RateLimiter::new();
    let now = 1_000_000;

    for _ in 0..4 {
        limiter.check_at("hb:key1", CFG, now).await;
    }
    let other = limiter.check_at("hb:key2", CFG, now).await;
    assert!(other.allowed, "a different key in the same window must pass");
    assert_eq!(other.remaining, 2);
}

#[tokio::test]
async fn window_resets_after_expiry() {
    let limiter = RateLimiter::new();
    let now = 1_000_000;

    for _ in 0..4 {
        limiter.check_at("hb:key1", CFG, now).await;
    }
    assert!(!limiter.check_at("hb:key1", CFG, now + 59_999).await.allowed);
    // The boundary millisecond still counts against the old window.
    assert!(!limiter.check_at("hb:key1", CFG, now + 60_000).await.allowed);

    // First call past the window lazily starts a fresh one; nothing carries
    let fresh = limiter.check_at("hb:key1", CFG, now + 60_001).await;
    assert!(fresh.allowed);
    assert_eq!(fresh.remaining, 2);
    assert_eq!(fresh.reset_at_ms, now + 120_001);
}

#[tokio::test]
async fn clear_resets_all_state() {
    let limiter = RateLimiter::new();
    let now = 1_000_000;

    for _ in 0..4 {
        limiter.check_at("hb:key1", CFG, now).await;
    }
    limiter.clear().await;
    assert!(limiter.check_at("hb:key1", CFG, now).await.allowed);
}

#[tokio::test]
async fn retry_after_is_at_least_one_second() {
    let limiter = RateLimiter::new();
    let now = 1_000_000;
    for _ in 0..3 {
        limiter.check_at("k", CFG, now).await;
    }
    let denied = limiter.check_at("k", CFG, now + 59_900).await;
    assert!(!denied.allowed);
    assert_eq!(denied.retry_after_secs(now + 59_900), 1);
    assert_eq!(denied.retry_after_secs(now), 60);
}

#[tokio::test]
async fn cleanup_drops_stale_windows_only() {
    let limiter = RateLimiter::new();
    let now = seatpulse::rate_limit::now_ms();

    limiter.check_at("stale", CFG, now - 10_000).await;
    limiter.check_at("fresh", CFG, now).await;
    limiter.cleanup(5_000).await;

    // The stale window was dropped, so its key starts a fresh count
    assert_eq!(limiter.check_at("stale", CFG, now).await.remaining, 2);
    // The fresh window survived and keeps counting
    assert_eq!(limiter.check_at("fresh", CFG, now).await.remaining, 1);
}
