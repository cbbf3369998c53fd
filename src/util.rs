//! Shared helpers for request handling.

use axum::http::HeaderMap;

/// Extract a Bearer token from the Authorization header.
///
/// The `Bearer ` scheme prefix is matched case-sensitively. Returns the token
/// without the prefix, or None if the header is missing, uses another scheme,
/// or is empty after the prefix.
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
}

/// Extract the client IP for log lines: `x-forwarded-for` first (proxied
/// requests), then `x-real-ip`.
pub fn extract_client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .or_else(|| headers.get("x-real-ip"))
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
