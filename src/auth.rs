//! Bearer-token identity verification.
//!
//! Portal tokens are HS256 JWTs carrying the subject id and email. The
//! verified subject is the only identity ever bound to a device record;
//! client-supplied user ids are ignored.

use axum::http::HeaderMap;
use jwt_simple::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::util::extract_bearer_token;

/// Verified caller identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub subject_id: String,
    pub email: String,
}

/// Outcome of inspecting the Authorization header.
///
/// `Missing` and `Invalid` are deliberately distinct: a trial heartbeat may
/// proceed anonymously with no header at all, but a present-and-bad
/// credential is always a hard 401. Collapsing the two would silently
/// downgrade bad credentials to anonymous callers.
#[derive(Debug, Clone)]
pub enum BearerAuth {
    /// No Authorization header on the request
    Missing,
    /// Header present but wrong scheme, bad signature, or expired
    Invalid,
    Verified(Identity),
}

impl BearerAuth {
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            BearerAuth::Verified(identity) => Some(identity),
            _ => None,
        }
    }

    /// For routes where authentication is mandatory: anything short of a
    /// verified identity is a 401, with the two failure modes kept apart in
    /// the message.
    pub fn require(self) -> Result<Identity> {
        match self {
            BearerAuth::Verified(identity) => Ok(identity),
            BearerAuth::Missing => Err(AppError::Unauthorized(
                "authentication required".to_string(),
            )),
            BearerAuth::Invalid => Err(AppError::Unauthorized(
                "invalid or expired token".to_string(),
            )),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct PortalClaims {
    email: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct TrialClaims {
    fingerprint: String,
}

/// Inspect the Authorization header and verify the portal token if present.
/// Never errors; all failure modes map to `Missing` or `Invalid`.
pub fn verify_bearer(headers: &HeaderMap, key: &HS256Key) -> BearerAuth {
    if headers.get("Authorization").is_none() {
        return BearerAuth::Missing;
    }
    let Some(token) = extract_bearer_token(headers) else {
        return BearerAuth::Invalid;
    };
    match verify_token(key, token) {
        Some(identity) => BearerAuth::Verified(identity),
        None => BearerAuth::Invalid,
    }
}

/// Verify a portal token string. Returns None on any signature, expiry, or
/// claim-shape failure.
pub fn verify_token(key: &HS256Key, token: &str) -> Option<Identity> {
    let claims = key.verify_token::<PortalClaims>(token, None).ok()?;
    let subject_id = claims.subject?;
    Some(Identity {
        subject_id,
        email: claims.custom.email,
    })
}

/// Issue a portal token for a subject. Used by the CLI and tests; in
/// production the identity provider issues these.
pub fn issue_portal_token(
    key: &HS256Key,
    subject_id: &str,
    email: &str,
    valid_hours: u64,
) -> Result<String> {
    let claims = Claims::with_custom_claims(
        PortalClaims {
            email: email.to_string(),
        },
        Duration::from_hours(valid_hours),
    )
    .with_subject(subject_id);
    key.authenticate(claims)
        .map_err(|e| AppError::Internal(format!("token signing failed: {e}")))
}

/// Sign the token embedded in a trial record, bound to the fingerprint.
pub fn sign_trial_token(key: &HS256Key, fingerprint: &str, valid_days: u64) -> Result<String> {
    let claims = Claims::with_custom_claims(
        TrialClaims {
            fingerprint: fingerprint.to_string(),
        },
        Duration::from_days(valid_days),
    )
    .with_subject(fingerprint);
    key.authenticate(claims)
        .map_err(|e| AppError::Internal(format!("token signing failed: {e}")))
}
