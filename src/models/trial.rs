use serde::{Deserialize, Serialize};

/// Per-fingerprint trial grant. Created at most once per fingerprint via a
/// conditional insert; duplicate creation is rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trial {
    pub fingerprint: String,
    pub issued_at: i64,
    pub expires_at: i64,
    /// Signed token returned to the client at trial start. Trial heartbeats
    /// do not require it; they update the separate last-seen record.
    pub signed_token: String,
}

/// Last-seen sub-record updated by unauthenticated trial heartbeats.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialSeen {
    pub fingerprint: String,
    pub last_seen_at: i64,
    #[serde(default)]
    pub heartbeat_count: i64,
}
