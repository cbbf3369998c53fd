use serde::{Deserialize, Serialize};

/// A device under a license scope.
///
/// The fingerprint is the deduplication key: re-activating the same
/// fingerprint updates this record in place. Machine ids regenerate across
/// reinstalls and are informational only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    pub license_id: String,
    pub fingerprint: String,
    #[serde(default)]
    pub machine_id: Option<String>,
    /// Verified subject id, bound once the device heartbeats authenticated
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub last_seen_at: Option<i64>,
    pub created_at: i64,
}

impl Device {
    /// The timestamp that counts for the sliding window: last heartbeat, or
    /// creation time for a device never seen since activation.
    pub fn seen_at(&self) -> i64 {
        self.last_seen_at.unwrap_or(self.created_at)
    }
}
