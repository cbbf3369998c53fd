use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LicenseStatus {
    Trial,
    Active,
    PastDue,
    Cancelled,
    Expired,
    Retired,
    Disputed,
    Revoked,
}

/// A license record. An organization owner's license is shared: every active
/// member's devices draw from the same `max_devices` allowance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct License {
    pub license_id: String,
    pub owner_user_id: String,
    pub license_key: String,
    pub status: LicenseStatus,
    /// None means the device limit is unknown/unlimited
    #[serde(default)]
    pub max_devices: Option<i64>,
    /// Lifetime activation counter, distinct from the in-window count
    #[serde(default)]
    pub activated_devices: i64,
    pub created_at: i64,
}
