mod customer;
mod device;
mod license;
mod organization;
mod trial;

pub use customer::*;
pub use device::*;
pub use license::*;
pub use organization::*;
pub use trial::*;

use serde::{Deserialize, Serialize};

/// Update-notification fields carried on every heartbeat-family response.
/// Deliberately has no `min_version`; the field is retired from the wire
/// format and must never reappear.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ready_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ready_update_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_notes_url: Option<String>,
}

/// Every row in the store, tagged by record kind.
///
/// The email index spans customer and membership rows, and historically a
/// membership row fetched by email was mistaken for a customer because the
/// two shapes overlap. Tagging at the store boundary makes that confusion
/// unrepresentable: resolution code switches on the variant, never on field
/// presence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StoreRecord {
    Customer(Customer),
    Membership(Membership),
    Organization(Organization),
    License(License),
    Device(Device),
    Trial(Trial),
    TrialSeen(TrialSeen),
    VersionConfig(VersionInfo),
}

impl StoreRecord {
    /// The tag persisted in the `kind` column, kept in lockstep with the
    /// serde tag.
    pub fn kind(&self) -> &'static str {
        match self {
            StoreRecord::Customer(_) => "customer",
            StoreRecord::Membership(_) => "membership",
            StoreRecord::Organization(_) => "organization",
            StoreRecord::License(_) => "license",
            StoreRecord::Device(_) => "device",
            StoreRecord::Trial(_) => "trial",
            StoreRecord::TrialSeen(_) => "trial_seen",
            StoreRecord::VersionConfig(_) => "version_config",
        }
    }
}
