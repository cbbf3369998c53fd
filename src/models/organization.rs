use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MemberRole {
    Owner,
    Admin,
    Member,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MemberStatus {
    Active,
    Suspended,
    Revoked,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    pub org_id: String,
    pub owner_user_id: String,
    /// Owner's email, the lookup key for the shared-license resolution path
    pub owner_email: String,
    #[serde(default)]
    pub seat_limit: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    pub created_at: i64,
}

/// A user's membership in an organization. Only `active` memberships inherit
/// the owner's shared license.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Membership {
    pub org_id: String,
    pub member_id: String,
    /// Member's email; indexed alongside customer emails, which is why the
    /// store hands back a tagged record instead of a bare shape
    pub email: String,
    /// Missing role is treated as plain member at resolution time
    #[serde(default)]
    pub role: Option<MemberRole>,
    pub status: MemberStatus,
    pub joined_at: i64,
}
