use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString, Default,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AccountType {
    #[default]
    Individual,
    Business,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    PastDue,
    Cancelled,
    Expired,
}

/// Identity-bound customer profile. Never hard-deleted; subscription state
/// moves through soft statuses instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub user_id: String,
    pub email: String,
    #[serde(default)]
    pub stripe_customer_id: Option<String>,
    /// Reference to the customer's own license, if any
    #[serde(default)]
    pub license_id: Option<String>,
    #[serde(default)]
    pub account_type: AccountType,
    /// Absence means the profile has never carried subscription state; a
    /// present value, even a stale one, marks this as a real subscriber
    /// profile for resolution purposes.
    #[serde(default)]
    pub subscription_status: Option<SubscriptionStatus>,
    pub created_at: i64,
}
