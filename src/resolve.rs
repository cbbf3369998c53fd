//! License-context resolution: which license governs an authenticated
//! identity.
//!
//! Direct ownership always beats an organization-inherited license. A direct
//! profile that carries any subscription status, even a stale one, settles
//! the question by itself; membership is only consulted for callers whose
//! profile is missing or bare.

use rusqlite::Connection;
use serde::Serialize;

use crate::db::queries;
use crate::error::Result;
use crate::models::{AccountType, Customer, MemberRole, StoreRecord, SubscriptionStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LicenseSource {
    Direct,
    Org,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrgContext {
    pub org_id: String,
    pub org_name: String,
    pub member_role: MemberRole,
}

/// The effective license governing one identity for one request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseContext {
    pub license_id: String,
    pub account_type: AccountType,
    pub has_subscription: bool,
    pub source: LicenseSource,
    pub org: Option<OrgContext>,
}

fn direct_context(customer: &Customer, license_id: String) -> LicenseContext {
    LicenseContext {
        license_id,
        account_type: customer.account_type,
        has_subscription: customer.subscription_status == Some(SubscriptionStatus::Active),
        source: LicenseSource::Direct,
        org: None,
    }
}

/// Resolve the license context for a verified identity. `Ok(None)` means the
/// identity has no effective license; it is an ordinary outcome, not an
/// error.
pub fn resolve_license_context(
    conn: &Connection,
    subject_id: &str,
    email: &str,
) -> Result<Option<LicenseContext>> {
    // Fast path: profile keyed by the verified subject id.
    let customer = match queries::get_customer(conn, subject_id)? {
        Some(c) => Some(c),
        // Cross-index fallback by email. The index also serves membership
        // rows; the tagged record keeps those from masquerading as
        // customers, so a membership hit falls through to org resolution.
        None => match queries::get_directory_record_by_email(conn, email)? {
            Some(StoreRecord::Customer(c)) => Some(c),
            _ => None,
        },
    };

    if let Some(customer) = customer {
        if let Some(license_id) = customer.license_id.clone() {
            return Ok(Some(direct_context(&customer, license_id)));
        }
        // An explicit subscription status on the direct profile wins even
        // when it references no license; membership is not consulted.
        if customer.subscription_status.is_some() {
            return Ok(None);
        }
    }

    resolve_org_license(conn, subject_id)
}

/// Organization path: active membership, then the owning org, then the
/// owner's customer record by email, then the owner's license reference.
/// Any missing link yields "no license".
fn resolve_org_license(conn: &Connection, subject_id: &str) -> Result<Option<LicenseContext>> {
    let Some(membership) = queries::get_active_membership(conn, subject_id)? else {
        return Ok(None);
    };

    let Some(org) = queries::get_organization(conn, &membership.org_id)? else {
        tracing::warn!(
            "membership for {subject_id} points at missing org {}",
            membership.org_id
        );
        return Ok(None);
    };

    // Owner lookup goes through the email index; only a customer-tagged
    // record counts as the owner profile.
    let owner = match queries::get_directory_record_by_email(conn, &org.owner_email)? {
        Some(StoreRecord::Customer(c)) => c,
        _ => return Ok(None),
    };

    let Some(license_id) = owner.license_id.clone() else {
        return Ok(None);
    };

    Ok(Some(LicenseContext {
        license_id,
        account_type: owner.account_type,
        has_subscription: owner.subscription_status == Some(SubscriptionStatus::Active),
        source: LicenseSource::Org,
        org: Some(OrgContext {
            org_id: org.org_id,
            org_name: org.name.unwrap_or_else(|| "Organization".to_string()),
            member_role: membership.role.unwrap_or(MemberRole::Member),
        }),
    }))
}
