//! Typed access to the composite-keyed record store.
//!
//! Key scheme:
//! - `USER#<user_id>` / `PROFILE`            customer profile
//! - `USER#<user_id>` / `MEMBER#<org_id>`    org membership
//! - `ORG#<org_id>`   / `PROFILE`            organization
//! - `LICENSE#<id>`   / `PROFILE`            license (also indexed by key)
//! - `LICENSE#<id>`   / `DEVICE#<fp>`        device, deduped by fingerprint
//! - `TRIAL#<fp>`     / `PROFILE` | `SEEN`   trial grant / trial last-seen
//! - `CONFIG`         / `VERSION`            update-notification metadata

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::*;

pub fn now() -> i64 {
    Utc::now().timestamp()
}

fn gen_id() -> String {
    Uuid::new_v4().to_string()
}

fn user_pk(user_id: &str) -> String {
    format!("USER#{user_id}")
}

fn org_pk(org_id: &str) -> String {
    format!("ORG#{org_id}")
}

fn license_pk(license_id: &str) -> String {
    format!("LICENSE#{license_id}")
}

fn device_sk(fingerprint: &str) -> String {
    format!("DEVICE#{fingerprint}")
}

fn trial_pk(fingerprint: &str) -> String {
    format!("TRIAL#{fingerprint}")
}

// ============ Raw record access ============

/// Insert or replace a record at (pk, sk).
pub fn put_record(conn: &Connection, pk: &str, sk: &str, record: &StoreRecord) -> Result<()> {
    let data = serde_json::to_string(record)?;
    let ts = now();
    conn.execute(
        "INSERT INTO records (pk, sk, kind, data, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)
         ON CONFLICT (pk, sk) DO UPDATE SET kind = ?3, data = ?4, updated_at = ?5",
        params![pk, sk, record.kind(), &data, ts],
    )?;
    Ok(())
}

/// Conditional create: returns false (and writes nothing) when a record
/// already exists at (pk, sk). This is the idempotency primitive for trials.
pub fn create_record_if_absent(
    conn: &Connection,
    pk: &str,
    sk: &str,
    record: &StoreRecord,
) -> Result<bool> {
    let data = serde_json::to_string(record)?;
    let ts = now();
    let inserted = conn.execute(
        "INSERT INTO records (pk, sk, kind, data, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)
         ON CONFLICT (pk, sk) DO NOTHING",
        params![pk, sk, record.kind(), &data, ts],
    )?;
    Ok(inserted > 0)
}

pub fn get_record(conn: &Connection, pk: &str, sk: &str) -> Result<Option<StoreRecord>> {
    let data: Option<String> = conn
        .query_row(
            "SELECT data FROM records WHERE pk = ?1 AND sk = ?2",
            params![pk, sk],
            |row| row.get(0),
        )
        .optional()?;
    data.map(|d| serde_json::from_str(&d).map_err(Into::into))
        .transpose()
}

pub fn delete_record(conn: &Connection, pk: &str, sk: &str) -> Result<bool> {
    let deleted = conn.execute(
        "DELETE FROM records WHERE pk = ?1 AND sk = ?2",
        params![pk, sk],
    )?;
    Ok(deleted > 0)
}

fn records_by_prefix(conn: &Connection, pk: &str, sk_prefix: &str) -> Result<Vec<StoreRecord>> {
    let mut stmt = conn.prepare(
        "SELECT data FROM records WHERE pk = ?1 AND sk LIKE ?2 || '%' ORDER BY sk",
    )?;
    let rows = stmt
        .query_map(params![pk, sk_prefix], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    rows.iter()
        .map(|d| serde_json::from_str(d).map_err(Into::into))
        .collect()
}

// ============ Customers ============

pub fn put_customer(conn: &Connection, customer: &Customer) -> Result<()> {
    put_record(
        conn,
        &user_pk(&customer.user_id),
        "PROFILE",
        &StoreRecord::Customer(customer.clone()),
    )
}

pub fn get_customer(conn: &Connection, user_id: &str) -> Result<Option<Customer>> {
    match get_record(conn, &user_pk(user_id), "PROFILE")? {
        Some(StoreRecord::Customer(c)) => Ok(Some(c)),
        Some(other) => Err(AppError::Internal(format!(
            "record kind mismatch at USER#{user_id}/PROFILE: expected customer, got {}",
            other.kind()
        ))),
        None => Ok(None),
    }
}

/// Look up whatever the email index points at. The caller gets the tagged
/// record and must switch on it; a membership row found here is not a
/// customer. Customer rows win when both kinds share an email.
pub fn get_directory_record_by_email(
    conn: &Connection,
    email: &str,
) -> Result<Option<StoreRecord>> {
    let data: Option<String> = conn
        .query_row(
            "SELECT data FROM records
             WHERE kind IN ('customer', 'membership')
               AND json_extract(data, '$.email') = ?1
             ORDER BY kind LIMIT 1",
            params![email],
            |row| row.get(0),
        )
        .optional()?;
    data.map(|d| serde_json::from_str(&d).map_err(Into::into))
        .transpose()
}

// ============ Organizations & memberships ============

pub fn put_organization(conn: &Connection, org: &Organization) -> Result<()> {
    put_record(
        conn,
        &org_pk(&org.org_id),
        "PROFILE",
        &StoreRecord::Organization(org.clone()),
    )
}

pub fn get_organization(conn: &Connection, org_id: &str) -> Result<Option<Organization>> {
    match get_record(conn, &org_pk(org_id), "PROFILE")? {
        Some(StoreRecord::Organization(o)) => Ok(Some(o)),
        Some(other) => Err(AppError::Internal(format!(
            "record kind mismatch at ORG#{org_id}/PROFILE: expected organization, got {}",
            other.kind()
        ))),
        None => Ok(None),
    }
}

pub fn put_membership(conn: &Connection, membership: &Membership) -> Result<()> {
    put_record(
        conn,
        &user_pk(&membership.member_id),
        &format!("MEMBER#{}", membership.org_id),
        &StoreRecord::Membership(membership.clone()),
    )
}

/// First active membership for a user, if any.
pub fn get_active_membership(conn: &Connection, user_id: &str) -> Result<Option<Membership>> {
    let records = records_by_prefix(conn, &user_pk(user_id), "MEMBER#")?;
    for record in records {
        if let StoreRecord::Membership(m) = record
            && m.status == MemberStatus::Active
        {
            return Ok(Some(m));
        }
    }
    Ok(None)
}

// ============ Licenses ============

/// Create a license record with a fresh id.
pub fn create_license(
    conn: &Connection,
    owner_user_id: &str,
    license_key: &str,
    max_devices: Option<i64>,
) -> Result<License> {
    let license = License {
        license_id: gen_id(),
        owner_user_id: owner_user_id.to_string(),
        license_key: license_key.to_string(),
        status: LicenseStatus::Active,
        max_devices,
        activated_devices: 0,
        created_at: now(),
    };
    put_license(conn, &license)?;
    Ok(license)
}

pub fn put_license(conn: &Connection, license: &License) -> Result<()> {
    put_record(
        conn,
        &license_pk(&license.license_id),
        "PROFILE",
        &StoreRecord::License(license.clone()),
    )
}

pub fn get_license(conn: &Connection, license_id: &str) -> Result<Option<License>> {
    match get_record(conn, &license_pk(license_id), "PROFILE")? {
        Some(StoreRecord::License(l)) => Ok(Some(l)),
        Some(other) => Err(AppError::Internal(format!(
            "record kind mismatch at LICENSE#{license_id}/PROFILE: expected license, got {}",
            other.kind()
        ))),
        None => Ok(None),
    }
}

pub fn get_license_by_key(conn: &Connection, license_key: &str) -> Result<Option<License>> {
    let data: Option<String> = conn
        .query_row(
            "SELECT data FROM records
             WHERE kind = 'license' AND json_extract(data, '$.license_key') = ?1",
            params![license_key],
            |row| row.get(0),
        )
        .optional()?;
    match data.map(|d| serde_json::from_str(&d)).transpose()? {
        Some(StoreRecord::License(l)) => Ok(Some(l)),
        Some(_) | None => Ok(None),
    }
}

pub fn increment_activated_devices(conn: &Connection, license_id: &str) -> Result<()> {
    conn.execute(
        "UPDATE records
         SET data = json_set(data, '$.activated_devices',
                             COALESCE(json_extract(data, '$.activated_devices'), 0) + 1),
             updated_at = ?1
         WHERE pk = ?2 AND sk = 'PROFILE' AND kind = 'license'",
        params![now(), license_pk(license_id)],
    )?;
    Ok(())
}

// ============ Devices ============

/// Fields a caller may bind on device upsert. The user id here must be the
/// verified subject, never a client-supplied value.
#[derive(Debug, Clone, Default)]
pub struct DeviceUpsert {
    pub machine_id: Option<String>,
    pub user_id: Option<String>,
    pub name: Option<String>,
    pub platform: Option<String>,
}

/// Create or refresh the device record for a fingerprint, preserving
/// `created_at` and any previously bound fields the caller didn't supply.
pub fn upsert_device(
    conn: &Connection,
    license_id: &str,
    fingerprint: &str,
    up: &DeviceUpsert,
    seen_at: i64,
) -> Result<Device> {
    let existing = get_device(conn, license_id, fingerprint)?;
    let device = match existing {
        Some(prev) => Device {
            machine_id: up.machine_id.clone().or(prev.machine_id),
            user_id: up.user_id.clone().or(prev.user_id),
            name: up.name.clone().or(prev.name),
            platform: up.platform.clone().or(prev.platform),
            last_seen_at: Some(seen_at),
            ..prev
        },
        None => Device {
            license_id: license_id.to_string(),
            fingerprint: fingerprint.to_string(),
            machine_id: up.machine_id.clone(),
            user_id: up.user_id.clone(),
            name: up.name.clone(),
            platform: up.platform.clone(),
            last_seen_at: Some(seen_at),
            created_at: seen_at,
        },
    };
    put_record(
        conn,
        &license_pk(license_id),
        &device_sk(fingerprint),
        &StoreRecord::Device(device.clone()),
    )?;
    Ok(device)
}

pub fn get_device(
    conn: &Connection,
    license_id: &str,
    fingerprint: &str,
) -> Result<Option<Device>> {
    match get_record(conn, &license_pk(license_id), &device_sk(fingerprint))? {
        Some(StoreRecord::Device(d)) => Ok(Some(d)),
        Some(other) => Err(AppError::Internal(format!(
            "record kind mismatch at LICENSE#{license_id}/DEVICE#{fingerprint}: got {}",
            other.kind()
        ))),
        None => Ok(None),
    }
}

pub fn list_devices_for_license(conn: &Connection, license_id: &str) -> Result<Vec<Device>> {
    let records = records_by_prefix(conn, &license_pk(license_id), "DEVICE#")?;
    Ok(records
        .into_iter()
        .filter_map(|r| match r {
            StoreRecord::Device(d) => Some(d),
            _ => None,
        })
        .collect())
}

/// Count devices seen within the sliding window. `window_hours` comes from
/// `Config::device_window_hours`; this helper never picks its own default, so
/// it cannot disagree with the heartbeat and activation call sites.
pub fn count_active_devices(
    conn: &Connection,
    license_id: &str,
    window_hours: i64,
    now: i64,
) -> Result<i64> {
    let devices = list_devices_for_license(conn, license_id)?;
    Ok(crate::heartbeat::active_devices_in_window(&devices, window_hours, now) as i64)
}

pub fn delete_device(conn: &Connection, license_id: &str, fingerprint: &str) -> Result<bool> {
    delete_record(conn, &license_pk(license_id), &device_sk(fingerprint))
}

// ============ Trials ============

/// Create the trial grant for a fingerprint. Returns false if one already
/// exists (conditional insert; duplicate creation is rejected, not replayed).
pub fn create_trial(conn: &Connection, trial: &Trial) -> Result<bool> {
    create_record_if_absent(
        conn,
        &trial_pk(&trial.fingerprint),
        "PROFILE",
        &StoreRecord::Trial(trial.clone()),
    )
}

pub fn get_trial(conn: &Connection, fingerprint: &str) -> Result<Option<Trial>> {
    match get_record(conn, &trial_pk(fingerprint), "PROFILE")? {
        Some(StoreRecord::Trial(t)) => Ok(Some(t)),
        _ => Ok(None),
    }
}

/// Upsert the trial last-seen sub-record. Trial heartbeats touch this without
/// requiring the signed trial token.
pub fn touch_trial_seen(conn: &Connection, fingerprint: &str, seen_at: i64) -> Result<()> {
    let count = match get_record(conn, &trial_pk(fingerprint), "SEEN")? {
        Some(StoreRecord::TrialSeen(s)) => s.heartbeat_count + 1,
        _ => 1,
    };
    put_record(
        conn,
        &trial_pk(fingerprint),
        "SEEN",
        &StoreRecord::TrialSeen(TrialSeen {
            fingerprint: fingerprint.to_string(),
            last_seen_at: seen_at,
            heartbeat_count: count,
        }),
    )
}

pub fn get_trial_seen(conn: &Connection, fingerprint: &str) -> Result<Option<TrialSeen>> {
    match get_record(conn, &trial_pk(fingerprint), "SEEN")? {
        Some(StoreRecord::TrialSeen(s)) => Ok(Some(s)),
        _ => Ok(None),
    }
}

// ============ Version config ============

pub fn get_version_config(conn: &Connection) -> Result<Option<VersionInfo>> {
    match get_record(conn, "CONFIG", "VERSION")? {
        Some(StoreRecord::VersionConfig(v)) => Ok(Some(v)),
        _ => Ok(None),
    }
}

pub fn put_version_config(conn: &Connection, info: &VersionInfo) -> Result<()> {
    put_record(conn, "CONFIG", "VERSION", &StoreRecord::VersionConfig(info.clone()))
}
