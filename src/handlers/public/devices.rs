use axum::extract::State;
use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};

use crate::auth;
use crate::db::{AppState, queries};
use crate::error::{AppError, Result};
use crate::extractors::Json;
use crate::heartbeat::active_devices_in_window;
use crate::models::AccountType;
use crate::rate_limit;
use crate::resolve::{self, LicenseSource, OrgContext};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub fingerprint: String,
    pub machine_id: Option<String>,
    pub name: Option<String>,
    pub platform: Option<String>,
    pub last_seen_at: Option<i64>,
    pub created_at: i64,
    /// Whether this device counts toward the concurrent-device window
    pub active: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DevicesResponse {
    pub account_type: AccountType,
    pub has_subscription: bool,
    pub source: LicenseSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub org: Option<OrgContext>,
    pub max_devices: Option<i64>,
    pub active_devices: i64,
    pub devices: Vec<DeviceInfo>,
}

/// GET /portal/devices
///
/// Lists the devices under the caller's effective license: their own, or the
/// organization's shared one. No resolvable license is a hard 404 here,
/// unlike the heartbeat's fail-open path.
pub async fn list_devices(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<DevicesResponse>> {
    // Missing and invalid credentials are both a 401 here, never a
    // malformed-request rejection.
    let identity = auth::verify_bearer(&headers, &state.auth_key).require()?;

    let decision = state
        .limiter
        .check(
            &format!("devices:{}", identity.subject_id),
            rate_limit::PORTAL_DEVICES,
        )
        .await;
    if !decision.allowed {
        return Err(AppError::RateLimited {
            retry_after_secs: decision.retry_after_secs(rate_limit::now_ms()),
        });
    }

    let conn = state.db.get()?;
    let context = resolve::resolve_license_context(&conn, &identity.subject_id, &identity.email)?
        .ok_or_else(|| AppError::NotFound("no license associated with this account".to_string()))?;

    let license = queries::get_license(&conn, &context.license_id)?;
    let devices = queries::list_devices_for_license(&conn, &context.license_id)?;

    let now = queries::now();
    let window_hours = state.config.device_window_hours;
    let active_devices = active_devices_in_window(&devices, window_hours, now) as i64;
    let cutoff = now - window_hours * 3600;

    Ok(Json(DevicesResponse {
        account_type: context.account_type,
        has_subscription: context.has_subscription,
        source: context.source,
        org: context.org,
        max_devices: license.and_then(|l| l.max_devices),
        active_devices,
        devices: devices
            .into_iter()
            .map(|d| DeviceInfo {
                active: d.seen_at() >= cutoff,
                fingerprint: d.fingerprint,
                machine_id: d.machine_id,
                name: d.name,
                platform: d.platform,
                last_seen_at: d.last_seen_at,
                created_at: d.created_at,
            })
            .collect(),
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeactivateRequest {
    pub fingerprint: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeactivateResponse {
    pub deactivated: bool,
    pub remaining_devices: i64,
}

/// POST /portal/devices/deactivate
pub async fn deactivate_device(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<DeactivateRequest>,
) -> Result<Json<DeactivateResponse>> {
    let identity = auth::verify_bearer(&headers, &state.auth_key).require()?;

    let conn = state.db.get()?;
    let context = resolve::resolve_license_context(&conn, &identity.subject_id, &identity.email)?
        .ok_or_else(|| AppError::NotFound("no license associated with this account".to_string()))?;

    if !queries::delete_device(&conn, &context.license_id, req.fingerprint.trim())? {
        return Err(AppError::NotFound("device not found".to_string()));
    }
    tracing::info!(
        "device {} deactivated from license {} by {}",
        req.fingerprint,
        context.license_id,
        identity.subject_id
    );

    let remaining = queries::list_devices_for_license(&conn, &context.license_id)?.len() as i64;
    Ok(Json(DeactivateResponse {
        deactivated: true,
        remaining_devices: remaining,
    }))
}
