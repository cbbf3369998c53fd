use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use crate::auth;
use crate::db::{AppState, queries};
use crate::error::{AppError, Result};
use crate::extractors::Json;
use crate::heartbeat::{self, EnforcementMode, HeartbeatStatus};
use crate::versioning;

use super::heartbeat::HeartbeatResponse;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivateRequest {
    pub license_key: String,
    pub fingerprint: String,
    #[serde(default)]
    pub machine_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub platform: Option<String>,
}

/// POST /license/activate
///
/// The strict enforcement gate: unlike the heartbeat route, activating a new
/// fingerprint that would exceed the license's window allowance is refused
/// outright. Re-activating a known fingerprint updates it in place and is
/// always allowed.
pub async fn activate_device(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ActivateRequest>,
) -> Result<Response> {
    let identity = auth::verify_bearer(&headers, &state.auth_key).require()?;

    let fingerprint = req.fingerprint.trim();
    if fingerprint.is_empty() {
        return Err(AppError::BadRequest("fingerprint is required".to_string()));
    }

    crate::license_key::validate(&req.license_key)
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let conn = state.db.get()?;
    let license = queries::get_license_by_key(&conn, &req.license_key)?
        .ok_or_else(|| AppError::NotFound("license key not found".to_string()))?;

    let now = queries::now();
    let window_hours = state.config.device_window_hours;
    let version = versioning::compose(&conn, &state.config);

    let existing = queries::get_device(&conn, &license.license_id, fingerprint)?;
    if existing.is_none() {
        let devices = queries::list_devices_for_license(&conn, &license.license_id)?;
        let active = heartbeat::active_devices_in_window(&devices, window_hours, now) as i64;
        if let Some(max) = license.max_devices
            && active + 1 > max
        {
            let reason = format!(
                "device limit exceeded: {active} of {max} devices active in the last {window_hours}h"
            );
            tracing::info!("activation refused for license {}: {reason}", license.license_id);
            let body = HeartbeatResponse {
                valid: false,
                status: HeartbeatStatus::DeviceLimitExceeded,
                reason: Some(reason),
                concurrent_machines: Some(active),
                max_machines: Some(max),
                next_heartbeat: None,
                upgrade: None,
                version,
            };
            return Ok((StatusCode::FORBIDDEN, Json(body)).into_response());
        }
    }

    // Activation is the one synchronous device write: the caller needs the
    // post-activation counts, so no fire-and-forget here.
    queries::upsert_device(
        &conn,
        &license.license_id,
        fingerprint,
        &queries::DeviceUpsert {
            machine_id: req.machine_id.clone(),
            user_id: Some(identity.subject_id.clone()),
            name: req.name.clone(),
            platform: req.platform.clone(),
        },
        now,
    )?;
    if existing.is_none() {
        queries::increment_activated_devices(&conn, &license.license_id)?;
    }

    let devices = queries::list_devices_for_license(&conn, &license.license_id)?;
    let decision = heartbeat::evaluate_license(
        &license,
        &devices,
        window_hours,
        now,
        EnforcementMode::Strict,
    );
    Ok(Json(HeartbeatResponse::from_decision(decision, version)).into_response())
}
