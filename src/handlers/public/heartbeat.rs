use axum::extract::State;
use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};

use crate::auth::{self, BearerAuth};
use crate::db::{AppState, queries};
use crate::error::{AppError, Result};
use crate::extractors::Json;
use crate::heartbeat::{self, Decision, EnforcementMode, HeartbeatStatus, NEXT_HEARTBEAT_SECS};
use crate::models::VersionInfo;
use crate::rate_limit;
use crate::util::extract_client_ip;
use crate::versioning;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatRequest {
    #[serde(default)]
    pub fingerprint: Option<String>,
    #[serde(default)]
    pub machine_id: Option<String>,
    /// Required when a license key is supplied
    #[serde(default)]
    pub session_id: Option<String>,
    /// Presence selects the licensed branch; absence means trial
    #[serde(default)]
    pub license_key: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatResponse {
    pub valid: bool,
    pub status: HeartbeatStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub concurrent_machines: Option<i64>,
    pub max_machines: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_heartbeat: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upgrade: Option<String>,
    #[serde(flatten)]
    pub version: VersionInfo,
}

impl HeartbeatResponse {
    pub fn from_decision(decision: Decision, version: VersionInfo) -> Self {
        Self {
            valid: decision.valid,
            status: decision.status,
            reason: decision.reason,
            concurrent_machines: decision.concurrent_machines,
            max_machines: decision.max_machines,
            next_heartbeat: Some(NEXT_HEARTBEAT_SECS),
            upgrade: decision.upgrade,
            version,
        }
    }
}

fn required<'a>(field: Option<&'a String>, name: &str) -> Result<&'a str> {
    field
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::BadRequest(format!("{name} is required")))
}

/// POST /license/heartbeat
///
/// Trial branch (no license key): fingerprint required, authentication
/// optional. Licensed branch: fingerprint and session id required,
/// authentication mandatory. Either way, a present-but-invalid credential is
/// a hard 401, never a silent downgrade to anonymous.
pub async fn license_heartbeat(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<HeartbeatRequest>,
) -> Result<Json<HeartbeatResponse>> {
    // Shield the route before doing any work. Licensed callers are limited
    // per key, trial callers per fingerprint.
    let limit_id = req
        .license_key
        .as_deref()
        .or(req.fingerprint.as_deref())
        .unwrap_or("unknown");
    let decision = state
        .limiter
        .check(&format!("hb:{limit_id}"), rate_limit::HEARTBEAT)
        .await;
    if !decision.allowed {
        tracing::warn!(
            "heartbeat rate limited for {limit_id} (ip {:?})",
            extract_client_ip(&headers)
        );
        return Err(AppError::RateLimited {
            retry_after_secs: decision.retry_after_secs(rate_limit::now_ms()),
        });
    }

    let fingerprint = required(req.fingerprint.as_ref(), "fingerprint")?;
    let bearer = auth::verify_bearer(&headers, &state.auth_key);

    // A bad credential never degrades to anonymous, even on the trial branch
    // where no credential at all would have been fine.
    if matches!(bearer, BearerAuth::Invalid) {
        return Err(AppError::Unauthorized("invalid credentials".to_string()));
    }

    match req.license_key.as_deref() {
        None => trial_heartbeat(&state, fingerprint).await,
        Some(key) => {
            let session_id = required(req.session_id.as_ref(), "sessionId")?;
            let identity = bearer
                .identity()
                .ok_or_else(|| AppError::Unauthorized("authentication required".to_string()))?
                .clone();
            licensed_heartbeat(&state, key, fingerprint, session_id, &req, identity).await
        }
    }
}

async fn trial_heartbeat(state: &AppState, fingerprint: &str) -> Result<Json<HeartbeatResponse>> {
    let conn = state.db.get()?;
    queries::touch_trial_seen(&conn, fingerprint, queries::now())?;

    let version = versioning::compose(&conn, &state.config);
    Ok(Json(HeartbeatResponse::from_decision(
        heartbeat::trial_decision(),
        version,
    )))
}

async fn licensed_heartbeat(
    state: &AppState,
    key: &str,
    fingerprint: &str,
    session_id: &str,
    req: &HeartbeatRequest,
    identity: crate::auth::Identity,
) -> Result<Json<HeartbeatResponse>> {
    // Lexical and checksum validation before any store lookup: malformed or
    // guessed keys are rejected with zero backend calls.
    crate::license_key::validate(key).map_err(|e| AppError::BadRequest(e.to_string()))?;

    let conn = state.db.get()?;
    let version = versioning::compose(&conn, &state.config);

    let Some(license) = queries::get_license_by_key(&conn, key)? else {
        // Key passed format and checksum; assume upstream validity and fail
        // open with unknown limits rather than punishing a store gap.
        tracing::info!("heartbeat for unknown license key (session {session_id})");
        return Ok(Json(HeartbeatResponse::from_decision(
            heartbeat::unknown_license_decision(),
            version,
        )));
    };

    // Fire-and-forget last-seen upsert: a transient store hiccup must never
    // fail a heartbeat. The verified subject, not anything from the request
    // body, is bound as the device's owner.
    let db = state.db.clone();
    let license_id = license.license_id.clone();
    let up = queries::DeviceUpsert {
        machine_id: req.machine_id.clone(),
        user_id: Some(identity.subject_id.clone()),
        name: None,
        platform: None,
    };
    let fp = fingerprint.to_string();
    tokio::task::spawn_blocking(move || {
        let seen_at = queries::now();
        match db.get() {
            Ok(conn) => {
                if let Err(e) = queries::upsert_device(&conn, &license_id, &fp, &up, seen_at) {
                    tracing::warn!("device last-seen update failed for {license_id}/{fp}: {e}");
                }
            }
            Err(e) => tracing::warn!("pool unavailable for last-seen update: {e}"),
        }
    });

    let devices = queries::list_devices_for_license(&conn, &license.license_id)?;
    let decision = heartbeat::evaluate_license(
        &license,
        &devices,
        state.config.device_window_hours,
        queries::now(),
        EnforcementMode::Advisory,
    );
    if decision.status == HeartbeatStatus::OverLimit {
        tracing::info!(
            "license {} over limit: {:?}",
            license.license_id,
            decision.reason
        );
    }

    Ok(Json(HeartbeatResponse::from_decision(decision, version)))
}
