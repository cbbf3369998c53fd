use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::auth;
use crate::db::{AppState, queries};
use crate::error::{AppError, Result};
use crate::extractors::Json;
use crate::models::Trial;
use crate::rate_limit;

const SECONDS_PER_DAY: i64 = 86400;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrialStartRequest {
    pub fingerprint: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrialStartResponse {
    pub fingerprint: String,
    pub issued_at: i64,
    pub expires_at: i64,
    pub token: String,
}

/// POST /trial/start
///
/// Creates the per-fingerprint trial grant. Creation is idempotence-guarded
/// by a conditional insert: a second request for the same fingerprint gets a
/// 409, never a fresh trial.
pub async fn start_trial(
    State(state): State<AppState>,
    Json(req): Json<TrialStartRequest>,
) -> Result<Json<TrialStartResponse>> {
    let fingerprint = req.fingerprint.trim();
    if fingerprint.is_empty() {
        return Err(AppError::BadRequest("fingerprint is required".to_string()));
    }

    let decision = state
        .limiter
        .check(&format!("trial:{fingerprint}"), rate_limit::TRIAL_START)
        .await;
    if !decision.allowed {
        return Err(AppError::RateLimited {
            retry_after_secs: decision.retry_after_secs(rate_limit::now_ms()),
        });
    }

    let now = queries::now();
    let trial = Trial {
        fingerprint: fingerprint.to_string(),
        issued_at: now,
        expires_at: now + state.config.trial_days * SECONDS_PER_DAY,
        signed_token: auth::sign_trial_token(
            &state.auth_key,
            fingerprint,
            state.config.trial_days as u64,
        )?,
    };

    let conn = state.db.get()?;
    if !queries::create_trial(&conn, &trial)? {
        return Err(AppError::Conflict(
            "trial already exists for this fingerprint".to_string(),
        ));
    }
    tracing::info!("trial started for fingerprint {fingerprint}");

    Ok(Json(TrialStartResponse {
        fingerprint: trial.fingerprint,
        issued_at: trial.issued_at,
        expires_at: trial.expires_at,
        token: trial.signed_token,
    }))
}
