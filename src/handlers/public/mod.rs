mod activate;
mod devices;
mod heartbeat;
mod trial;

pub use activate::*;
pub use devices::*;
pub use heartbeat::*;
pub use trial::*;

use axum::{
    Json, Router,
    routing::{get, post},
};
use serde::Serialize;

use crate::db::AppState;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/license/heartbeat", post(license_heartbeat))
        .route("/license/activate", post(activate_device))
        .route("/trial/start", post(start_trial))
        .route("/portal/devices", get(list_devices))
        .route("/portal/devices/deactivate", post(deactivate_device))
}
