pub mod public;

use axum::Router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::db::AppState;

/// Assemble the full application router with tracing and CORS applied.
pub fn app(state: AppState) -> Router {
    public::router()
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
