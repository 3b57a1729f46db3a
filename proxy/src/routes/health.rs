use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::AppState;

/// GET /api/health
///
/// Server version and whether signing keys are currently fresh. Never
/// triggers a key refresh.
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "wbi_keys_fresh": state.keys.is_fresh().await
    }))
}
