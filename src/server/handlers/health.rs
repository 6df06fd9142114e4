use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::state::AppState;

pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let model_reachable = state.model.health_check().await.unwrap_or(false);

    Json(json!({
        "status": "ok",
        "provider": state.model.name(),
        "model_reachable": model_reachable
    }))
}
