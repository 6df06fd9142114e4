use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::chat::DEFAULT_SESSION;
use crate::core::errors::ApiError;
use crate::report;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequestBody {
    pub prompt: Option<String>,
    pub session: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResetRequestBody {
    pub company: Option<String>,
    pub session: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SessionBody {
    pub session: Option<String>,
}

pub(super) fn session_id(session: &Option<String>) -> String {
    session
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .unwrap_or(DEFAULT_SESSION)
        .to_string()
}

pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ChatRequestBody>,
) -> Result<impl IntoResponse, ApiError> {
    let prompt = payload
        .prompt
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ApiError::BadRequest("No prompt provided".to_string()))?;

    let session_id = session_id(&payload.session);
    let engine = state.sessions.engine(&session_id).await;
    let response = engine.lock().await.get_response(prompt).await?;

    Ok(Json(json!({ "response": response })))
}

pub async fn reset(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ResetRequestBody>,
) -> Result<impl IntoResponse, ApiError> {
    let company = payload
        .company
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::BadRequest("No company provided".to_string()))?;

    let session_id = session_id(&payload.session);
    state.sessions.reset(&session_id, company).await;

    Ok(Json(json!({ "message": "Conversation history reset" })))
}

pub async fn follow_up_questions(
    State(state): State<Arc<AppState>>,
    payload: Option<Json<SessionBody>>,
) -> Result<impl IntoResponse, ApiError> {
    let session = payload.map(|Json(body)| body).unwrap_or_default();
    let session_id = session_id(&session.session);

    let company = state.sessions.active_company(&session_id).await;
    let report = report::company_report(&state.metrics, &company).await?;
    let questions = state.follow_ups.generate(&company, &report).await?;

    Ok(Json(json!({ "questions": questions })))
}
