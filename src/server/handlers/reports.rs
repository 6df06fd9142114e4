use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::core::errors::ApiError;
use crate::report;
use crate::state::AppState;

use super::chat::SessionBody;

#[derive(Debug, Deserialize)]
pub struct CompanyInfoBody {
    pub company: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ComparisonBody {
    pub comparison_company: Option<String>,
    pub company_data: Option<Value>,
}

pub async fn compare(
    State(state): State<Arc<AppState>>,
    payload: Option<Json<SessionBody>>,
) -> Result<impl IntoResponse, ApiError> {
    let session = payload.map(|Json(body)| body).unwrap_or_default();
    let session_id = super::chat::session_id(&session.session);

    let active = state.sessions.active_company(&session_id).await;
    let mut companies = state.metrics.distinct_companies().await?;
    companies.retain(|company| company != &active);

    Ok(Json(json!({ "companies": companies })))
}

pub async fn company_info(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CompanyInfoBody>,
) -> Result<impl IntoResponse, ApiError> {
    let company = payload
        .company
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::BadRequest("No company provided".to_string()))?;

    let data = report::company_report(&state.metrics, company).await?;

    Ok(Json(json!({
        "metadata": {
            "companyName": company,
            "stockExchange": "NASDAQ"
        },
        "data": data
    })))
}

pub async fn comparison_company_info(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ComparisonBody>,
) -> Result<impl IntoResponse, ApiError> {
    let comparison_company = payload
        .comparison_company
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::BadRequest("No comparison company provided".to_string()))?;

    let metadata = json!({
        "companyName": comparison_company,
        "stockExchange": "NASDAQ"
    });

    let data = match &payload.company_data {
        Some(company_data) => {
            report::comparison_report(
                state.model.as_ref(),
                &state.index,
                comparison_company,
                company_data,
            )
            .await?
        }
        None => json!({}),
    };

    Ok(Json(json!({ "metadata": metadata, "data": data })))
}
