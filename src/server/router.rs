use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::core::config::Settings;
use crate::server::handlers::{chat, health, reports};
use crate::state::AppState;

/// Creates the application router with all routes and middleware.
///
/// Routes mirror the client contract: chat, session reset, company reports,
/// comparison reports, and follow-up question generation, plus a health
/// probe.
pub fn router(state: Arc<AppState>) -> Router {
    let cors_layer = build_cors_layer(&state.settings);

    Router::new()
        .route("/health", get(health::health))
        .route("/chat", post(chat::chat))
        .route("/reset", post(chat::reset))
        .route("/follow_up_questions", post(chat::follow_up_questions))
        .route("/compare", post(reports::compare))
        .route("/company_info", post(reports::company_info))
        .route(
            "/comparison_company_info",
            post(reports::comparison_company_info),
        )
        .with_state(state)
        .layer(cors_layer)
        .layer(TraceLayer::new_for_http())
}

fn build_cors_layer(settings: &Settings) -> CorsLayer {
    let allowed_origins: Vec<HeaderValue> = settings
        .allowed_origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    // The browser frontend may be served from anywhere; an empty allow-list
    // keeps the permissive default of the reference deployment.
    let allow_origin = if allowed_origins.is_empty() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(allowed_origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::ACCEPT, header::CONTENT_TYPE])
}
