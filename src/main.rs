use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;

use esg_backend::logging;
use esg_backend::server;
use esg_backend::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let state = AppState::initialize().await?;
    logging::init(&state.settings.paths);

    if !state.model.health_check().await.unwrap_or(false) {
        tracing::warn!("Generative model backend is not reachable; chat will degrade");
    }

    let bind_addr = format!("127.0.0.1:{}", state.settings.port);
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    let addr = listener.local_addr()?;

    tracing::info!("Listening on {}", addr);

    let app: Router = server::router::router(state.clone());

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
