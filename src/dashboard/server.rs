use axum::{routing::get, Router};
use tower_http::compression::CompressionLayer;
use crate::dashboard::stats::{get_stats, ping};
use crate::error::NexoError;
use crate::NexoEngine;

pub fn router(engine: NexoEngine) -> Router {
    Router::new()
        .route("/ping", get(ping))
        .route("/stats", get(get_stats))
        .layer(CompressionLayer::new())
        .with_state(engine)
}

pub async fn start_http_server(engine: NexoEngine, addr: &str) -> Result<(), NexoError> {
    let app = router(engine);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("🌐 Stats available at http://{}/stats", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
