use std::sync::Arc;
use tikv_jemallocator::Jemalloc;
use tracing_subscriber::EnvFilter;
use nexo_stats::config::Config;
use nexo_stats::dashboard::server::start_http_server;
use nexo_stats::stats::allocator::{JemallocStatsProvider, PauseLog, Reclaimer};
use nexo_stats::NexoEngine;

#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

// ========================================
// MAIN ENTRY POINT
// ========================================

#[tokio::main]
async fn main() {
    let config = match Config::init() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("[Server] {}", e);
            std::process::exit(1);
        }
    };
    init_logging(&config.server.log_level);

    let pauses = Arc::new(PauseLog::new(config.memory.purge_headroom_bytes));
    Reclaimer::new(pauses.clone(), config.memory.purge_headroom_bytes)
        .spawn(config.memory.purge_interval());

    let engine = NexoEngine::new(config, Arc::new(JemallocStatsProvider::new(pauses)));

    let addr = format!("{}:{}", config.server.host, config.server.http_port);
    tracing::info!("🚀 Nexo stats v{} starting", env!("CARGO_PKG_VERSION"));

    if let Err(e) = start_http_server(engine, &addr).await {
        tracing::error!("[Server] HTTP server on {} failed: {}", addr, e);
        std::process::exit(1);
    }
}

fn init_logging(default_level: &str) {
    let filter = EnvFilter::try_new(default_level).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
