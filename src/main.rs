use std::sync::Arc;

use scan_gate::config::GateConfig;
use scan_gate::error::Result;
use scan_gate::routes::{AppState, gate_routes};
use scan_gate::scores::ScoreCache;
use scan_gate::store::{LibSqlBackend, ProfileStore};

#[tokio::main]
async fn main() -> Result<()> {
    let config = GateConfig::from_env();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_filter)),
        )
        .with_target(false)
        .init();

    config.validate()?;

    eprintln!("scan-gate v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   API: http://0.0.0.0:{}/api", config.port);
    eprintln!("   Database: {}", config.db_path.display());
    eprintln!("   Score cache: {} entries\n", config.score_cache_capacity);

    // ── Database ─────────────────────────────────────────────────────────
    let store: Arc<dyn ProfileStore> = Arc::new(LibSqlBackend::new_local(&config.db_path).await?);

    // ── HTTP ─────────────────────────────────────────────────────────────
    let state = AppState::new(store, ScoreCache::new(config.score_cache_capacity));
    let app = gate_routes(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    tracing::info!(port = config.port, "scan-gate server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down");
        })
        .await?;

    Ok(())
}
