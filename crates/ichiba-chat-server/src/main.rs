use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use ichiba_chat_server::config::Settings;
use ichiba_chat_server::router::build_router;
use ichiba_chat_server::services::conversation::{ConversationManager, SessionStore};
use ichiba_chat_server::services::{GeminiService, MarketplaceService};
use ichiba_chat_server::state::AppState;
use ichiba_chat_server::utils::logger::init_logger;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration (missing credentials are fatal here)
    let settings = Settings::load()?;

    // Initialize logging
    let _log_guard = init_logger(&settings.logging)?;

    info!("🚀 Starting Ichiba Chat Server...");
    info!("✅ Configuration loaded (model: {})", settings.gemini.model);

    // Initialize services
    let gemini_service = Arc::new(GeminiService::new(settings.gemini.clone()));
    let marketplace_service = Arc::new(MarketplaceService::new(settings.marketplace.clone()));

    let store = SessionStore::new(Duration::from_secs(settings.session.ttl_seconds));

    let conversation_manager = Arc::new(ConversationManager::new(
        store.clone(),
        gemini_service,
        marketplace_service,
        settings.chat.clone(),
    ));

    // Periodic cleanup of expired sessions
    let cleanup_every = Duration::from_secs(settings.session.cleanup_interval_seconds.max(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(cleanup_every);
        loop {
            ticker.tick().await;
            store.cleanup_expired();
        }
    });
    info!("✅ Session cleanup task started (every {:?})", cleanup_every);

    // Build router
    let app = build_router(AppState { conversation_manager });

    // Server address
    let addr = SocketAddr::from((
        settings.server.host.parse::<std::net::IpAddr>()?,
        settings.server.port,
    ));

    info!("🎯 Server listening on {}", addr);

    // Start server
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("👋 Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
