use std::net::SocketAddr;

use tower_http::trace::TraceLayer;
use tracing::info;

use warbler_api::auth::AppStateInner;
use warbler_api::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warbler=debug,warbler_api=debug,tower_http=debug".into()),
        )
        .init();

    let config = AppConfig::from_env()?;
    if config.testing {
        info!("Testing mode: reduced password hashing cost");
    }
    if !config.csrf_enabled {
        info!("CSRF protection disabled");
    }
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    let state = AppStateInner::new(config)?;
    let app = warbler_api::router(state).layer(TraceLayer::new_for_http());

    info!("Warbler listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received Ctrl+C, shutting down...");
}
