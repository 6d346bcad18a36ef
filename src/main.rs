use std::net::SocketAddr;
use user_directory::{
    api::{create_router, AppState},
    config::Config,
    observability::init_tracing,
    rate_limit::RateLimiter,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::load()?;
    config.validate()?;

    // Initialize tracing/logging
    init_tracing(&config.observability)?;

    tracing::info!("Starting user directory service");
    tracing::info!(
        payments = config.payments.mode(),
        backend = ?config.rate_limit.backend,
        "Configuration loaded: {:?}",
        config.server
    );

    let limiter = RateLimiter::connect(&config.rate_limit).await?;

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid listen address: {}", e))?;

    // Create router
    let app = create_router(AppState::new(config, limiter))?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{}", addr);

    // Peer addresses feed client identity when no forwarded-for header is present
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    tracing::info!("User directory service stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
