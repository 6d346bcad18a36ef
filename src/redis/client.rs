use crate::errors::Result;
use redis::{aio::ConnectionManager, Client};

/// Create a Redis client and connection manager
pub async fn create_client(url: &str) -> Result<ConnectionManager> {
    tracing::info!("Creating Redis client");

    let client = Client::open(url)?;

    let manager = ConnectionManager::new(client).await?;

    tracing::info!("Redis client connected");

    Ok(manager)
}

/// Health check for Redis connection
pub async fn health_check(manager: &mut ConnectionManager) -> Result<()> {
    let _: String = redis::cmd("PING").query_async(manager).await?;
    Ok(())
}
