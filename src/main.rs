/// Tubely - video asset upload service
///
/// Accepts thumbnail and video uploads for user-owned video records and
/// stores them on local disk or in S3-compatible object storage.

mod api;
mod assets;
mod auth;
mod config;
mod context;
mod db;
mod error;
mod server;
mod upload;

use config::{ServerConfig, DEFAULT_LOG_FILTER};
use context::AppContext;
use error::TubelyResult;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> TubelyResult<()> {
    let config = ServerConfig::from_env()?;

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_new(&config.logging.level)
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let ctx = AppContext::new(config).await?;

    server::serve(ctx).await?;

    Ok(())
}
