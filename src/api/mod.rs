/// API routes and handlers
pub mod upload;
pub mod videos;

use crate::{config::ServerConfig, context::AppContext};
use axum::Router;

/// Build API routes
pub fn routes(config: &ServerConfig) -> Router<AppContext> {
    Router::new()
        .merge(videos::routes())
        .merge(upload::routes(config))
}
