/// Video record endpoints
use crate::{
    auth::AuthContext,
    context::AppContext,
    db::{CreateVideoParams, Video},
    error::{TubelyError, TubelyResult},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use tracing::info;
use uuid::Uuid;

/// Build video routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/videos", get(list_videos).post(create_video))
        .route("/api/videos/:videoID", get(get_video))
}

/// Create a draft video owned by the caller
async fn create_video(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Json(params): Json<CreateVideoParams>,
) -> TubelyResult<impl IntoResponse> {
    let video = ctx.videos.create_video(auth.user_id, params).await?;

    info!(video_id = %video.id, user_id = %auth.user_id, "Created video");

    Ok((StatusCode::CREATED, Json(video)))
}

/// List the caller's videos, newest first
async fn list_videos(
    State(ctx): State<AppContext>,
    auth: AuthContext,
) -> TubelyResult<Json<Vec<Video>>> {
    let videos = ctx.videos.list_videos_for_user(auth.user_id).await?;
    Ok(Json(videos))
}

/// Fetch one of the caller's videos
async fn get_video(
    State(ctx): State<AppContext>,
    Path(video_id): Path<String>,
    auth: AuthContext,
) -> TubelyResult<Json<Video>> {
    let video_id = Uuid::parse_str(&video_id)
        .map_err(|_| TubelyError::MalformedRequest(format!("Invalid video ID: {}", video_id)))?;

    let video = ctx
        .videos
        .get_video(video_id)
        .await?
        .ok_or_else(|| TubelyError::NotFound(format!("Video not found: {}", video_id)))?;

    if video.user_id != auth.user_id {
        return Err(TubelyError::Forbidden("You do not own this video".to_string()));
    }

    Ok(Json(video))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        assets::{memory::MemoryBackend, AssetBackend},
        auth::issue_test_token,
        config::test_config,
        db::memory_pool,
        server::build_router,
    };
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request},
    };
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn test_context(dir: &tempfile::TempDir) -> AppContext {
        let backend: Arc<dyn AssetBackend> = Arc::new(MemoryBackend::default());
        AppContext::from_parts(test_config(dir.path()), memory_pool().await, backend)
    }

    fn bearer(ctx: &AppContext, user_id: Uuid) -> String {
        format!(
            "Bearer {}",
            issue_test_token(user_id, &ctx.config.authentication.jwt_secret, 3600)
        )
    }

    async fn call(ctx: &AppContext, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = build_router(ctx.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (
            status,
            serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null),
        )
    }

    #[tokio::test]
    async fn test_create_then_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = test_context(&dir).await;
        let owner = Uuid::new_v4();

        let (status, created) = call(
            &ctx,
            Request::post("/api/videos")
                .header(header::AUTHORIZATION, bearer(&ctx, owner))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"title":"Boots","description":"Kicks"}"#))
                .unwrap(),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["title"], "Boots");
        assert_eq!(created["user_id"], owner.to_string());
        assert!(created["thumbnail_url"].is_null());

        let id = created["id"].as_str().unwrap();
        let (status, fetched) = call(
            &ctx,
            Request::get(format!("/api/videos/{}", id))
                .header(header::AUTHORIZATION, bearer(&ctx, owner))
                .body(Body::empty())
                .unwrap(),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["id"], created["id"]);

        let (status, listed) = call(
            &ctx,
            Request::get("/api/videos")
                .header(header::AUTHORIZATION, bearer(&ctx, owner))
                .body(Body::empty())
                .unwrap(),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_by_other_user_is_forbidden() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = test_context(&dir).await;
        let video = ctx
            .videos
            .create_video(
                Uuid::new_v4(),
                CreateVideoParams {
                    title: "Private".to_string(),
                    description: String::new(),
                },
            )
            .await
            .unwrap();

        let (status, _) = call(
            &ctx,
            Request::get(format!("/api/videos/{}", video.id))
                .header(header::AUTHORIZATION, bearer(&ctx, Uuid::new_v4()))
                .body(Body::empty())
                .unwrap(),
        )
        .await;

        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_list_requires_auth() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = test_context(&dir).await;

        let (status, json) = call(
            &ctx,
            Request::get("/api/videos").body(Body::empty()).unwrap(),
        )
        .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error"], "AuthenticationRequired");
    }
}
