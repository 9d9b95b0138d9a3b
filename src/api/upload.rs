/// Thumbnail and video upload endpoints
use crate::{
    assets::AssetKind,
    auth::AuthContext,
    config::ServerConfig,
    context::AppContext,
    db::Video,
    error::{TubelyError, TubelyResult},
};
use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use futures::TryStreamExt;
use std::io;
use tokio_util::io::StreamReader;
use uuid::Uuid;

/// Allowance for multipart framing on top of the asset size ceiling
const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Build upload routes
///
/// Body limits sit above the per-kind ceilings so oversize uploads are
/// rejected by the staging guard rather than the transport.
pub fn routes(config: &ServerConfig) -> Router<AppContext> {
    Router::new()
        .route(
            "/api/thumbnail_upload/:videoID",
            post(upload_thumbnail).layer(DefaultBodyLimit::max(body_limit(
                config.upload.max_thumbnail_bytes,
            ))),
        )
        .route(
            "/api/video_upload/:videoID",
            post(upload_video).layer(DefaultBodyLimit::max(body_limit(
                config.upload.max_video_bytes,
            ))),
        )
}

fn body_limit(max_bytes: u64) -> usize {
    usize::try_from(max_bytes)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD_BYTES)
}

/// Upload a thumbnail image for a video
async fn upload_thumbnail(
    State(ctx): State<AppContext>,
    Path(video_id): Path<String>,
    auth: AuthContext,
    multipart: Multipart,
) -> TubelyResult<Json<Video>> {
    let video = upload_asset(&ctx, auth, &video_id, AssetKind::Thumbnail, multipart).await?;
    Ok(Json(video))
}

/// Upload the primary video file
async fn upload_video(
    State(ctx): State<AppContext>,
    Path(video_id): Path<String>,
    auth: AuthContext,
    multipart: Multipart,
) -> TubelyResult<Json<Video>> {
    let video = upload_asset(&ctx, auth, &video_id, AssetKind::Video, multipart).await?;
    Ok(Json(video))
}

async fn upload_asset(
    ctx: &AppContext,
    auth: AuthContext,
    video_id: &str,
    kind: AssetKind,
    mut multipart: Multipart,
) -> TubelyResult<Video> {
    let video_id = Uuid::parse_str(video_id)
        .map_err(|_| TubelyError::MalformedRequest(format!("Invalid video ID: {}", video_id)))?;

    // Ownership is settled before any byte of the body is read
    let video = ctx.uploads.authorize(auth.user_id, video_id).await?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, ctx.uploads.max_bytes(kind)))?
    {
        if field.name() != Some(kind.field_name()) {
            continue;
        }

        let declared_type = field.content_type().map(str::to_owned);
        let body = StreamReader::new(
            field.map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string())),
        );
        tokio::pin!(body);

        return ctx
            .uploads
            .ingest(video, kind, declared_type.as_deref(), body)
            .await;
    }

    Err(TubelyError::MalformedRequest(format!(
        "Missing form field '{}'",
        kind.field_name()
    )))
}

/// Body-limit failures surface as 413 like the staging guard's own
fn multipart_error(e: MultipartError, max_bytes: u64) -> TubelyError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        TubelyError::PayloadTooLarge { max_bytes }
    } else {
        TubelyError::MalformedRequest(format!("Invalid multipart body: {}", e))
    }
}
