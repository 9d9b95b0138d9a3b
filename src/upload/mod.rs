/// Upload orchestration
///
/// Per request: authorize against the owning video, validate the declared
/// media type, stage the body, commit it to the storage backend and only
/// then point the video at the stored asset. The first failure ends the
/// request; the staged file is removed on every path.
use crate::{
    assets::{AssetBackend, AssetKey, AssetKind, StagedUpload},
    config::{KeyStrategy, ServerConfig},
    db::{Video, VideoStore},
    error::{TubelyError, TubelyResult},
};
use std::sync::Arc;
use tokio::io::AsyncRead;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Upload pipeline shared by all requests
pub struct UploadPipeline {
    config: Arc<ServerConfig>,
    videos: Arc<VideoStore>,
    backend: Arc<dyn AssetBackend>,
}

impl UploadPipeline {
    pub fn new(
        config: Arc<ServerConfig>,
        videos: Arc<VideoStore>,
        backend: Arc<dyn AssetBackend>,
    ) -> Self {
        Self {
            config,
            videos,
            backend,
        }
    }

    /// Size ceiling for an asset kind
    pub fn max_bytes(&self, kind: AssetKind) -> u64 {
        match kind {
            AssetKind::Thumbnail => self.config.upload.max_thumbnail_bytes,
            AssetKind::Video => self.config.upload.max_video_bytes,
        }
    }

    fn key_strategy(&self, kind: AssetKind) -> KeyStrategy {
        match kind {
            AssetKind::Thumbnail => self.config.upload.thumbnail_keys,
            AssetKind::Video => self.config.upload.video_keys,
        }
    }

    /// Fetch the owning video and require that `caller` owns it
    pub async fn authorize(&self, caller: Uuid, video_id: Uuid) -> TubelyResult<Video> {
        let video = self
            .videos
            .get_video(video_id)
            .await?
            .ok_or_else(|| TubelyError::NotFound(format!("Video not found: {}", video_id)))?;

        if video.user_id != caller {
            warn!(video_id = %video_id, user_id = %caller, "Upload attempted by non-owner");
            return Err(TubelyError::Forbidden("You do not own this video".to_string()));
        }

        Ok(video)
    }

    /// Validate, stage, commit and persist one asset for an authorized video
    pub async fn ingest<R>(
        &self,
        video: Video,
        kind: AssetKind,
        declared_type: Option<&str>,
        body: R,
    ) -> TubelyResult<Video>
    where
        R: AsyncRead + Unpin + Send,
    {
        let declared_type = declared_type
            .ok_or_else(|| TubelyError::MalformedRequest("Missing Content-Type".to_string()))?;
        let media_type = kind.validate(declared_type)?;

        let mut staged =
            StagedUpload::stage(&self.config.storage.tmp_location, body, self.max_bytes(kind))
                .await?;

        let owner_hint = match self.key_strategy(kind) {
            KeyStrategy::Owner => Some(video.id),
            KeyStrategy::Random => None,
        };
        let key = AssetKey::derive(media_type, owner_hint)?;

        info!(
            video_id = %video.id,
            user_id = %video.user_id,
            key = %key,
            size_bytes = staged.size(),
            "Uploading {}",
            kind.field_name()
        );

        // A failed write leaves the video untouched
        let url = self.backend.store(&key, media_type, &mut staged).await?;
        drop(staged);

        if let Some(previous) = video.reference(kind) {
            debug!(video_id = %video.id, previous = %previous, "Replacing {} reference", kind.field_name());
        }

        // Only the targeted column is written; the other reference may have
        // been committed by a concurrent upload since `video` was read
        match self.videos.set_reference(video.id, kind, &url).await {
            Ok(updated) => Ok(updated),
            Err(e) => {
                error!(
                    video_id = %video.id,
                    key = %key,
                    url = %url,
                    error = %e,
                    "Asset stored but video update failed; stored asset is unreferenced"
                );
                Err(TubelyError::PersistenceFailed {
                    key: key.to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }
}
