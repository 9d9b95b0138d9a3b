/// Video records: the owning records that asset URLs are attached to
use crate::{
    assets::AssetKind,
    error::{TubelyError, TubelyResult},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

/// Video metadata record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Video {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub title: String,
    pub description: String,
    pub user_id: Uuid,
    pub thumbnail_url: Option<String>,
    pub video_url: Option<String>,
}

impl Video {
    pub fn reference(&self, kind: AssetKind) -> Option<&str> {
        match kind {
            AssetKind::Thumbnail => self.thumbnail_url.as_deref(),
            AssetKind::Video => self.video_url.as_deref(),
        }
    }
}

/// Parameters for a new draft video
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateVideoParams {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

const VIDEO_COLUMNS: &str =
    "id, created_at, updated_at, title, description, user_id, thumbnail_url, video_url";

fn parse_uuid(row: &SqliteRow, column: &str) -> TubelyResult<Uuid> {
    let raw: String = row.try_get(column)?;
    Uuid::parse_str(&raw)
        .map_err(|e| TubelyError::Internal(format!("Corrupt {} '{}': {}", column, raw, e)))
}

fn video_from_row(row: &SqliteRow) -> TubelyResult<Video> {
    Ok(Video {
        id: parse_uuid(row, "id")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        user_id: parse_uuid(row, "user_id")?,
        thumbnail_url: row.try_get("thumbnail_url")?,
        video_url: row.try_get("video_url")?,
    })
}

/// Video metadata store
pub struct VideoStore {
    db: SqlitePool,
}

impl VideoStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Create a draft video owned by `user_id`
    pub async fn create_video(
        &self,
        user_id: Uuid,
        params: CreateVideoParams,
    ) -> TubelyResult<Video> {
        let title = params.title.trim();
        if title.is_empty() {
            return Err(TubelyError::MalformedRequest(
                "Video title cannot be empty".to_string(),
            ));
        }

        let now = Utc::now();
        let video = Video {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            title: title.to_string(),
            description: params.description,
            user_id,
            thumbnail_url: None,
            video_url: None,
        };

        sqlx::query(
            "INSERT INTO videos (id, created_at, updated_at, title, description, user_id, thumbnail_url, video_url)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(video.id.to_string())
        .bind(video.created_at)
        .bind(video.updated_at)
        .bind(&video.title)
        .bind(&video.description)
        .bind(video.user_id.to_string())
        .bind(&video.thumbnail_url)
        .bind(&video.video_url)
        .execute(&self.db)
        .await?;

        Ok(video)
    }

    /// Fetch a video by id
    pub async fn get_video(&self, id: Uuid) -> TubelyResult<Option<Video>> {
        let row = sqlx::query(&format!("SELECT {} FROM videos WHERE id = ?1", VIDEO_COLUMNS))
            .bind(id.to_string())
            .fetch_optional(&self.db)
            .await?;

        row.as_ref().map(video_from_row).transpose()
    }

    /// List videos owned by a user, newest first
    pub async fn list_videos_for_user(&self, user_id: Uuid) -> TubelyResult<Vec<Video>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM videos WHERE user_id = ?1 ORDER BY created_at DESC",
            VIDEO_COLUMNS
        ))
        .bind(user_id.to_string())
        .fetch_all(&self.db)
        .await?;

        rows.iter().map(video_from_row).collect()
    }

    /// Write a video back, returning the stored version
    pub async fn update_video(&self, video: &Video) -> TubelyResult<Video> {
        let updated_at = Utc::now();

        let result = sqlx::query(
            "UPDATE videos
             SET title = ?1, description = ?2, thumbnail_url = ?3, video_url = ?4, updated_at = ?5
             WHERE id = ?6",
        )
        .bind(&video.title)
        .bind(&video.description)
        .bind(&video.thumbnail_url)
        .bind(&video.video_url)
        .bind(updated_at)
        .bind(video.id.to_string())
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(TubelyError::NotFound(format!("Video not found: {}", video.id)));
        }

        Ok(Video {
            updated_at,
            ..video.clone()
        })
    }

    /// Point one reference column at `url`, leaving every other column as stored
    pub async fn set_reference(&self, id: Uuid, kind: AssetKind, url: &str) -> TubelyResult<Video> {
        let statement = match kind {
            AssetKind::Thumbnail => {
                "UPDATE videos SET thumbnail_url = ?1, updated_at = ?2 WHERE id = ?3"
            }
            AssetKind::Video => "UPDATE videos SET video_url = ?1, updated_at = ?2 WHERE id = ?3",
        };

        let result = sqlx::query(statement)
            .bind(url)
            .bind(Utc::now())
            .bind(id.to_string())
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(TubelyError::NotFound(format!("Video not found: {}", id)));
        }

        self.get_video(id)
            .await?
            .ok_or_else(|| TubelyError::NotFound(format!("Video not found: {}", id)))
    }
}
