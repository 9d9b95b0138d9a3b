/// Disk-based asset storage backend
use crate::{
    assets::{AssetBackend, AssetKey, MediaType, StagedUpload},
    error::{TubelyError, TubelyResult},
};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::{fs, io::AsyncWriteExt};

/// URL path prefix that the assets root is served under
pub const ASSETS_PREFIX: &str = "/assets";

/// Disk storage backend
///
/// Stores assets flat under a root directory that is created on first use.
/// Writes land in a partial directory next to the root, which is never
/// served, and are renamed onto the key only after they are fully synced.
#[derive(Clone)]
pub struct DiskAssetBackend {
    root: PathBuf,
    partial_dir: PathBuf,
    base_url: String,
}

impl DiskAssetBackend {
    /// Create a new disk storage backend
    pub fn new(root: PathBuf, public_url: &str) -> Self {
        let base_url = format!("{}{}", public_url.trim_end_matches('/'), ASSETS_PREFIX);
        let partial_dir = partial_dir_for(&root);
        Self {
            root,
            partial_dir,
            base_url,
        }
    }

    /// Ensure the assets root and the partial directory exist
    async fn ensure_root(&self) -> TubelyResult<()> {
        for dir in [&self.root, &self.partial_dir] {
            fs::create_dir_all(dir).await.map_err(|e| {
                TubelyError::StorageWriteFailed(format!(
                    "Failed to create directory {}: {}",
                    dir.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Get the file path for a key
    fn asset_path(&self, key: &AssetKey) -> TubelyResult<PathBuf> {
        if !AssetKey::is_safe(key.as_str()) {
            return Err(TubelyError::StorageWriteFailed(format!(
                "Refusing unsafe asset key {:?}",
                key.as_str()
            )));
        }
        Ok(self.root.join(key.as_str()))
    }
}

/// Sibling of the assets root on the same filesystem, so renames stay atomic
fn partial_dir_for(root: &Path) -> PathBuf {
    let name = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "assets".to_string());
    root.with_file_name(format!(".{}-partial", name))
}

fn write_failed<'a, E: std::fmt::Display>(
    key: &'a AssetKey,
    step: &'static str,
) -> impl FnOnce(E) -> TubelyError + 'a {
    move |e| TubelyError::StorageWriteFailed(format!("Failed to {} asset {}: {}", step, key, e))
}

#[async_trait]
impl AssetBackend for DiskAssetBackend {
    async fn store(
        &self,
        key: &AssetKey,
        media_type: MediaType,
        staged: &mut StagedUpload,
    ) -> TubelyResult<String> {
        let path = self.asset_path(key)?;
        self.ensure_root().await?;

        let start = std::time::Instant::now();

        let (std_file, partial_path) = tempfile::Builder::new()
            .prefix(".partial-")
            .tempfile_in(&self.partial_dir)
            .map_err(write_failed(key, "create"))?
            .into_parts();
        let mut file = fs::File::from_std(std_file);

        staged.rewind().await.map_err(write_failed(key, "read staged"))?;
        let written = tokio::io::copy(staged.reader(), &mut file)
            .await
            .map_err(write_failed(key, "write"))?;

        file.flush().await.map_err(write_failed(key, "flush"))?;
        file.sync_all().await.map_err(write_failed(key, "sync"))?;
        drop(file);

        partial_path.persist(&path).map_err(write_failed(key, "move into place"))?;

        tracing::info!(
            path = %path.display(),
            key = %key,
            content_type = %media_type,
            size_bytes = written,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Asset written to disk"
        );

        Ok(self.url_for(key))
    }

    fn url_for(&self, key: &AssetKey) -> String {
        format!("{}/{}", self.base_url, key)
    }
}
