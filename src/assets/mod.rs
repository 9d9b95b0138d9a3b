/// Asset Storage System
///
/// Key derivation, upload staging and the storage backends that make
/// thumbnails and videos durable. Supports local disk and S3-compatible
/// object storage; the backend is chosen once from configuration.

pub mod disk;
pub mod key;
#[cfg(test)]
pub(crate) mod memory;
pub mod s3;
pub mod stage;

pub use key::{AssetKey, AssetKind, MediaType};
pub use stage::StagedUpload;

use crate::{
    config::{AssetBackendConfig, ServerConfig},
    error::TubelyResult,
};
use async_trait::async_trait;
use std::sync::Arc;

/// Asset storage backend trait
///
/// Implementations must be safe for concurrent calls with distinct keys.
/// A reference URL is only returned once the bytes are durably written.
#[async_trait]
pub trait AssetBackend: Send + Sync {
    /// Write the staged content under `key` and return its reference URL
    async fn store(
        &self,
        key: &AssetKey,
        media_type: MediaType,
        staged: &mut StagedUpload,
    ) -> TubelyResult<String>;

    /// Reference URL for a key; the same key always yields the same URL
    fn url_for(&self, key: &AssetKey) -> String;
}

/// Build the configured backend
pub async fn backend_from_config(config: &ServerConfig) -> TubelyResult<Arc<dyn AssetBackend>> {
    let backend: Arc<dyn AssetBackend> = match &config.storage.backend {
        AssetBackendConfig::Disk { assets_root } => Arc::new(disk::DiskAssetBackend::new(
            assets_root.clone(),
            &config.service.public_url,
        )),
        AssetBackendConfig::S3 {
            bucket,
            region,
            access_key_id,
            secret_access_key,
            endpoint,
            public_url,
        } => Arc::new(
            s3::S3AssetBackend::new(s3::S3Config {
                bucket: bucket.clone(),
                region: region.clone(),
                endpoint: endpoint.clone(),
                access_key_id: access_key_id.clone(),
                secret_access_key: secret_access_key.clone(),
                public_url: public_url.clone(),
            })
            .await?,
        ),
    };

    Ok(backend)
}
