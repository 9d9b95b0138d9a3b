/// S3-compatible asset storage backend
use crate::assets::{AssetBackend, AssetKey, MediaType, StagedUpload};
use crate::error::{TubelyError, TubelyResult};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_credential_types::Credentials;
use aws_sdk_s3::config::Builder as S3ConfigBuilder;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use std::sync::Arc;
use tracing::{debug, error, info};

/// S3 asset storage backend
///
/// Supports AWS S3 and S3-compatible storage providers (MinIO, DigitalOcean Spaces, etc.)
#[derive(Clone)]
pub struct S3AssetBackend {
    client: Arc<Client>,
    bucket: String,
    region: String,
    endpoint: Option<String>,
    public_url: Option<String>,
}

/// Configuration for S3 storage
#[derive(Debug, Clone)]
pub struct S3Config {
    /// S3 bucket name
    pub bucket: String,

    /// AWS region (e.g., "us-east-1")
    pub region: String,

    /// Custom endpoint for S3-compatible services
    /// Example: "https://nyc3.digitaloceanspaces.com" or "http://localhost:9000"
    pub endpoint: Option<String>,

    /// AWS access key ID
    pub access_key_id: String,

    /// AWS secret access key
    pub secret_access_key: String,

    /// Public base URL objects are reachable under, e.g. a CDN distribution
    pub public_url: Option<String>,
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            region: "us-east-1".to_string(),
            endpoint: None,
            access_key_id: String::new(),
            secret_access_key: String::new(),
            public_url: None,
        }
    }
}

impl S3AssetBackend {
    /// Create a new S3 asset backend
    pub async fn new(config: S3Config) -> TubelyResult<Self> {
        info!(
            "Initializing S3 asset storage (bucket: {}, region: {})",
            config.bucket, config.region
        );

        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None, // session token
            None, // expiration
            "tubely",
        );

        let aws_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .load()
            .await;

        let mut s3_config_builder = S3ConfigBuilder::from(&aws_config);

        if let Some(endpoint) = &config.endpoint {
            debug!("Using custom S3 endpoint: {}", endpoint);
            s3_config_builder = s3_config_builder
                .endpoint_url(endpoint)
                .force_path_style(true); // Required for MinIO and some S3-compatible services
        }

        let client = Client::from_conf(s3_config_builder.build());

        Ok(Self {
            client: Arc::new(client),
            bucket: config.bucket,
            region: config.region,
            endpoint: config.endpoint,
            public_url: config.public_url,
        })
    }
}

/// Externally resolvable URL for an object
fn object_url(
    bucket: &str,
    region: &str,
    endpoint: Option<&str>,
    public_url: Option<&str>,
    key: &str,
) -> String {
    if let Some(base) = public_url {
        format!("{}/{}", base.trim_end_matches('/'), key)
    } else if let Some(endpoint) = endpoint {
        // Path-style: {endpoint}/{bucket}/{key}
        format!("{}/{}/{}", endpoint.trim_end_matches('/'), bucket, key)
    } else {
        format!("https://{}.s3.{}.amazonaws.com/{}", bucket, region, key)
    }
}

#[async_trait]
impl AssetBackend for S3AssetBackend {
    async fn store(
        &self,
        key: &AssetKey,
        media_type: MediaType,
        staged: &mut StagedUpload,
    ) -> TubelyResult<String> {
        let start = std::time::Instant::now();
        let size = staged.size();

        debug!(
            "Uploading asset to S3: {} ({} bytes, type: {})",
            key, size, media_type
        );

        // Streamed from the stage file; the payload is never fully resident
        let body = ByteStream::from_path(staged.path()).await.map_err(|e| {
            TubelyError::StorageWriteFailed(format!("Failed to open staged upload: {}", e))
        })?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key.as_str())
            .body(body)
            .content_type(media_type.as_str())
            .send()
            .await
            .map_err(|e| {
                error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %key,
                    size_bytes = size,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 upload failed"
                );
                TubelyError::StorageWriteFailed(format!("S3 upload failed: {}", e))
            })?;

        info!(
            bucket = %self.bucket,
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 upload successful"
        );

        Ok(self.url_for(key))
    }

    fn url_for(&self, key: &AssetKey) -> String {
        object_url(
            &self.bucket,
            &self.region,
            self.endpoint.as_deref(),
            self.public_url.as_deref(),
            key.as_str(),
        )
    }
}
