/// Configuration management for Tubely
use crate::error::{TubelyError, TubelyResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Log filter used when `RUST_LOG` is not set or does not parse
pub const DEFAULT_LOG_FILTER: &str = "tubely=debug,tower_http=debug";

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub authentication: AuthConfig,
    pub upload: UploadConfig,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    /// Base URL that locally stored assets are served under
    pub public_url: String,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_directory: PathBuf,
    pub database: PathBuf,
    /// Directory holding in-flight staged uploads
    pub tmp_location: PathBuf,
    pub backend: AssetBackendConfig,
}

/// Asset storage backend, selected once at startup
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AssetBackendConfig {
    Disk {
        assets_root: PathBuf,
    },
    S3 {
        bucket: String,
        region: String,
        access_key_id: String,
        secret_access_key: String,
        endpoint: Option<String>,
        /// Public base URL (e.g. a CDN distribution) for stored objects
        public_url: Option<String>,
    },
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

/// How asset keys are derived for one asset kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyStrategy {
    /// 32 random bytes, URL-safe base64
    Random,
    /// Owning video id; re-upload overwrites
    Owner,
}

impl std::str::FromStr for KeyStrategy {
    type Err = TubelyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "random" => Ok(KeyStrategy::Random),
            "owner" => Ok(KeyStrategy::Owner),
            other => Err(TubelyError::Config(format!(
                "Unknown key strategy '{}' (expected 'random' or 'owner')",
                other
            ))),
        }
    }
}

/// Upload limits and key policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    pub max_thumbnail_bytes: u64,
    pub max_video_bytes: u64,
    pub thumbnail_keys: KeyStrategy,
    pub video_keys: KeyStrategy,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_thumbnail_bytes: 10 << 20, // 10MB
            max_video_bytes: 1 << 30,      // 1GB
            thumbnail_keys: KeyStrategy::Random,
            video_keys: KeyStrategy::Random,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> TubelyResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("TUBELY_HOSTNAME").unwrap_or_else(|_| "localhost".to_string());
        let port: u16 = env::var("TUBELY_PORT")
            .unwrap_or_else(|_| "8091".to_string())
            .parse()
            .map_err(|_| TubelyError::Config("Invalid port number".to_string()))?;
        let public_url = env::var("TUBELY_PUBLIC_URL")
            .unwrap_or_else(|_| format!("http://localhost:{}", port));

        let data_directory: PathBuf = env::var("TUBELY_DATA_DIRECTORY")
            .unwrap_or_else(|_| "./data".to_string())
            .into();
        let database = env::var("TUBELY_DATABASE_LOCATION")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("tubely.sqlite"));
        let tmp_location = env::var("TUBELY_TMP_LOCATION")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("tmp"));

        let backend = if let Ok(bucket) = env::var("TUBELY_S3_BUCKET") {
            AssetBackendConfig::S3 {
                bucket,
                region: env::var("TUBELY_S3_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
                access_key_id: env::var("TUBELY_S3_ACCESS_KEY_ID")
                    .map_err(|_| TubelyError::Config("S3 access key required".to_string()))?,
                secret_access_key: env::var("TUBELY_S3_SECRET_ACCESS_KEY")
                    .map_err(|_| TubelyError::Config("S3 secret key required".to_string()))?,
                endpoint: env::var("TUBELY_S3_ENDPOINT").ok(),
                public_url: env::var("TUBELY_S3_PUBLIC_URL").ok(),
            }
        } else {
            AssetBackendConfig::Disk {
                assets_root: env::var("TUBELY_ASSETS_ROOT")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from("./assets")),
            }
        };

        let jwt_secret = env::var("TUBELY_JWT_SECRET")
            .map_err(|_| TubelyError::Config("JWT secret required".to_string()))?;

        let defaults = UploadConfig::default();
        let max_thumbnail_bytes = env::var("TUBELY_MAX_THUMBNAIL_BYTES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.max_thumbnail_bytes);
        let max_video_bytes = env::var("TUBELY_MAX_VIDEO_BYTES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.max_video_bytes);
        let thumbnail_keys = match env::var("TUBELY_THUMBNAIL_KEYS") {
            Ok(v) => v.parse()?,
            Err(_) => defaults.thumbnail_keys,
        };
        let video_keys = match env::var("TUBELY_VIDEO_KEYS") {
            Ok(v) => v.parse()?,
            Err(_) => defaults.video_keys,
        };

        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_string());

        Ok(ServerConfig {
            service: ServiceConfig {
                hostname,
                port,
                public_url,
            },
            storage: StorageConfig {
                data_directory,
                database,
                tmp_location,
                backend,
            },
            authentication: AuthConfig { jwt_secret },
            upload: UploadConfig {
                max_thumbnail_bytes,
                max_video_bytes,
                thumbnail_keys,
                video_keys,
            },
            logging: LoggingConfig { level: log_level },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> TubelyResult<()> {
        if self.service.hostname.is_empty() {
            return Err(TubelyError::Config("Hostname cannot be empty".to_string()));
        }

        if self.authentication.jwt_secret.len() < 32 {
            return Err(TubelyError::Config(
                "JWT secret must be at least 32 characters".to_string(),
            ));
        }

        if self.upload.max_thumbnail_bytes == 0 || self.upload.max_video_bytes == 0 {
            return Err(TubelyError::Config(
                "Upload size limits must be greater than zero".to_string(),
            ));
        }

        if let AssetBackendConfig::S3 { bucket, .. } = &self.storage.backend {
            if bucket.is_empty() {
                return Err(TubelyError::Config("S3 bucket cannot be empty".to_string()));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn test_config(root: &std::path::Path) -> ServerConfig {
    ServerConfig {
        service: ServiceConfig {
            hostname: "localhost".to_string(),
            port: 8091,
            public_url: "http://localhost:8091".to_string(),
        },
        storage: StorageConfig {
            data_directory: root.to_path_buf(),
            database: root.join("tubely.sqlite"),
            tmp_location: root.join("tmp"),
            backend: AssetBackendConfig::Disk {
                assets_root: root.join("assets"),
            },
        },
        authentication: AuthConfig {
            jwt_secret: "test-secret-that-is-at-least-32-characters".to_string(),
        },
        upload: UploadConfig::default(),
        logging: LoggingConfig {
            level: "debug".to_string(),
        },
    }
}
