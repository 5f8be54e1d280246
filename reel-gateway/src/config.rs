use std::str::FromStr;

use anyhow::{anyhow, Context};
use reel_blob::{BlobConfig, S3Config, UploadRules};

const MB: u64 = 1024 * 1024;

/// Which store backs the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    /// S3-compatible bucket, e.g. Cloudflare R2
    S3,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "s3" | "r2" => Ok(Self::S3),
            other => Err(anyhow!("unknown STORAGE_BACKEND '{other}', expected memory or s3")),
        }
    }
}

/// Gateway settings, read once at startup and shared through the router state.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    /// Origin used for upload URLs. Derived from the request when unset.
    pub public_url: Option<String>,
    pub allowed_origin: String,
    pub backend: StorageBackend,
    pub bucket: String,
    pub r2_endpoint_url: Option<String>,
    pub r2_access_key_id: Option<String>,
    pub r2_secret_access_key: Option<String>,
    pub r2_region: String,
    pub max_object_bytes: u64,
    pub part_size_bytes: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8787,
            public_url: None,
            allowed_origin: "*".to_string(),
            backend: StorageBackend::Memory,
            bucket: "videos".to_string(),
            r2_endpoint_url: None,
            r2_access_key_id: None,
            r2_secret_access_key: None,
            r2_region: "auto".to_string(),
            max_object_bytes: 512 * MB,
            part_size_bytes: 8 * MB,
        }
    }
}

impl GatewayConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();
        let backend = match optional_env("STORAGE_BACKEND") {
            Some(value) => value.parse()?,
            None => defaults.backend,
        };
        let max_object_bytes = env_megabytes("MAX_OBJECT_SIZE_MB", 512)?;
        let part_size_bytes = env_megabytes("UPLOAD_PART_SIZE_MB", 8)?;

        Ok(Self {
            host: env_var_or("HTTP_HOST", defaults.host),
            port: env_var_or("HTTP_PORT", defaults.port),
            public_url: optional_env("PUBLIC_URL"),
            allowed_origin: env_var_or("ALLOWED_ORIGIN", defaults.allowed_origin),
            backend,
            bucket: env_var_or("VIDEO_BUCKET", defaults.bucket),
            r2_endpoint_url: optional_env("R2_ENDPOINT_URL"),
            r2_access_key_id: optional_env("R2_ACCESS_KEY_ID"),
            r2_secret_access_key: optional_env("R2_SECRET_ACCESS_KEY"),
            r2_region: env_var_or("R2_REGION", defaults.r2_region),
            max_object_bytes,
            part_size_bytes,
        })
    }

    pub fn with_public_url(mut self, url: impl Into<String>) -> Self {
        self.public_url = Some(url.into());
        self
    }

    pub fn with_allowed_origin(mut self, origin: impl Into<String>) -> Self {
        self.allowed_origin = origin.into();
        self
    }

    pub fn with_max_object_bytes(mut self, bytes: u64) -> Self {
        self.max_object_bytes = bytes;
        self
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn upload_rules(&self) -> UploadRules {
        UploadRules::new().with_part_size(self.part_size_bytes)
    }

    pub fn blob_config(&self) -> BlobConfig {
        BlobConfig::new()
            .with_max_blob_bytes(self.max_object_bytes)
            .with_upload_rules(self.upload_rules())
    }

    /// Bucket settings for the S3 backend. Credentials are required.
    pub fn s3_config(&self) -> anyhow::Result<S3Config> {
        let access_key_id = self
            .r2_access_key_id
            .clone()
            .context("R2_ACCESS_KEY_ID must be set for the s3 backend")?;
        let secret_access_key = self
            .r2_secret_access_key
            .clone()
            .context("R2_SECRET_ACCESS_KEY must be set for the s3 backend")?;

        let mut config = S3Config::new(&self.bucket, access_key_id, secret_access_key)
            .with_region(&self.r2_region);
        if let Some(endpoint) = &self.r2_endpoint_url {
            config = config.with_endpoint(endpoint);
        }
        Ok(config)
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn env_var_or<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    optional_env(key)
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}

fn env_megabytes(key: &str, default_mb: u64) -> anyhow::Result<u64> {
    megabytes(key, env_var_or(key, default_mb))
}

fn megabytes(key: &str, mb: u64) -> anyhow::Result<u64> {
    mb.checked_mul(MB)
        .with_context(|| format!("{key}={mb} does not fit in a 64-bit byte count"))
}
