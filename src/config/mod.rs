use crate::error::{AdapterError, AdapterResult};
use crate::services::naming::NamingKind;
use crate::utils::path::{resolve_path, validate_configured_path};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;

pub const DEFAULT_REGION: &str = "us-east-1";

/// Credentials and target picked up from the process environment.
///
/// Read once at startup; the adapter itself never looks at the environment.
#[derive(Debug, Clone, Default)]
pub struct StorageDefaults {
    pub key: Option<String>,
    pub secret: Option<String>,
    pub bucket: Option<String>,
    pub region: Option<String>,
    pub endpoint: Option<String>,
}

impl StorageDefaults {
    /// Load defaults from `STORAGE_*` environment variables
    pub fn from_env() -> Self {
        Self {
            key: env::var("STORAGE_KEY").ok(),
            secret: env::var("STORAGE_SECRET").ok(),
            bucket: env::var("STORAGE_BUCKET").ok(),
            region: env::var("STORAGE_REGION").ok(),
            endpoint: env::var("STORAGE_ENDPOINT").ok(),
        }
    }
}

/// Canned ACL applied to every uploaded object.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AccessPolicy {
    #[default]
    PublicRead,
    Private,
    PublicReadWrite,
    AuthenticatedRead,
    BucketOwnerRead,
    BucketOwnerFullControl,
}

impl AccessPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessPolicy::PublicRead => "public-read",
            AccessPolicy::Private => "private",
            AccessPolicy::PublicReadWrite => "public-read-write",
            AccessPolicy::AuthenticatedRead => "authenticated-read",
            AccessPolicy::BucketOwnerRead => "bucket-owner-read",
            AccessPolicy::BucketOwnerFullControl => "bucket-owner-full-control",
        }
    }
}

/// Which optional descriptor fields the caller's record schema persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaFields {
    pub filename: bool,
    pub bucket: bool,
    pub path: bool,
    pub etag: bool,
}

impl Default for SchemaFields {
    fn default() -> Self {
        Self {
            filename: true,
            bucket: false,
            path: false,
            etag: false,
        }
    }
}

/// Transport settings handed to the object storage client untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClientTuning {
    /// Maximum concurrent part uploads (default: 20)
    pub max_async_s3: usize,

    /// Retries after the first failed request (default: 3)
    pub retry_count: u32,

    /// Initial retry backoff in milliseconds (default: 100)
    pub retry_delay_ms: u64,

    /// Objects at least this large use multipart upload (default: 20 MB)
    pub multipart_upload_threshold: u64,

    /// Part size for multipart uploads (default: 15 MB)
    pub multipart_upload_size: u64,
}

impl Default for ClientTuning {
    fn default() -> Self {
        Self {
            max_async_s3: 20,
            retry_count: 3,
            retry_delay_ms: 100,
            multipart_upload_threshold: 20 * 1024 * 1024, // 20 MB
            multipart_upload_size: 15 * 1024 * 1024,      // 15 MB
        }
    }
}

/// Options supplied by the caller when creating an adapter. Anything left
/// unset falls back to [`StorageDefaults`] or the built-in defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AdapterOptions {
    pub key: Option<String>,
    pub secret: Option<String>,
    pub bucket: Option<String>,
    pub region: Option<String>,
    pub endpoint: Option<String>,
    pub force_path_style: Option<bool>,
    pub path: Option<String>,
    pub headers: Option<HashMap<String, String>>,
    /// Older name for `headers`; takes precedence when both are given.
    pub default_headers: Option<HashMap<String, String>>,
    pub acl: Option<AccessPolicy>,
    pub naming: Option<NamingKind>,
    pub tuning: Option<ClientTuning>,
}

/// Immutable adapter configuration, shared read-only by every upload.
#[derive(Clone)]
pub struct AdapterConfig {
    pub key: String,
    pub secret: String,
    pub bucket: String,
    pub region: String,
    pub endpoint: Option<String>,
    pub force_path_style: bool,
    /// Storage-relative prefix derived from the configured path.
    pub path: String,
    pub headers: HashMap<String, String>,
    pub acl: AccessPolicy,
    pub naming: NamingKind,
    pub tuning: ClientTuning,
    pub schema: SchemaFields,
}

impl AdapterConfig {
    /// Merge caller options over the environment defaults and validate.
    pub fn build(
        options: AdapterOptions,
        defaults: StorageDefaults,
        schema: SchemaFields,
    ) -> AdapterResult<Self> {
        if let Some(path) = options.path.as_deref() {
            validate_configured_path(path)?;
        }

        let key = required(options.key.or(defaults.key), "key")?;
        let secret = required(options.secret.or(defaults.secret), "secret")?;
        let bucket = required(options.bucket.or(defaults.bucket), "bucket")?;
        let region = options
            .region
            .or(defaults.region)
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_REGION.to_string());
        let endpoint = options
            .endpoint
            .or(defaults.endpoint)
            .filter(|e| !e.trim().is_empty())
            .map(|e| e.trim_end_matches('/').to_string());

        let tuning = options.tuning.unwrap_or_default();
        if tuning.max_async_s3 == 0 {
            return Err(AdapterError::configuration("maxAsyncS3 must be at least 1"));
        }
        if tuning.multipart_upload_size == 0 {
            return Err(AdapterError::configuration(
                "multipartUploadSize must be greater than zero",
            ));
        }

        Ok(Self {
            key,
            secret,
            bucket,
            region,
            force_path_style: options.force_path_style.unwrap_or(endpoint.is_some()),
            endpoint,
            path: options.path.as_deref().map(resolve_path).unwrap_or_default(),
            headers: options
                .default_headers
                .or(options.headers)
                .unwrap_or_default(),
            acl: options.acl.unwrap_or_default(),
            naming: options.naming.unwrap_or_default(),
            tuning,
            schema,
        })
    }
}

impl std::fmt::Debug for AdapterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterConfig")
            .field("key", &self.key)
            .field("secret", &"<redacted>")
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .field("force_path_style", &self.force_path_style)
            .field("path", &self.path)
            .field("headers", &self.headers)
            .field("acl", &self.acl)
            .field("naming", &self.naming)
            .field("tuning", &self.tuning)
            .field("schema", &self.schema)
            .finish()
    }
}

fn required(value: Option<String>, name: &str) -> AdapterResult<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AdapterError::configuration(format!("S3 {} is required", name)))
}
