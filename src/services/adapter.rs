use crate::config::{AdapterConfig, AdapterOptions, SchemaFields, StorageDefaults};
use crate::error::{AdapterError, AdapterResult};
use crate::models::FileDescriptor;
use crate::services::headers::compose_headers;
use crate::services::naming::{FilenameGenerator, NamingStrategy};
use crate::services::storage::{ObjectStorageClient, ObjectUpload};
use crate::utils::path::join_key;
use serde_json::{Map, Value, json};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Optional record fields this adapter knows how to fill in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaField {
    Filename,
    Bucket,
    Path,
    Etag,
}

impl SchemaField {
    pub fn name(&self) -> &'static str {
        match self {
            SchemaField::Filename => "filename",
            SchemaField::Bucket => "bucket",
            SchemaField::Path => "path",
            SchemaField::Etag => "etag",
        }
    }

    fn enabled(&self, schema: &SchemaFields) -> bool {
        match self {
            SchemaField::Filename => schema.filename,
            SchemaField::Bucket => schema.bucket,
            SchemaField::Path => schema.path,
            SchemaField::Etag => schema.etag,
        }
    }
}

/// Stores uploaded files in an S3 bucket and hands back where they went.
///
/// The adapter holds only read-only state, so one instance can serve any
/// number of concurrent uploads.
#[derive(Clone)]
pub struct S3Adapter {
    config: Arc<AdapterConfig>,
    client: Arc<dyn ObjectStorageClient>,
    generator: FilenameGenerator,
}

impl S3Adapter {
    pub const COMPATIBILITY_LEVEL: u32 = 1;

    /// Every optional field the adapter supports; all are strings.
    pub const SCHEMA_FIELDS: [SchemaField; 4] = [
        SchemaField::Filename,
        SchemaField::Bucket,
        SchemaField::Path,
        SchemaField::Etag,
    ];

    pub fn schema_field_defaults() -> SchemaFields {
        SchemaFields::default()
    }

    pub fn new(config: AdapterConfig, client: Arc<dyn ObjectStorageClient>) -> Self {
        let generator = FilenameGenerator::new(config.naming.strategy());
        info!(
            "S3 adapter ready: bucket={}, region={}, path='{}', acl={}",
            config.bucket,
            config.region,
            config.path,
            config.acl.as_str()
        );
        Self {
            config: Arc::new(config),
            client,
            generator,
        }
    }

    /// Build an adapter from caller options and schema hints.
    pub fn construct(
        options: AdapterOptions,
        defaults: StorageDefaults,
        schema: SchemaFields,
        client: Arc<dyn ObjectStorageClient>,
    ) -> AdapterResult<Self> {
        let config = AdapterConfig::build(options, defaults, schema)?;
        Ok(Self::new(config, client))
    }

    /// Replace the configured naming strategy with a custom one.
    pub fn with_naming_strategy(mut self, strategy: Arc<dyn NamingStrategy>) -> Self {
        self.generator = FilenameGenerator::new(strategy);
        self
    }

    /// Upload `file` and return a new descriptor carrying its remote location.
    ///
    /// The input is left untouched and so is the local source file.
    pub async fn upload_file(&self, file: &FileDescriptor) -> AdapterResult<FileDescriptor> {
        let local_path = file.local_path.as_deref().ok_or_else(|| {
            AdapterError::InvalidState(format!(
                "'{}' has no local source to upload",
                file.original_name
            ))
        })?;

        let filename = self.generator.generate(file, 0).await?;
        let path = self.config.path.clone();
        let key = join_key(&path, &filename);
        let headers = compose_headers(&self.config.headers, file);

        debug!(
            "Uploading {} ({} bytes, {}) to {}/{}",
            file.original_name, file.size, file.mime_type, self.config.bucket, key
        );

        let receipt = self
            .client
            .upload_file(ObjectUpload {
                local_path,
                bucket: &self.config.bucket,
                key: &key,
                size: file.size,
                headers: &headers,
                acl: self.config.acl,
            })
            .await
            .map_err(|e| {
                error!("Unable to upload {}/{}: {:?}", self.config.bucket, key, e);
                AdapterError::Upload {
                    key: key.clone(),
                    source: e,
                }
            })?;

        info!("Stored {} as {}/{}", file.original_name, self.config.bucket, key);

        let schema = &self.config.schema;
        Ok(FileDescriptor {
            local_path: None,
            size: file.size,
            mime_type: file.mime_type.clone(),
            original_name: file.original_name.clone(),
            path: Some(path),
            filename: Some(filename),
            key: Some(key),
            bucket: schema.bucket.then(|| self.config.bucket.clone()),
            etag: if schema.etag { receipt.etag } else { None },
        })
    }

    /// Public URL of a stored file. Fails if the descriptor was never uploaded.
    pub fn get_file_url(&self, file: &FileDescriptor) -> AdapterResult<String> {
        let key = file.stored_key().ok_or_else(|| {
            AdapterError::InvalidState(format!(
                "'{}' has no storage key; it was never uploaded",
                file.original_name
            ))
        })?;
        Ok(self
            .client
            .public_url(&self.config.bucket, key, &self.config.region))
    }

    /// The fields of a stored descriptor that the caller's schema persists.
    pub fn record(&self, file: &FileDescriptor) -> AdapterResult<Value> {
        let key = file.stored_key().ok_or_else(|| {
            AdapterError::InvalidState(format!(
                "'{}' cannot be recorded before it is uploaded",
                file.original_name
            ))
        })?;

        let mut record = Map::new();
        record.insert("key".to_string(), json!(key));
        record.insert("size".to_string(), json!(file.size));
        record.insert("mimetype".to_string(), json!(file.mime_type));
        record.insert("originalname".to_string(), json!(file.original_name));

        for field in Self::SCHEMA_FIELDS {
            if !field.enabled(&self.config.schema) {
                continue;
            }
            let value = match field {
                SchemaField::Filename => file.filename.clone(),
                SchemaField::Bucket => Some(self.config.bucket.clone()),
                SchemaField::Path => file.path.clone(),
                SchemaField::Etag => file.etag.clone(),
            };
            if let Some(value) = value {
                record.insert(field.name().to_string(), Value::String(value));
            }
        }

        Ok(Value::Object(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_descriptor() {
        assert_eq!(S3Adapter::COMPATIBILITY_LEVEL, 1);
        let names: Vec<_> = S3Adapter::SCHEMA_FIELDS.iter().map(|f| f.name()).collect();
        assert_eq!(names, vec!["filename", "bucket", "path", "etag"]);

        let defaults = S3Adapter::schema_field_defaults();
        assert!(defaults.filename);
        assert!(!defaults.bucket);
        assert!(!defaults.path);
        assert!(!defaults.etag);
    }

    #[test]
    fn test_field_enabled_follows_schema() {
        let schema = SchemaFields {
            filename: false,
            bucket: true,
            path: false,
            etag: true,
        };
        assert!(!SchemaField::Filename.enabled(&schema));
        assert!(SchemaField::Bucket.enabled(&schema));
        assert!(SchemaField::Etag.enabled(&schema));
    }
}
