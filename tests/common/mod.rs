#![allow(dead_code)]

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use s3_file_adapter::services::headers::HeaderMap;
use s3_file_adapter::services::storage::public_url;
use s3_file_adapter::{
    AccessPolicy, AdapterOptions, FileDescriptor, ObjectStorageClient, ObjectUpload, S3Adapter,
    SchemaFields, StorageDefaults, UploadReceipt,
};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// What the fake client saw for one upload.
#[derive(Debug, Clone)]
pub struct RecordedUpload {
    pub local_path: PathBuf,
    pub bucket: String,
    pub key: String,
    pub size: u64,
    pub headers: HeaderMap,
    pub acl: AccessPolicy,
    pub body: Vec<u8>,
}

/// In-memory object store that records writes and can be told to fail.
#[derive(Default)]
pub struct MemoryStorageClient {
    pub uploads: Mutex<Vec<RecordedUpload>>,
    pub fail_with: Option<String>,
}

impl MemoryStorageClient {
    pub fn failing(message: &str) -> Self {
        Self {
            uploads: Mutex::new(Vec::new()),
            fail_with: Some(message.to_string()),
        }
    }

    pub fn recorded(&self) -> Vec<RecordedUpload> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStorageClient for MemoryStorageClient {
    async fn upload_file(&self, upload: ObjectUpload<'_>) -> Result<UploadReceipt> {
        if let Some(message) = &self.fail_with {
            return Err(anyhow!(message.clone()));
        }

        let body = tokio::fs::read(upload.local_path).await?;
        let etag = format!("\"{}\"", &s3_file_adapter::utils::hash::calculate_hash(&body)[..32]);
        self.uploads.lock().unwrap().push(RecordedUpload {
            local_path: upload.local_path.to_path_buf(),
            bucket: upload.bucket.to_string(),
            key: upload.key.to_string(),
            size: upload.size,
            headers: upload.headers.clone(),
            acl: upload.acl,
            body,
        });
        Ok(UploadReceipt { etag: Some(etag) })
    }

    fn public_url(&self, bucket: &str, key: &str, region: &str) -> String {
        public_url(bucket, key, region, None)
    }
}

pub fn defaults() -> StorageDefaults {
    StorageDefaults {
        key: Some("AKIAEXAMPLE".to_string()),
        secret: Some("secret".to_string()),
        bucket: Some("my-bucket".to_string()),
        region: Some("us-east-1".to_string()),
        endpoint: None,
    }
}

pub fn adapter_with(
    options: AdapterOptions,
    schema: SchemaFields,
    client: Arc<MemoryStorageClient>,
) -> S3Adapter {
    S3Adapter::construct(options, defaults(), schema, client).unwrap()
}

pub fn images_options() -> AdapterOptions {
    AdapterOptions {
        path: Some("/images".to_string()),
        ..Default::default()
    }
}

/// Writes `contents` to a temp file and describes it as an upload.
pub async fn temp_upload(
    dir: &TempDir,
    name: &str,
    mime_type: &str,
    contents: &[u8],
) -> FileDescriptor {
    let local = dir.path().join(format!("upload-{}", name));
    tokio::fs::write(&local, contents).await.unwrap();
    FileDescriptor::from_local_file(&local, mime_type, name)
        .await
        .unwrap()
}
