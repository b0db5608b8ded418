use crate::config::{AccessPolicy, ClientTuning, DEFAULT_REGION};
use crate::services::headers::{HeaderMap, ObjectHeaders};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart, ObjectCannedAcl};
use futures::{StreamExt, TryStreamExt, stream};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use std::io::SeekFrom;
use std::path::Path;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

/// Characters left alone when a key is placed in a URL path. Mirrors
/// `encodeURI` with `!'()*` escaped as well.
const KEY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'/')
    .remove(b';')
    .remove(b',')
    .remove(b'?')
    .remove(b':')
    .remove(b'@')
    .remove(b'&')
    .remove(b'=')
    .remove(b'+')
    .remove(b'$')
    .remove(b'#');

/// One object write, described by reference so the orchestrator keeps
/// ownership of everything.
#[derive(Debug, Clone, Copy)]
pub struct ObjectUpload<'a> {
    pub local_path: &'a Path,
    pub bucket: &'a str,
    pub key: &'a str,
    pub size: u64,
    pub headers: &'a HeaderMap,
    pub acl: AccessPolicy,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadReceipt {
    pub etag: Option<String>,
}

/// Remote object store the adapter writes to.
#[async_trait]
pub trait ObjectStorageClient: Send + Sync {
    async fn upload_file(&self, upload: ObjectUpload<'_>) -> Result<UploadReceipt>;

    fn public_url(&self, bucket: &str, key: &str, region: &str) -> String;
}

/// Public URL for an object.
///
/// With a custom endpoint the URL is path style under that endpoint, otherwise
/// it points at the regional AWS host (`s3` for us-east-1, `s3-<region>`
/// elsewhere).
pub fn public_url(bucket: &str, key: &str, region: &str, endpoint: Option<&str>) -> String {
    let encoded_key = utf8_percent_encode(key, KEY_ENCODE_SET);
    match endpoint {
        Some(endpoint) => format!(
            "{}/{}/{}",
            endpoint.trim_end_matches('/'),
            bucket,
            encoded_key
        ),
        None => {
            let host = if region.is_empty() || region == DEFAULT_REGION {
                "s3".to_string()
            } else {
                format!("s3-{}", region)
            };
            format!("https://{}.amazonaws.com/{}/{}", host, bucket, encoded_key)
        }
    }
}

/// Whether an object of `size` bytes goes through a multipart upload.
pub fn uses_multipart(size: u64, threshold: u64) -> bool {
    size > 0 && size >= threshold
}

/// `(part_number, offset, length)` for each part of a `size`-byte object.
/// Part numbers start at 1 and only the last part may be short.
pub fn part_ranges(size: u64, part_size: u64) -> impl Iterator<Item = (i32, u64, u64)> {
    (0..size.div_ceil(part_size)).map(move |index| {
        let offset = index * part_size;
        (index as i32 + 1, offset, part_size.min(size - offset))
    })
}

pub struct S3ObjectClient {
    client: Client,
    tuning: ClientTuning,
    endpoint: Option<String>,
}

impl S3ObjectClient {
    pub fn new(client: Client, tuning: ClientTuning, endpoint: Option<String>) -> Self {
        Self {
            client,
            tuning,
            endpoint,
        }
    }

    async fn put_object(
        &self,
        upload: &ObjectUpload<'_>,
        headers: &ObjectHeaders,
    ) -> Result<UploadReceipt> {
        let body = ByteStream::from_path(upload.local_path).await?;
        let extra = headers.extra.clone();

        let res = self
            .client
            .put_object()
            .bucket(upload.bucket)
            .key(upload.key)
            .acl(ObjectCannedAcl::from(upload.acl.as_str()))
            .body(body)
            .set_content_length(headers.content_length)
            .set_content_type(headers.content_type.clone())
            .set_cache_control(headers.cache_control.clone())
            .set_content_disposition(headers.content_disposition.clone())
            .set_content_encoding(headers.content_encoding.clone())
            .set_content_language(headers.content_language.clone())
            .set_metadata(headers.metadata())
            .customize()
            .mutate_request(move |req| {
                for (name, value) in &extra {
                    req.headers_mut().insert(name.clone(), value.clone());
                }
            })
            .send()
            .await?;

        Ok(UploadReceipt {
            etag: res.e_tag().map(str::to_string),
        })
    }

    async fn multipart_upload(
        &self,
        upload: &ObjectUpload<'_>,
        headers: &ObjectHeaders,
    ) -> Result<UploadReceipt> {
        let extra = headers.extra.clone();
        let multipart_upload_res = self
            .client
            .create_multipart_upload()
            .bucket(upload.bucket)
            .key(upload.key)
            .acl(ObjectCannedAcl::from(upload.acl.as_str()))
            .set_content_type(headers.content_type.clone())
            .set_cache_control(headers.cache_control.clone())
            .set_content_disposition(headers.content_disposition.clone())
            .set_content_encoding(headers.content_encoding.clone())
            .set_content_language(headers.content_language.clone())
            .set_metadata(headers.metadata())
            .customize()
            .mutate_request(move |req| {
                for (name, value) in &extra {
                    req.headers_mut().insert(name.clone(), value.clone());
                }
            })
            .send()
            .await?;

        let upload_id = multipart_upload_res
            .upload_id()
            .ok_or_else(|| anyhow!("No upload ID"))?;

        match self.upload_parts(upload, upload_id).await {
            Ok(parts) => {
                let completed_multipart_upload = CompletedMultipartUpload::builder()
                    .set_parts(Some(parts))
                    .build();

                let res = self
                    .client
                    .complete_multipart_upload()
                    .bucket(upload.bucket)
                    .key(upload.key)
                    .upload_id(upload_id)
                    .multipart_upload(completed_multipart_upload)
                    .send()
                    .await?;

                Ok(UploadReceipt {
                    etag: res.e_tag().map(str::to_string),
                })
            }
            Err(e) => {
                if let Err(abort_err) = self
                    .client
                    .abort_multipart_upload()
                    .bucket(upload.bucket)
                    .key(upload.key)
                    .upload_id(upload_id)
                    .send()
                    .await
                {
                    tracing::warn!(
                        "Failed to abort multipart upload {} for {}/{}: {:?}",
                        upload_id,
                        upload.bucket,
                        upload.key,
                        abort_err
                    );
                }
                Err(e)
            }
        }
    }

    async fn upload_parts(
        &self,
        upload: &ObjectUpload<'_>,
        upload_id: &str,
    ) -> Result<Vec<CompletedPart>> {
        let ranges = part_ranges(upload.size, self.tuning.multipart_upload_size);

        let mut parts: Vec<CompletedPart> = stream::iter(ranges)
            .map(|(part_number, offset, length)| {
                self.upload_part(upload, upload_id, part_number, offset, length)
            })
            .buffer_unordered(self.tuning.max_async_s3)
            .try_collect()
            .await?;

        parts.sort_by_key(|p| p.part_number());
        Ok(parts)
    }

    async fn upload_part(
        &self,
        upload: &ObjectUpload<'_>,
        upload_id: &str,
        part_number: i32,
        offset: u64,
        length: u64,
    ) -> Result<CompletedPart> {
        let mut file = tokio::fs::File::open(upload.local_path).await?;
        file.seek(SeekFrom::Start(offset)).await?;
        let mut buffer = vec![0u8; length as usize];
        file.read_exact(&mut buffer).await?;

        tracing::debug!(
            "Uploading part {} of {} ({} bytes at offset {})",
            part_number,
            upload.key,
            length,
            offset
        );

        let upload_part_res = self
            .client
            .upload_part()
            .bucket(upload.bucket)
            .key(upload.key)
            .upload_id(upload_id)
            .body(ByteStream::from(buffer))
            .part_number(part_number)
            .send()
            .await?;

        Ok(CompletedPart::builder()
            .e_tag(upload_part_res.e_tag().unwrap_or_default())
            .part_number(part_number)
            .build())
    }
}

#[async_trait]
impl ObjectStorageClient for S3ObjectClient {
    async fn upload_file(&self, upload: ObjectUpload<'_>) -> Result<UploadReceipt> {
        let headers = ObjectHeaders::from_map(upload.headers);

        if uses_multipart(upload.size, self.tuning.multipart_upload_threshold) {
            self.multipart_upload(&upload, &headers).await
        } else {
            self.put_object(&upload, &headers).await
        }
    }

    fn public_url(&self, bucket: &str, key: &str, region: &str) -> String {
        public_url(bucket, key, region, self.endpoint.as_deref())
    }
}
