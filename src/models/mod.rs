use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A file on its way into object storage, or one that already lives there.
///
/// Incoming descriptors carry `local_path`, `size`, `mime_type` and
/// `original_name`. A successful upload produces a fresh descriptor with
/// `path`, `filename` and `key` populated and `local_path` cleared; the input is
/// never modified.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDescriptor {
    #[serde(skip)]
    pub local_path: Option<PathBuf>,
    pub size: u64,
    #[serde(rename = "mimetype")]
    pub mime_type: String,
    #[serde(rename = "originalname")]
    pub original_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
}

impl FileDescriptor {
    pub fn new(
        local_path: impl Into<PathBuf>,
        size: u64,
        mime_type: impl Into<String>,
        original_name: impl Into<String>,
    ) -> Self {
        Self {
            local_path: Some(local_path.into()),
            size,
            mime_type: mime_type.into(),
            original_name: original_name.into(),
            ..Default::default()
        }
    }

    /// Builds a descriptor from a file on disk, reading its size from metadata.
    pub async fn from_local_file(
        local_path: impl AsRef<Path>,
        mime_type: impl Into<String>,
        original_name: impl Into<String>,
    ) -> std::io::Result<Self> {
        let local_path = local_path.as_ref();
        let metadata = tokio::fs::metadata(local_path).await?;
        Ok(Self::new(
            local_path,
            metadata.len(),
            mime_type,
            original_name,
        ))
    }

    /// Extension of the caller-supplied name including the leading dot, if any.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.original_name)
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| !e.is_empty())
            .map(|e| format!(".{}", e.to_lowercase()))
    }

    /// Remote key once the file has been uploaded. An empty key counts as
    /// never stored.
    pub fn stored_key(&self) -> Option<&str> {
        self.key.as_deref().filter(|k| !k.is_empty())
    }
}
