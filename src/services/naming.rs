use crate::error::{AdapterError, AdapterResult};
use crate::models::FileDescriptor;
use crate::utils::hash::calculate_file_hash;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

const MAX_FILENAME_BYTES: usize = 255;

/// Assigns remote basenames to incoming files.
///
/// `attempt` starts at 0; callers that detect a collision ask again with the
/// next index. Implementations never loop on their own.
#[async_trait]
pub trait NamingStrategy: Send + Sync {
    async fn generate(&self, file: &FileDescriptor, attempt: u32) -> Result<String>;
}

/// 128 random bits, hex encoded, followed by the original extension.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomFilename;

#[async_trait]
impl NamingStrategy for RandomFilename {
    async fn generate(&self, file: &FileDescriptor, _attempt: u32) -> Result<String> {
        let mut name = Uuid::new_v4().simple().to_string();
        if let Some(ext) = file.extension() {
            name.push_str(&ext);
        }
        Ok(name)
    }
}

/// Keeps the caller-supplied name, made safe for use as an object basename.
/// Retries append `-<attempt>` before the extension.
#[derive(Debug, Clone, Copy, Default)]
pub struct OriginalFilename;

#[async_trait]
impl NamingStrategy for OriginalFilename {
    async fn generate(&self, file: &FileDescriptor, attempt: u32) -> Result<String> {
        let sanitized = sanitize_filename(&file.original_name);
        if sanitized.is_empty() {
            return Err(anyhow!(
                "original name '{}' has no usable characters",
                file.original_name
            ));
        }
        if attempt == 0 {
            return Ok(sanitized);
        }

        let path = Path::new(&sanitized);
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&sanitized);
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) => Ok(format!("{}-{}.{}", stem, attempt, ext)),
            None => Ok(format!("{}-{}", stem, attempt)),
        }
    }
}

/// SHA-256 of the file contents plus the original extension, so identical
/// uploads share a name.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentHashFilename;

#[async_trait]
impl NamingStrategy for ContentHashFilename {
    async fn generate(&self, file: &FileDescriptor, _attempt: u32) -> Result<String> {
        let local_path = file
            .local_path
            .as_deref()
            .ok_or_else(|| anyhow!("content hash naming needs the local file"))?;
        let mut name = calculate_file_hash(local_path).await?;
        if let Some(ext) = file.extension() {
            name.push_str(&ext);
        }
        Ok(name)
    }
}

/// Lifts a synchronous naming function into a [`NamingStrategy`].
pub struct SyncStrategy<F> {
    func: F,
}

impl<F> SyncStrategy<F>
where
    F: Fn(&FileDescriptor, u32) -> Result<String> + Send + Sync,
{
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

#[async_trait]
impl<F> NamingStrategy for SyncStrategy<F>
where
    F: Fn(&FileDescriptor, u32) -> Result<String> + Send + Sync,
{
    async fn generate(&self, file: &FileDescriptor, attempt: u32) -> Result<String> {
        (self.func)(file, attempt)
    }
}

/// Built-in strategies selectable from configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NamingKind {
    #[default]
    Random,
    Original,
    ContentHash,
}

impl NamingKind {
    pub fn strategy(self) -> Arc<dyn NamingStrategy> {
        match self {
            NamingKind::Random => Arc::new(RandomFilename),
            NamingKind::Original => Arc::new(OriginalFilename),
            NamingKind::ContentHash => Arc::new(ContentHashFilename),
        }
    }
}

impl std::str::FromStr for NamingKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "random" => Ok(NamingKind::Random),
            "original" => Ok(NamingKind::Original),
            "content-hash" | "contenthash" => Ok(NamingKind::ContentHash),
            other => Err(format!("unknown naming strategy '{}'", other)),
        }
    }
}

/// Front for whichever strategy the adapter was configured with.
#[derive(Clone)]
pub struct FilenameGenerator {
    strategy: Arc<dyn NamingStrategy>,
}

impl FilenameGenerator {
    pub fn new(strategy: Arc<dyn NamingStrategy>) -> Self {
        Self { strategy }
    }

    pub async fn generate(&self, file: &FileDescriptor, attempt: u32) -> AdapterResult<String> {
        let name = self
            .strategy
            .generate(file, attempt)
            .await
            .map_err(AdapterError::Generation)?;

        if name.is_empty() {
            return Err(AdapterError::Generation(anyhow!(
                "naming strategy returned an empty filename"
            )));
        }
        if name.contains('/') {
            return Err(AdapterError::Generation(anyhow!(
                "generated filename '{}' contains a path separator",
                name
            )));
        }
        Ok(name)
    }
}

impl Default for FilenameGenerator {
    fn default() -> Self {
        Self::new(Arc::new(RandomFilename))
    }
}

impl std::fmt::Debug for FilenameGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilenameGenerator").finish_non_exhaustive()
    }
}

/// Strips any directory component and replaces control and reserved
/// characters with `_`. Unicode is kept; leading dots and surrounding
/// whitespace are dropped so the object is never hidden.
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);

    let sanitized: String = base
        .chars()
        .map(|c| {
            if c.is_control()
                || c == ':'
                || c == '*'
                || c == '?'
                || c == '"'
                || c == '<'
                || c == '>'
                || c == '|'
                || c == ';'
            {
                '_'
            } else {
                c
            }
        })
        .collect();
    let sanitized = sanitized.trim().trim_start_matches('.').trim_start();

    // Limit length safely for UTF-8
    if sanitized.len() > MAX_FILENAME_BYTES {
        let mut end = MAX_FILENAME_BYTES;
        while !sanitized.is_char_boundary(end) {
            end -= 1;
        }
        sanitized[..end].to_string()
    } else {
        sanitized.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png() -> FileDescriptor {
        FileDescriptor::new("/tmp/upload_1", 42, "image/png", "My Photo.png")
    }

    #[tokio::test]
    async fn test_random_filename_keeps_extension() {
        let a = RandomFilename.generate(&png(), 0).await.unwrap();
        let b = RandomFilename.generate(&png(), 0).await.unwrap();
        assert!(a.ends_with(".png"));
        assert_eq!(a.len(), 32 + ".png".len());
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_random_filename_ignores_original_name() {
        let name = RandomFilename.generate(&png(), 0).await.unwrap();
        assert!(!name.contains("Photo"));
    }

    #[tokio::test]
    async fn test_original_filename_attempts() {
        assert_eq!(
            OriginalFilename.generate(&png(), 0).await.unwrap(),
            "My Photo.png"
        );
        assert_eq!(
            OriginalFilename.generate(&png(), 2).await.unwrap(),
            "My Photo-2.png"
        );

        let file = FileDescriptor::new("/tmp/x", 1, "text/plain", "notes");
        assert_eq!(OriginalFilename.generate(&file, 1).await.unwrap(), "notes-1");
    }

    #[tokio::test]
    async fn test_original_filename_rejects_empty() {
        let file = FileDescriptor::new("/tmp/x", 1, "text/plain", "../..");
        assert!(OriginalFilename.generate(&file, 0).await.is_err());
    }

    #[tokio::test]
    async fn test_content_hash_filename() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("upload");
        tokio::fs::write(&path, b"hello world").await.unwrap();

        let file = FileDescriptor::new(&path, 11, "text/plain", "greeting.TXT");
        let name = ContentHashFilename.generate(&file, 0).await.unwrap();
        assert_eq!(
            name,
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9.txt"
        );
    }

    #[tokio::test]
    async fn test_sync_strategy_sees_attempt() {
        let strategy = SyncStrategy::new(|file: &FileDescriptor, attempt: u32| {
            Ok(format!("{}-{}", file.size, attempt))
        });
        assert_eq!(strategy.generate(&png(), 3).await.unwrap(), "42-3");
    }

    #[tokio::test]
    async fn test_generator_wraps_strategy_failure() {
        let generator = FilenameGenerator::new(Arc::new(SyncStrategy::new(
            |_: &FileDescriptor, _: u32| Err(anyhow!("name service down")),
        )));
        let err = generator.generate(&png(), 0).await.unwrap_err();
        assert!(err.is_generation());
        assert!(err.to_string().contains("name service down"));
    }

    #[tokio::test]
    async fn test_generator_rejects_unusable_names() {
        let generator = FilenameGenerator::new(Arc::new(SyncStrategy::new(
            |_: &FileDescriptor, _: u32| Ok("nested/name.png".to_string()),
        )));
        assert!(generator.generate(&png(), 0).await.unwrap_err().is_generation());

        let generator = FilenameGenerator::new(Arc::new(SyncStrategy::new(
            |_: &FileDescriptor, _: u32| Ok(String::new()),
        )));
        assert!(generator.generate(&png(), 0).await.unwrap_err().is_generation());
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("My Photo.png"), "My Photo.png");
        assert_eq!(sanitize_filename("test<script>.pdf"), "test_script_.pdf");
        assert_eq!(sanitize_filename("日本.png"), "日本.png");
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("..\\..\\windows\\system32"), "system32");
        assert_eq!(sanitize_filename(".htaccess"), "htaccess");
        assert_eq!(sanitize_filename("..."), "");
    }

    #[test]
    fn test_sanitize_filename_truncates_on_char_boundary() {
        let long = "é".repeat(200);
        let sanitized = sanitize_filename(&long);
        assert!(sanitized.len() <= MAX_FILENAME_BYTES);
        assert_eq!(sanitized.chars().count(), 127);
    }

    #[tokio::test]
    async fn test_original_filename_keeps_unicode_extension() {
        let file = FileDescriptor::new("/tmp/x", 1, "image/png", "日本.png");
        assert_eq!(OriginalFilename.generate(&file, 0).await.unwrap(), "日本.png");
        assert_eq!(OriginalFilename.generate(&file, 1).await.unwrap(), "日本-1.png");
    }

    #[test]
    fn test_naming_kind_from_str() {
        assert_eq!("random".parse::<NamingKind>(), Ok(NamingKind::Random));
        assert_eq!("Content-Hash".parse::<NamingKind>(), Ok(NamingKind::ContentHash));
        assert!("sequential".parse::<NamingKind>().is_err());
    }
}
