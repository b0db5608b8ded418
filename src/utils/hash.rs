use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::io::AsyncReadExt;

pub fn calculate_hash(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

pub async fn calculate_hash_from_reader<R: tokio::io::AsyncRead + Unpin>(
    mut reader: R,
) -> anyhow::Result<String> {
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];
    loop {
        let n = reader.read(&mut buffer).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// SHA-256 of a local file, streamed so large uploads are not buffered.
pub async fn calculate_file_hash(path: &Path) -> anyhow::Result<String> {
    let file = tokio::fs::File::open(path).await?;
    calculate_hash_from_reader(tokio::io::BufReader::new(file)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    const HELLO_WORLD: &str = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";

    #[test]
    fn test_calculate_hash() {
        assert_eq!(calculate_hash(b"hello world"), HELLO_WORLD);
    }

    #[tokio::test]
    async fn test_calculate_hash_from_reader() {
        let data: &[u8] = b"hello world";
        let hash = calculate_hash_from_reader(data).await.unwrap();
        assert_eq!(hash, HELLO_WORLD);
    }

    #[tokio::test]
    async fn test_calculate_file_hash() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("greeting.txt");
        tokio::fs::write(&path, b"hello world").await.unwrap();
        assert_eq!(calculate_file_hash(&path).await.unwrap(), HELLO_WORLD);
    }
}
