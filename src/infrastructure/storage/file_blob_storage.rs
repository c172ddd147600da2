use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use tracing::debug;

use crate::application::ports::BlobStorage;
use crate::shared::AppError;

/// `{root}/{bucket}/{path}` にオブジェクトを置くローカルストレージ。
pub struct FileBlobStorage {
    root_dir: PathBuf,
    public_base_url: String,
}

impl FileBlobStorage {
    pub async fn new(
        root_dir: PathBuf,
        public_base_url: impl Into<String>,
    ) -> Result<Self, AppError> {
        fs::create_dir_all(&root_dir)
            .await
            .map_err(|err| AppError::Storage(format!("Failed to create blob dir: {err}")))?;
        Ok(Self {
            root_dir,
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    fn resolve(&self, bucket: &str, path: &str) -> Result<PathBuf, AppError> {
        let bucket = relative_path(bucket)?;
        let path = relative_path(path)?;
        Ok(self.root_dir.join(bucket).join(path))
    }
}

/// 通常の名前だけで構成される相対パスに限る（`..` や絶対パスは拒否）。
fn relative_path(raw: &str) -> Result<&Path, AppError> {
    let path = Path::new(raw);
    let valid = !raw.is_empty()
        && path
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
    if valid {
        Ok(path)
    } else {
        Err(AppError::InvalidInput(format!("Invalid storage path: {raw}")))
    }
}

#[async_trait]
impl BlobStorage for FileBlobStorage {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<String, AppError> {
        let target = self.resolve(bucket, path)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|err| AppError::Storage(format!("Failed to create blob dir: {err}")))?;
        }
        fs::write(&target, &bytes)
            .await
            .map_err(|err| AppError::Storage(format!("Failed to write blob: {err}")))?;
        debug!(bucket, path, content_type, size = bytes.len(), "blob stored");
        Ok(path.to_string())
    }

    async fn download(&self, bucket: &str, path: &str) -> Result<Bytes, AppError> {
        let target = self.resolve(bucket, path)?;
        match fs::read(&target).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Err(AppError::NotFound(
                format!("Blob not found: {bucket}/{path}"),
            )),
            Err(err) => Err(AppError::Storage(format!("Failed to read blob: {err}"))),
        }
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/{bucket}/{path}", self.public_base_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn storage(dir: &TempDir) -> FileBlobStorage {
        FileBlobStorage::new(dir.path().join("blobs"), "https://cdn.example.com/storage/")
            .await
            .expect("storage")
    }

    #[tokio::test]
    async fn upload_then_download_round_trips() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir).await;

        let stored = storage
            .upload("avatars", "alice/1.png", Bytes::from_static(b"png"), "image/png")
            .await
            .expect("upload");
        assert_eq!(stored, "alice/1.png");
        assert!(storage.root_dir().join("avatars/alice/1.png").exists());

        let data = storage.download("avatars", "alice/1.png").await.expect("download");
        assert_eq!(&data[..], b"png");
        assert_eq!(
            storage.public_url("avatars", "alice/1.png"),
            "https://cdn.example.com/storage/avatars/alice/1.png"
        );
    }

    #[tokio::test]
    async fn traversal_and_missing_blobs_are_rejected() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir).await;

        let err = storage
            .upload("event", "../escape.jpeg", Bytes::new(), "image/jpeg")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
        let err = storage.download("event", "/etc/passwd").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
        let err = storage.download("event", "nope.jpeg").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
