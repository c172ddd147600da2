use crate::shared::error::AppError;
use async_trait::async_trait;
use bytes::Bytes;

/// バケット単位のオブジェクトストレージ。
#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// 保存したオブジェクトのパスを返す。同じパスは上書きされる。
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<String, AppError>;

    async fn download(&self, bucket: &str, path: &str) -> Result<Bytes, AppError>;

    fn public_url(&self, bucket: &str, path: &str) -> String;
}

/// アップロード対象の画像データ。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub bytes: Bytes,
    pub content_type: String,
}

impl ImageUpload {
    pub fn jpeg(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
            content_type: "image/jpeg".to_string(),
        }
    }

    /// Content-Type から拡張子を決める。不明なら jpeg。
    pub fn extension(&self) -> &'static str {
        match self.content_type.as_str() {
            "image/png" => "png",
            "image/webp" => "webp",
            "image/gif" => "gif",
            "image/heic" => "heic",
            _ => "jpeg",
        }
    }
}
