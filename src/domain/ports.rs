use crate::domain::model::{Backend, BoundingBox, EncodedImage, ImagePart};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::path::Path;

pub trait Storage: Send + Sync {
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn backend(&self) -> Backend;
    fn project(&self) -> Option<&str>;
    fn location(&self) -> &str;
    fn model(&self) -> &str;
    fn api_key(&self) -> Option<&str>;
    fn access_token(&self) -> Option<&str>;
    fn output_dir(&self) -> &str;
    fn font_path(&self) -> Option<&str>;

    /// Overrides the service root URL (scheme and host) for the selected backend
    fn base_url(&self) -> Option<&str> {
        None
    }
}

/// Turns a prepared image into the image part of a generate request
#[async_trait]
pub trait ImageSource: Send + Sync {
    async fn image_part(&self, image: &EncodedImage) -> Result<ImagePart>;
}

#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(&self, file_path: &Path) -> Result<Vec<BoundingBox>>;
}
