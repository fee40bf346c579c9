use crate::adapters::gemini::GenerativeClient;
use crate::domain::model::{Backend, EncodedImage, ImagePart};
use crate::domain::ports::ImageSource;
use crate::utils::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Sends the JPEG re-encoding inside the request body
#[derive(Debug, Clone, Default)]
pub struct InlineImageSource;

#[async_trait]
impl ImageSource for InlineImageSource {
    async fn image_part(&self, image: &EncodedImage) -> Result<ImagePart> {
        Ok(ImagePart::Inline {
            mime_type: "image/jpeg".to_string(),
            data: image.jpeg.clone(),
        })
    }
}

/// Uploads the original file and references it by the returned URI
pub struct UploadedFileSource {
    client: Arc<GenerativeClient>,
}

impl UploadedFileSource {
    pub fn new(client: Arc<GenerativeClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ImageSource for UploadedFileSource {
    async fn image_part(&self, image: &EncodedImage) -> Result<ImagePart> {
        let data = tokio::fs::read(&image.path).await?;
        let display_name = image
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());

        let file = self
            .client
            .upload_file(data, &image.source_mime_type, &display_name)
            .await?;

        Ok(ImagePart::Remote {
            mime_type: file.mime_type,
            uri: file.uri,
        })
    }
}

pub fn image_source_for(backend: Backend, client: Arc<GenerativeClient>) -> Box<dyn ImageSource> {
    match backend {
        Backend::VertexAi => Box::new(InlineImageSource),
        Backend::GeminiApi => Box::new(UploadedFileSource::new(client)),
    }
}
