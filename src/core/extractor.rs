use crate::adapters::gemini::{
    Content, GenerateContentRequest, GenerationConfig, GenerativeClient, Part,
};
use crate::adapters::image_source::image_source_for;
use crate::config::ExtractorSettings;
use crate::core::response::parse_response;
use crate::domain::model::{BoundingBox, EncodedImage};
use crate::domain::ports::{ConfigProvider, Extractor};
use crate::utils::error::Result;
use crate::utils::imaging::{encode_jpeg, load_image};
use crate::utils::validation::Validate;
use async_trait::async_trait;
use reqwest::Client;
use std::path::Path;
use std::sync::Arc;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-preview-04-17";

pub const DETECTION_PROMPT: &str = "Detect text and tissue with no more than 20 items. Output a json list where each entry contains the 2D bounding box in \"box_2d\" and tissue/text in \"label\".";

/// Extraction client: one image in, normalized boxes out
pub struct GeminiExtractor<C: ConfigProvider> {
    config: C,
    client: Client,
}

impl<C: ConfigProvider> GeminiExtractor<C> {
    pub fn new(config: C) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }

    pub fn with_client(config: C, client: Client) -> Self {
        Self { config, client }
    }
}

/// Decode the image and prepare its JPEG re-encoding
pub fn prepare_image(file_path: &Path) -> Result<EncodedImage> {
    let loaded = load_image(file_path)?;
    let jpeg = encode_jpeg(&loaded.image)?;
    let source_mime_type = loaded
        .format
        .map(|format| format.to_mime_type())
        .unwrap_or("application/octet-stream")
        .to_string();

    Ok(EncodedImage {
        path: file_path.to_path_buf(),
        width: loaded.image.width(),
        height: loaded.image.height(),
        jpeg,
        source_mime_type,
    })
}

pub fn build_request(image: Part) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![Content {
            role: Some("user".to_string()),
            parts: vec![image, Part::text(DETECTION_PROMPT)],
        }],
        generation_config: GenerationConfig {
            temperature: 0.0,
            response_mime_type: "text/plain".to_string(),
        },
    }
}

#[async_trait]
impl<C: ConfigProvider> Extractor for GeminiExtractor<C> {
    async fn extract(&self, file_path: &Path) -> Result<Vec<BoundingBox>> {
        // 先解碼圖片，失敗時不發出任何網路請求
        let image = prepare_image(file_path)?;
        tracing::debug!(
            "Prepared {}x{} image ({} JPEG bytes)",
            image.width,
            image.height,
            image.jpeg.len()
        );

        let client = Arc::new(GenerativeClient::connect(self.client.clone(), &self.config).await?);
        let source = image_source_for(self.config.backend(), Arc::clone(&client));
        let image_part = source.image_part(&image).await?;

        let model = self.config.model();
        let request = build_request(image_part.into());

        tracing::info!("Sending request to Gemini {}...", model);
        let response = client.generate_content(model, &request).await?;
        tracing::info!("Received response from Gemini {}.", model);

        parse_response(&response.text())
    }
}

/// Run a single extraction with settings taken from the environment
///
/// `project` and `location` override `GOOGLE_CLOUD_PROJECT` and
/// `GOOGLE_CLOUD_LOCATION` when given.
pub async fn extract(
    file_path: impl AsRef<Path>,
    project: Option<String>,
    location: Option<String>,
) -> Result<Vec<BoundingBox>> {
    let settings = ExtractorSettings::from_env(project, location);
    settings.validate()?;
    GeminiExtractor::new(settings)
        .extract(file_path.as_ref())
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::ImagePart;
    use serde_json::json;

    #[test]
    fn test_build_request_shape() {
        let request = build_request(
            ImagePart::Inline {
                mime_type: "image/jpeg".to_string(),
                data: vec![0xFF],
            }
            .into(),
        );

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["contents"][0]["role"], "user");
        assert_eq!(value["contents"][0]["parts"][0]["inlineData"]["data"], "/w==");
        assert_eq!(value["contents"][0]["parts"][1]["text"], DETECTION_PROMPT);
        assert_eq!(
            value["generationConfig"],
            json!({"temperature": 0.0, "responseMimeType": "text/plain"})
        );
    }

    #[test]
    fn test_prepare_image_rejects_missing_file() {
        let err = prepare_image(Path::new("/nonexistent/slide.png")).unwrap_err();
        assert!(matches!(
            err,
            crate::utils::error::ExtractError::ImageDecodeError { .. }
        ));
    }
}
