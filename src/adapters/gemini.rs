//! HTTP client and wire types for the `generateContent` API, served either by
//! Vertex AI or by the direct Gemini API.

use crate::domain::model::{Backend, ImagePart};
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{ExtractError, Result};
use crate::utils::validation::{validate_required_field, validate_url};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};

pub const GEMINI_API_BASE_URL: &str = "https://generativelanguage.googleapis.com";

const API_KEY_HEADER: &str = "x-goog-api-key";
const UPLOAD_URL_HEADER: &str = "x-goog-upload-url";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<Blob>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_data: Option<FileData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thought: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    pub mime_type: String,
    /// Base64 encoded bytes
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileData {
    pub mime_type: String,
    pub file_uri: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub response_mime_type: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadedFile {
    pub file: FileMetadata,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    pub uri: String,
    pub mime_type: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }
}

impl From<ImagePart> for Part {
    fn from(image: ImagePart) -> Self {
        match image {
            ImagePart::Inline { mime_type, data } => Self {
                inline_data: Some(Blob {
                    mime_type,
                    data: STANDARD.encode(data),
                }),
                ..Default::default()
            },
            ImagePart::Remote { mime_type, uri } => Self {
                file_data: Some(FileData {
                    mime_type,
                    file_uri: uri,
                }),
                ..Default::default()
            },
        }
    }
}

impl GenerateContentResponse {
    /// Text of the first candidate, thought parts excluded
    pub fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|candidate| candidate.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter(|part| part.thought != Some(true))
                    .filter_map(|part| part.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

/// Where requests go and how they authenticate
#[derive(Debug, Clone, PartialEq)]
pub enum Endpoint {
    VertexAi {
        base_url: String,
        project: String,
        location: String,
        access_token: String,
    },
    GeminiApi {
        base_url: String,
        api_key: String,
    },
}

impl Endpoint {
    pub fn generate_url(&self, model: &str) -> String {
        match self {
            Endpoint::VertexAi {
                base_url,
                project,
                location,
                ..
            } => format!(
                "{}/v1/projects/{}/locations/{}/publishers/google/models/{}:generateContent",
                base_url, project, location, model
            ),
            Endpoint::GeminiApi { base_url, .. } => {
                format!("{}/v1beta/models/{}:generateContent", base_url, model)
            }
        }
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            Endpoint::VertexAi { access_token, .. } => request.bearer_auth(access_token),
            Endpoint::GeminiApi { api_key, .. } => request.header(API_KEY_HEADER, api_key),
        }
    }
}

pub fn vertex_base_url(location: &str) -> String {
    if location == "global" {
        "https://aiplatform.googleapis.com".to_string()
    } else {
        format!("https://{}-aiplatform.googleapis.com", location)
    }
}

pub struct GenerativeClient {
    client: Client,
    endpoint: Endpoint,
}

impl GenerativeClient {
    pub fn new(client: Client, endpoint: Endpoint) -> Self {
        Self { client, endpoint }
    }

    /// Resolve the endpoint for the configured backend
    ///
    /// Fails with a configuration error when the project (Vertex AI) or the
    /// API key (Gemini API) is missing, and with an auth error when no access
    /// token can be obtained.
    pub async fn connect<C: ConfigProvider + ?Sized>(client: Client, config: &C) -> Result<Self> {
        let base_url = match config.base_url() {
            Some(url) => {
                validate_url("base_url", url)?;
                Some(url.trim_end_matches('/').to_string())
            }
            None => None,
        };

        let endpoint = match config.backend() {
            Backend::VertexAi => {
                let project = config.project().filter(|p| !p.trim().is_empty());
                let project = validate_required_field("project", &project)?;
                let location = config.location();
                let access_token = match config.access_token() {
                    Some(token) => token.to_string(),
                    None => gcloud_access_token().await?,
                };

                Endpoint::VertexAi {
                    base_url: base_url.unwrap_or_else(|| vertex_base_url(location)),
                    project: project.to_string(),
                    location: location.to_string(),
                    access_token,
                }
            }
            Backend::GeminiApi => {
                let api_key = config.api_key().filter(|k| !k.trim().is_empty());
                let api_key = validate_required_field("api_key", &api_key)?;

                Endpoint::GeminiApi {
                    base_url: base_url.unwrap_or_else(|| GEMINI_API_BASE_URL.to_string()),
                    api_key: api_key.to_string(),
                }
            }
        };

        Ok(Self::new(client, endpoint))
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse> {
        let url = self.endpoint.generate_url(model);
        tracing::debug!("Making generateContent request to: {}", url);

        let response = self
            .endpoint
            .authorize(self.client.post(&url))
            .json(request)
            .send()
            .await?;

        tracing::debug!("API response status: {}", response.status());
        let response = ensure_success(response).await?;
        let body = response.bytes().await?;

        Ok(serde_json::from_slice(&body)?)
    }

    /// Upload a file with the resumable protocol and return its metadata
    pub async fn upload_file(
        &self,
        data: Vec<u8>,
        mime_type: &str,
        display_name: &str,
    ) -> Result<FileMetadata> {
        let base_url = match &self.endpoint {
            Endpoint::GeminiApi { base_url, .. } => base_url,
            Endpoint::VertexAi { .. } => {
                return Err(ExtractError::UploadError {
                    message: "file upload is only available on the Gemini API backend"
                        .to_string(),
                })
            }
        };

        // 第一步：建立上傳 session
        let start = self
            .endpoint
            .authorize(self.client.post(format!("{}/upload/v1beta/files", base_url)))
            .header("x-goog-upload-protocol", "resumable")
            .header("x-goog-upload-command", "start")
            .header("x-goog-upload-header-content-length", data.len().to_string())
            .header("x-goog-upload-header-content-type", mime_type)
            .json(&serde_json::json!({ "file": { "display_name": display_name } }))
            .send()
            .await?;
        let start = ensure_success(start).await?;

        let upload_url = start
            .headers()
            .get(UPLOAD_URL_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| ExtractError::UploadError {
                message: format!("response did not include {}", UPLOAD_URL_HEADER),
            })?;

        tracing::debug!("Uploading {} bytes ({})", data.len(), mime_type);

        // 第二步：上傳內容並完成
        let finished = self
            .endpoint
            .authorize(self.client.post(&upload_url))
            .header("x-goog-upload-offset", "0")
            .header("x-goog-upload-command", "upload, finalize")
            .body(data)
            .send()
            .await?;
        let finished = ensure_success(finished).await?;
        let body = finished.bytes().await?;
        let uploaded: UploadedFile = serde_json::from_slice(&body)?;

        tracing::debug!("Uploaded file available at {}", uploaded.file.uri);
        Ok(uploaded.file)
    }
}

async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(ExtractError::ApiStatusError {
        status: status.as_u16(),
        body,
    })
}

async fn gcloud_access_token() -> Result<String> {
    tracing::debug!("No access token configured, asking gcloud");

    let output = tokio::process::Command::new("gcloud")
        .args(["auth", "print-access-token"])
        .output()
        .await
        .map_err(|e| ExtractError::AuthError {
            message: format!("could not run gcloud: {}", e),
        })?;

    if !output.status.success() {
        return Err(ExtractError::AuthError {
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if token.is_empty() {
        return Err(ExtractError::AuthError {
            message: "gcloud returned an empty access token".to_string(),
        });
    }
    Ok(token)
}
