use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Failed to decode image {path}: {source}")]
    ImageDecodeError {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Image encoding error: {0}")]
    ImageEncodeError(#[from] image::ImageError),

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("API returned status {status}: {body}")]
    ApiStatusError { status: u16, body: String },

    #[error("Authentication error: {message}")]
    AuthError { message: String },

    #[error("File upload failed: {message}")]
    UploadError { message: String },

    #[error("Response format error: {message}")]
    ResponseFormatError { message: String },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value for {field} ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// 輸入圖片無法讀取或解碼
    Input,
    /// 網路、認證或上傳失敗
    Remote,
    /// 模型回應格式不符
    Response,
    /// 輸出寫入失敗
    Output,
    Config,
}

impl ExtractError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ExtractError::ImageDecodeError { .. } => ErrorCategory::Input,
            ExtractError::ApiError(_)
            | ExtractError::ApiStatusError { .. }
            | ExtractError::AuthError { .. }
            | ExtractError::UploadError { .. } => ErrorCategory::Remote,
            ExtractError::ResponseFormatError { .. } | ExtractError::SerializationError(_) => {
                ErrorCategory::Response
            }
            ExtractError::ImageEncodeError(_) | ExtractError::IoError(_) => ErrorCategory::Output,
            ExtractError::ConfigError { .. }
            | ExtractError::MissingConfigError { .. }
            | ExtractError::InvalidConfigValueError { .. } => ErrorCategory::Config,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Input => "Check that the input path points to a readable raster image",
            ErrorCategory::Remote => {
                "Check credentials, project and location, then run the command again"
            }
            ErrorCategory::Response => {
                "The model reply was not in the expected format; run the command again"
            }
            ErrorCategory::Output => "Check that the output directory is writable",
            ErrorCategory::Config => "Check the command-line flags and environment variables",
        }
    }

    pub(crate) fn no_json_block() -> Self {
        ExtractError::ResponseFormatError {
            message: "No JSON response from model".to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ExtractError>;
