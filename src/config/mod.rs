pub mod cli;

use crate::core::extractor::DEFAULT_MODEL;
use crate::domain::model::Backend;
use crate::domain::ports::ConfigProvider;
use crate::utils::error::Result;
use crate::utils::validation::{validate_non_empty_string, validate_path, validate_url, Validate};
use serde::{Deserialize, Serialize};

pub const DEFAULT_LOCATION: &str = "us-central1";
pub const DEFAULT_OUTPUT_DIR: &str = "annotated_tissue";

pub const PROJECT_ENV: &str = "GOOGLE_CLOUD_PROJECT";
pub const LOCATION_ENV: &str = "GOOGLE_CLOUD_LOCATION";
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";
pub const ACCESS_TOKEN_ENV: &str = "GOOGLE_CLOUD_ACCESS_TOKEN";
pub const FONT_ENV: &str = "TISSUE_LABEL_FONT";

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Serialize, Deserialize, clap::Parser)]
#[command(name = "tissue-extract")]
#[command(about = "Detect text and tissue regions in an image with a Gemini model")]
pub struct CliConfig {
    /// Path to the input image file
    pub file_path: String,

    /// Google Cloud project ID
    #[arg(long, env = PROJECT_ENV)]
    pub project: Option<String>,

    /// Google Cloud location (e.g. us-central1)
    #[arg(long, env = LOCATION_ENV, default_value = DEFAULT_LOCATION)]
    pub location: String,

    #[arg(long, value_enum, default_value_t = Backend::VertexAi)]
    pub backend: Backend,

    #[arg(long, default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Directory for annotated copies
    #[arg(long, default_value = DEFAULT_OUTPUT_DIR)]
    pub output_dir: String,

    /// TrueType/OpenType font used for box labels
    #[arg(long, env = FONT_ENV)]
    pub font: Option<String>,

    #[arg(long, env = API_KEY_ENV, hide_env_values = true)]
    pub api_key: Option<String>,

    #[arg(long, env = ACCESS_TOKEN_ENV, hide_env_values = true)]
    pub access_token: Option<String>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,
}

#[cfg(feature = "cli")]
impl ConfigProvider for CliConfig {
    fn backend(&self) -> Backend {
        self.backend
    }

    fn project(&self) -> Option<&str> {
        self.project.as_deref()
    }

    fn location(&self) -> &str {
        &self.location
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    fn output_dir(&self) -> &str {
        &self.output_dir
    }

    fn font_path(&self) -> Option<&str> {
        self.font.as_deref()
    }
}

#[cfg(feature = "cli")]
impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validate_path("file_path", &self.file_path)?;
        validate_path("output_dir", &self.output_dir)?;
        validate_non_empty_string("model", &self.model)?;
        if self.backend == Backend::VertexAi {
            validate_non_empty_string("location", &self.location)?;
        }
        Ok(())
    }
}

/// Programmatic configuration, for library callers and tests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorSettings {
    pub backend: Backend,
    pub project: Option<String>,
    pub location: String,
    pub model: String,
    pub api_key: Option<String>,
    pub access_token: Option<String>,
    pub output_dir: String,
    pub font_path: Option<String>,
    pub base_url: Option<String>,
}

impl Default for ExtractorSettings {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            project: None,
            location: DEFAULT_LOCATION.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            access_token: None,
            output_dir: DEFAULT_OUTPUT_DIR.to_string(),
            font_path: None,
            base_url: None,
        }
    }
}

impl ExtractorSettings {
    /// Explicit values win over the environment
    pub fn from_env(project: Option<String>, location: Option<String>) -> Self {
        let env = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());

        Self {
            project: project.or_else(|| env(PROJECT_ENV)),
            location: location
                .or_else(|| env(LOCATION_ENV))
                .unwrap_or_else(|| DEFAULT_LOCATION.to_string()),
            api_key: env(API_KEY_ENV),
            access_token: env(ACCESS_TOKEN_ENV),
            font_path: env(FONT_ENV),
            ..Default::default()
        }
    }
}

impl ConfigProvider for ExtractorSettings {
    fn backend(&self) -> Backend {
        self.backend
    }

    fn project(&self) -> Option<&str> {
        self.project.as_deref()
    }

    fn location(&self) -> &str {
        &self.location
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    fn output_dir(&self) -> &str {
        &self.output_dir
    }

    fn font_path(&self) -> Option<&str> {
        self.font_path.as_deref()
    }

    fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }
}

impl Validate for ExtractorSettings {
    fn validate(&self) -> Result<()> {
        validate_path("output_dir", &self.output_dir)?;
        validate_non_empty_string("model", &self.model)?;
        if let Some(url) = &self.base_url {
            validate_url("base_url", url)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_env_prefers_explicit_values() {
        let settings = ExtractorSettings::from_env(
            Some("explicit-project".to_string()),
            Some("europe-west4".to_string()),
        );
        assert_eq!(settings.project(), Some("explicit-project"));
        assert_eq!(settings.location(), "europe-west4");
        assert_eq!(settings.backend(), Backend::VertexAi);
        assert_eq!(settings.model(), DEFAULT_MODEL);
        assert_eq!(settings.output_dir(), DEFAULT_OUTPUT_DIR);
    }

    #[test]
    fn test_settings_validation() {
        let settings = ExtractorSettings {
            base_url: Some("not a url".to_string()),
            ..Default::default()
        };
        assert!(settings.validate().is_err());

        let settings = ExtractorSettings {
            model: " ".to_string(),
            ..Default::default()
        };
        assert!(settings.validate().is_err());

        assert!(ExtractorSettings::default().validate().is_ok());
    }

    #[cfg(feature = "cli")]
    #[test]
    fn test_cli_parses_flags() {
        use clap::Parser;

        let config = CliConfig::try_parse_from([
            "tissue-extract",
            "slide.png",
            "--project",
            "lab-project",
            "--location",
            "asia-east1",
            "--backend",
            "gemini-api",
        ])
        .unwrap();

        assert_eq!(config.file_path, "slide.png");
        assert_eq!(config.project(), Some("lab-project"));
        assert_eq!(config.location(), "asia-east1");
        assert_eq!(config.backend(), Backend::GeminiApi);
        assert_eq!(config.output_dir(), DEFAULT_OUTPUT_DIR);
        assert!(config.validate().is_ok());
    }

    #[cfg(feature = "cli")]
    #[test]
    fn test_cli_requires_file_path() {
        use clap::Parser;
        assert!(CliConfig::try_parse_from(["tissue-extract"]).is_err());
    }
}
