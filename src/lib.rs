pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::CliConfig;

pub use crate::config::{cli::LocalStorage, ExtractorSettings};
pub use crate::core::{
    annotator::Annotator,
    engine::{DetectionEngine, DetectionReport},
    extractor::{extract, GeminiExtractor},
};
pub use crate::domain::model::{Backend, BoundingBox};
pub use crate::utils::error::{ExtractError, Result};
