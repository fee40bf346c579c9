use crate::core::annotator::Annotator;
use crate::domain::model::BoundingBox;
use crate::domain::ports::{Extractor, Storage};
use crate::utils::error::Result;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct DetectionReport {
    pub boxes: Vec<BoundingBox>,
    /// Path of the annotated copy, `None` when nothing was detected
    pub output_path: Option<PathBuf>,
}

pub struct DetectionEngine<E: Extractor, S: Storage> {
    extractor: E,
    annotator: Annotator<S>,
}

impl<E: Extractor, S: Storage> DetectionEngine<E, S> {
    pub fn new(extractor: E, annotator: Annotator<S>) -> Self {
        Self {
            extractor,
            annotator,
        }
    }

    pub async fn run(&self, file_path: &Path) -> Result<DetectionReport> {
        tracing::info!("Extracting boxes from {}", file_path.display());
        let boxes = self.extractor.extract(file_path).await?;
        tracing::info!("Extracted {} boxes", boxes.len());

        // 先輸出偵測結果，之後的標註失敗不影響
        println!("{}", serde_json::to_string_pretty(&boxes)?);

        let output_path = self.annotator.annotate(file_path, &boxes).await?;
        match &output_path {
            Some(path) => tracing::info!("Annotated image saved to: {}", path.display()),
            None if !boxes.is_empty() => tracing::warn!("Boxes were detected but not drawn"),
            None => {}
        }

        Ok(DetectionReport { boxes, output_path })
    }
}
