//! Draws detected boxes and labels onto a copy of the input image.

use crate::domain::model::BoundingBox;
use crate::domain::ports::Storage;
use crate::utils::error::{ExtractError, Result};
use crate::utils::imaging::{encode_as, load_image, output_format};
use ab_glyph::{FontArc, PxScale};
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use std::path::{Path, PathBuf};

pub const BOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
pub const STROKE_WIDTH: u32 = 2;
pub const LABEL_SCALE: f32 = 24.0;
/// Minimum room, in pixels, above a box for its label
pub const LABEL_MARGIN: i32 = 10;

const OUTPUT_PREFIX: &str = "annotated_";

/// DejaVu Sans, used when no label font is configured
const BUNDLED_FONT: &[u8] = include_bytes!("../../assets/DejaVuSans.ttf");

/// Load the label font from `path`, or the bundled one when no path is given
///
/// A configured font that cannot be read or parsed is an error.
pub fn load_font(path: Option<&Path>) -> Result<FontArc> {
    let Some(path) = path else {
        return FontArc::try_from_slice(BUNDLED_FONT).map_err(|e| ExtractError::ConfigError {
            message: format!("Unable to parse bundled font: {}", e),
        });
    };

    let bytes = std::fs::read(path).map_err(|e| ExtractError::ConfigError {
        message: format!("Cannot read font {}: {}", path.display(), e),
    })?;
    let font = FontArc::try_from_vec(bytes).map_err(|e| ExtractError::ConfigError {
        message: format!("Unable to parse font {}: {}", path.display(), e),
    })?;

    tracing::debug!("Using label font {}", path.display());
    Ok(font)
}

/// Baseline for a label: above the box when there is room, otherwise below
pub fn label_baseline(top: i32) -> i32 {
    if top - LABEL_MARGIN > LABEL_MARGIN {
        top - LABEL_MARGIN
    } else {
        top + LABEL_MARGIN
    }
}

pub fn annotated_file_name(file_path: &Path) -> Result<String> {
    let base = file_path
        .file_name()
        .ok_or_else(|| ExtractError::ConfigError {
            message: format!("{} has no file name", file_path.display()),
        })?;
    Ok(format!("{}{}", OUTPUT_PREFIX, base.to_string_lossy()))
}

pub fn draw_boxes(image: &mut RgbImage, boxes: &[BoundingBox], font: &FontArc) {
    let (width, height) = image.dimensions();
    let scale = PxScale::from(LABEL_SCALE);

    // 超出畫面的座標先夾到畫布附近
    let margin = STROKE_WIDTH as i32;
    let max_x = i32::try_from(width).unwrap_or(i32::MAX).saturating_add(margin);
    let max_y = i32::try_from(height).unwrap_or(i32::MAX).saturating_add(margin);
    let clamp_x = |x: i32| x.clamp(-margin, max_x);
    let clamp_y = |y: i32| y.clamp(-margin, max_y);

    for bounding_box in boxes {
        let rect = bounding_box.to_pixel_rect(width, height);
        let (x1, y1) = (clamp_x(rect.x1), clamp_y(rect.y1));
        let (x2, y2) = (clamp_x(rect.x2), clamp_y(rect.y2));
        let rect_width = x2.saturating_sub(x1).max(1) as u32;
        let rect_height = y2.saturating_sub(y1).max(1) as u32;

        for i in 0..STROKE_WIDTH {
            let offset = i as i32;
            let stroke = Rect::at(x1 - offset, y1 - offset)
                .of_size(rect_width + 2 * i, rect_height + 2 * i);
            draw_hollow_rect_mut(image, stroke, BOX_COLOR);
        }

        let (_, text_height) = text_size(scale, font, &bounding_box.label);
        let baseline = label_baseline(y1);
        draw_text_mut(
            image,
            BOX_COLOR,
            x1,
            baseline - text_height as i32,
            scale,
            font,
            &bounding_box.label,
        );
    }
}

/// Visualizer: writes `<output_dir>/annotated_<basename>` through the storage port
pub struct Annotator<S: Storage> {
    storage: S,
    output_dir: PathBuf,
    font: FontArc,
}

impl<S: Storage> Annotator<S> {
    pub fn new(storage: S, output_dir: impl Into<PathBuf>, font: FontArc) -> Self {
        Self {
            storage,
            output_dir: output_dir.into(),
            font,
        }
    }

    /// Returns `None` without touching the disk when `boxes` is empty or the
    /// image cannot be read again
    pub async fn annotate(
        &self,
        file_path: &Path,
        boxes: &[BoundingBox],
    ) -> Result<Option<PathBuf>> {
        if boxes.is_empty() {
            tracing::info!("No bounding boxes found to draw.");
            return Ok(None);
        }

        let loaded = match load_image(file_path) {
            Ok(loaded) => loaded,
            Err(e) => {
                tracing::error!("Could not read image file {}: {}", file_path.display(), e);
                return Ok(None);
            }
        };
        let format = output_format(loaded.format, file_path);
        let mut canvas = loaded.image.to_rgb8();

        draw_boxes(&mut canvas, boxes, &self.font);

        let file_name = annotated_file_name(file_path)?;
        let encoded = encode_as(&DynamicImage::ImageRgb8(canvas), format)?;

        tracing::debug!("Writing annotated image ({} bytes) to storage", encoded.len());
        self.storage.write_file(&file_name, &encoded).await?;

        Ok(Some(self.output_dir.join(file_name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::ops::Range;
    use std::sync::Arc;
    use tempfile::TempDir;
    use tokio::sync::Mutex;

    #[derive(Clone, Default)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl Storage for MockStorage {
        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
            Ok(())
        }
    }

    fn font() -> FontArc {
        load_font(None).unwrap()
    }

    fn sample_box() -> BoundingBox {
        BoundingBox {
            x: 0.1,
            y: 0.05,
            width: 0.3,
            height: 0.4,
            label: "A".to_string(),
        }
    }

    /// Any drawn (non-black) pixel inside the region
    fn has_ink(image: &RgbImage, columns: Range<u32>, rows: Range<u32>) -> bool {
        rows.flat_map(|y| columns.clone().map(move |x| (x, y)))
            .any(|(x, y)| image.get_pixel(x, y)[1] > 0)
    }

    #[test]
    fn test_label_baseline_margin_rule() {
        assert_eq!(label_baseline(21), 11);
        assert_eq!(label_baseline(100), 90);
        assert_eq!(label_baseline(20), 30);
        assert_eq!(label_baseline(0), 10);
    }

    #[test]
    fn test_annotated_file_name() {
        assert_eq!(
            annotated_file_name(Path::new("/data/slides/slide_01.png")).unwrap(),
            "annotated_slide_01.png"
        );
        assert!(annotated_file_name(Path::new("/")).is_err());
    }

    #[test]
    fn test_load_font_bundled_and_configured() {
        assert!(load_font(None).is_ok());

        let err = load_font(Some(Path::new("/nonexistent/font.ttf"))).unwrap_err();
        assert!(matches!(err, ExtractError::ConfigError { .. }));

        let temp_dir = TempDir::new().unwrap();
        let bogus = temp_dir.path().join("bogus.ttf");
        std::fs::write(&bogus, b"not a font").unwrap();
        let err = load_font(Some(&bogus)).unwrap_err();
        assert!(matches!(err, ExtractError::ConfigError { .. }));
    }

    #[test]
    fn test_draw_boxes_rectangle_corners() {
        let mut image = RgbImage::new(1000, 800);
        draw_boxes(&mut image, &[sample_box()], &font());

        // 外框角落 (100,40) 與 (400,360)
        assert_eq!(*image.get_pixel(100, 40), BOX_COLOR);
        assert_eq!(*image.get_pixel(400, 360), BOX_COLOR);
        assert_eq!(*image.get_pixel(250, 40), BOX_COLOR);
        assert_eq!(*image.get_pixel(100, 200), BOX_COLOR);
        // stroke grows outward
        assert_eq!(*image.get_pixel(99, 39), BOX_COLOR);
        // interior untouched
        assert_eq!(*image.get_pixel(250, 200), Rgb([0, 0, 0]));
        assert_eq!(*image.get_pixel(102, 42), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_label_drawn_above_box() {
        let mut image = RgbImage::new(1000, 1000);
        let tissue = BoundingBox {
            x: 0.1,
            y: 0.1,
            width: 0.5,
            height: 0.5,
            label: "Tissue".to_string(),
        };
        draw_boxes(&mut image, &[tissue], &font());

        // box top at y=100, label baseline at y=90
        assert!(has_ink(&image, 40..400, 50..91));
        assert!(!has_ink(&image, 102..400, 102..160));
    }

    #[test]
    fn test_label_drawn_below_box_top_near_edge() {
        let mut image = RgbImage::new(1000, 1000);
        let text = BoundingBox {
            x: 0.1,
            y: 0.005,
            width: 0.5,
            height: 0.5,
            label: "Tissue".to_string(),
        };
        draw_boxes(&mut image, &[text], &font());

        // box top at y=5, so the label sits inside the box down to y=15
        assert!(has_ink(&image, 102..400, 6..17));
        assert!(!has_ink(&image, 102..400, 30..200));
    }

    #[test]
    fn test_draw_boxes_clips_out_of_range_coordinates() {
        let mut image = RgbImage::new(50, 50);
        let oversized = BoundingBox {
            x: 0.9,
            y: -0.1,
            width: 0.5,
            height: 1.5,
            label: "tissue".to_string(),
        };
        draw_boxes(&mut image, &[oversized], &font());
        assert_eq!(*image.get_pixel(45, 10), BOX_COLOR);
    }

    #[test]
    fn test_draw_boxes_extreme_coordinates() {
        let mut image = RgbImage::new(50, 50);
        let extreme = crate::domain::model::Detection {
            box_2d: [-1e12, -1e12, 1e12, 1e12],
            label: "text".to_string(),
        }
        .to_bounding_box();

        draw_boxes(&mut image, &[extreme], &font());
        assert_eq!(*image.get_pixel(25, 25), Rgb([0, 0, 0]));
    }

    #[tokio::test]
    async fn test_annotate_empty_boxes_writes_nothing() {
        let storage = MockStorage::default();
        let annotator = Annotator::new(storage.clone(), "annotated_tissue", font());

        let result = annotator
            .annotate(Path::new("/nonexistent/slide.png"), &[])
            .await
            .unwrap();

        assert!(result.is_none());
        assert!(storage.files.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_annotate_writes_same_format() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("slide.png");
        RgbImage::new(1000, 800).save(&input).unwrap();

        let storage = MockStorage::default();
        let annotator = Annotator::new(storage.clone(), "annotated_tissue", font());

        let output = annotator.annotate(&input, &[sample_box()]).await.unwrap();
        assert_eq!(
            output,
            Some(PathBuf::from("annotated_tissue").join("annotated_slide.png"))
        );

        let files = storage.files.lock().await;
        let written = files.get("annotated_slide.png").unwrap();
        assert_eq!(image::guess_format(written).unwrap(), image::ImageFormat::Png);

        let decoded = image::load_from_memory(written).unwrap().to_rgb8();
        assert_eq!(decoded.dimensions(), (1000, 800));
        assert_eq!(*decoded.get_pixel(100, 40), BOX_COLOR);
    }

    #[tokio::test]
    async fn test_annotate_unreadable_image_writes_nothing() {
        let storage = MockStorage::default();
        let annotator = Annotator::new(storage.clone(), "annotated_tissue", font());

        let result = annotator
            .annotate(Path::new("/nonexistent/slide.png"), &[sample_box()])
            .await
            .unwrap();

        assert!(result.is_none());
        assert!(storage.files.lock().await.is_empty());
    }
}
