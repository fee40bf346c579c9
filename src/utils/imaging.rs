//! Image loading and encoding helpers shared by the extractor and the annotator

use crate::utils::error::{ExtractError, Result};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::io::Cursor;
use std::path::Path;

/// JPEG quality used for the inline request payload
pub const JPEG_QUALITY: u8 = 75;

/// A decoded image together with the raster format it was read from
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub image: DynamicImage,
    pub format: Option<ImageFormat>,
}

/// Decode an image from disk, guessing the format from its content
///
/// Any failure (missing file, unknown format, corrupt data) is reported as
/// `ExtractError::ImageDecodeError` for the given path.
pub fn load_image(path: &Path) -> Result<LoadedImage> {
    let decode_error = |source: image::ImageError| ExtractError::ImageDecodeError {
        path: path.to_path_buf(),
        source,
    };

    let reader = ImageReader::open(path)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(|e| decode_error(image::ImageError::IoError(e)))?;

    let format = reader.format();
    let image = reader.decode().map_err(decode_error)?;

    Ok(LoadedImage { image, format })
}

/// Flatten to three-channel RGB and re-encode as JPEG
pub fn encode_jpeg(image: &DynamicImage) -> Result<Vec<u8>> {
    let rgb = image.to_rgb8();
    let mut bytes = Vec::new();
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut bytes, JPEG_QUALITY))?;
    Ok(bytes)
}

/// Encode an image with the given raster format
pub fn encode_as(image: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    image.write_to(&mut cursor, format)?;
    Ok(cursor.into_inner())
}

/// Pick the output format: the decoded one, then the file extension, then PNG
pub fn output_format(loaded: Option<ImageFormat>, path: &Path) -> ImageFormat {
    loaded
        .or_else(|| ImageFormat::from_path(path).ok())
        .unwrap_or(ImageFormat::Png)
}
