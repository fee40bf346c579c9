use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Scale of the coordinates the model returns in `box_2d`
pub const BOX_2D_SCALE: f64 = 1000.0;

/// Axis-aligned box in normalized coordinates (origin top-left, range [0, 1])
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub label: String,
}

/// One entry of the model's JSON list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// `[ymin, xmin, ymax, xmax]` on a 0-1000 scale
    pub box_2d: [f64; 4],
    pub label: String,
}

impl Detection {
    pub fn to_bounding_box(&self) -> BoundingBox {
        let [ymin, xmin, ymax, xmax] = self.box_2d;
        BoundingBox {
            x: xmin / BOX_2D_SCALE,
            y: ymin / BOX_2D_SCALE,
            width: (xmax - xmin) / BOX_2D_SCALE,
            height: (ymax - ymin) / BOX_2D_SCALE,
            label: self.label.clone(),
        }
    }
}

/// Box in pixel space, before any rounding
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelBox {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl PixelBox {
    pub fn normalize(&self, image_width: u32, image_height: u32, label: &str) -> BoundingBox {
        let (w, h) = (f64::from(image_width), f64::from(image_height));
        BoundingBox {
            x: self.left / w,
            y: self.top / h,
            width: self.width / w,
            height: self.height / h,
            label: label.to_string(),
        }
    }
}

/// Integer corners used for drawing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl BoundingBox {
    pub fn to_pixel_box(&self, image_width: u32, image_height: u32) -> PixelBox {
        let (w, h) = (f64::from(image_width), f64::from(image_height));
        PixelBox {
            left: self.x * w,
            top: self.y * h,
            width: self.width * w,
            height: self.height * h,
        }
    }

    /// Corners truncated toward zero, the far corner computed from `x + width`
    pub fn to_pixel_rect(&self, image_width: u32, image_height: u32) -> PixelRect {
        let (w, h) = (f64::from(image_width), f64::from(image_height));
        PixelRect {
            x1: (self.x * w) as i32,
            y1: (self.y * h) as i32,
            x2: ((self.x + self.width) * w) as i32,
            y2: ((self.y + self.height) * h) as i32,
        }
    }
}

/// Which generative-language endpoint serves the request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "kebab-case")]
pub enum Backend {
    /// Managed endpoint; image bytes are sent inline
    #[default]
    VertexAi,
    /// Direct API; the file is uploaded first and referenced by URI
    GeminiApi,
}

/// Input image prepared for transmission
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    /// Three-channel JPEG re-encoding of the input
    pub jpeg: Vec<u8>,
    /// MIME type of the file as stored on disk
    pub source_mime_type: String,
}

/// Image content of a request, either inline or by reference
#[derive(Debug, Clone, PartialEq)]
pub enum ImagePart {
    Inline { mime_type: String, data: Vec<u8> },
    Remote { mime_type: String, uri: String },
}
