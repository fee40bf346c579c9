pub mod annotator;
pub mod engine;
pub mod extractor;
pub mod response;

pub use crate::domain::model::BoundingBox;
pub use crate::domain::ports::{ConfigProvider, Extractor, ImageSource, Storage};
pub use crate::utils::error::Result;
